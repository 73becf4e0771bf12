//! Versioned sound-event queue
//!
//! The queue is the sole source of truth for "what has happened": every
//! mutation (enqueue, per-event eviction, explicit cancel) increments a
//! single version counter, and each queued event is addressable by the
//! version it was assigned on append. A poller that was last at version
//! `N` asks for version `N + 1` to discover the next event it has not yet
//! consumed.
//!
//! Eviction is two-phase: an event observed past its deadline is first
//! granted a one-time grace extension and only removed once the extended
//! deadline has also passed. This closes the race where a poller addresses
//! an event microseconds before hard eviction and would otherwise be told
//! the version it was promised does not exist.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

/// Timing policy for queue expiration and delay computation.
#[derive(Debug, Clone, Copy)]
pub struct QueueTiming {
    /// How long an event stays addressable after enqueue.
    pub expiration: Duration,
    /// One-time grace window granted to an event observed expired.
    pub expiry_extension: Duration,
    /// Pre-roll delay applied when the trigger does not request one.
    pub default_delay: Duration,
    /// Re-poll interval reported to muted clients.
    pub muted_poll_interval: Duration,
}

impl Default for QueueTiming {
    fn default() -> Self {
        Self {
            expiration: Duration::milliseconds(5_000),
            expiry_extension: Duration::milliseconds(1_000),
            default_delay: Duration::milliseconds(2_200),
            muted_poll_interval: Duration::milliseconds(60_000),
        }
    }
}

/// Expiry lifecycle of a queued event.
///
/// Eviction (removal from the queue) is the terminal state; it is not a
/// variant here because evicted events no longer exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryState {
    /// Deadline not yet extended.
    Pending,
    /// Grace extension granted; the next expiry observation evicts.
    Extended,
}

/// One queued playback request.
///
/// Immutable after creation except for the single expiry-extension grant,
/// which is recorded by the queue during an eviction pass.
#[derive(Debug, Clone)]
pub struct SoundEvent {
    url: String,
    created_at: DateTime<Utc>,
    delay: Duration,
    sequence_version: u64,
    expires_at: DateTime<Utc>,
    expiry: ExpiryState,
}

impl SoundEvent {
    /// Sound resource locator; opaque to the queue.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Queue version assigned when this event was appended.
    pub fn sequence_version(&self) -> u64 {
        self.sequence_version
    }

    pub fn expiry(&self) -> ExpiryState {
        self.expiry
    }

    /// Whether the event is past its deadline.
    ///
    /// Granting the grace extension pushes `expires_at` out exactly once,
    /// so the extension is accounted for automatically.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Milliseconds of synchronization delay still to wait before playing.
    ///
    /// Decreases with elapsed time and never goes negative; an event
    /// queued with delay 0 always reports 0.
    pub fn delay_remaining(&self, now: DateTime<Utc>) -> u64 {
        let elapsed = (now - self.created_at).num_milliseconds().max(0);
        (self.delay.num_milliseconds() - elapsed).max(0) as u64
    }
}

/// Ordered collection of sound events plus the version counter.
///
/// Events are keyed by their sequence version, so the counter itself is
/// the lookup address and the map order is insertion order.
pub struct SoundQueue {
    version: u64,
    events: BTreeMap<u64, SoundEvent>,
    cleared_at: Option<u64>,
    timing: QueueTiming,
}

impl SoundQueue {
    pub fn new(timing: QueueTiming) -> Self {
        Self::with_base_version(timing, 0)
    }

    /// Create a queue whose version counter starts at `base_version`.
    pub fn with_base_version(timing: QueueTiming, base_version: u64) -> Self {
        Self {
            version: base_version,
            events: BTreeMap::new(),
            cleared_at: None,
            timing,
        }
    }

    /// Current version of the queue's mutation history.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn timing(&self) -> &QueueTiming {
        &self.timing
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Queued events in version order.
    pub fn iter(&self) -> impl Iterator<Item = &SoundEvent> {
        self.events.values()
    }

    /// Append a sound event, assigning it the next version.
    ///
    /// A negative requested delay is normalized to zero rather than
    /// rejected; the protocol has no error channel back to an unattended
    /// poller. `None` means "use the default pre-roll delay".
    pub fn add_sound(
        &mut self,
        url: impl Into<String>,
        requested_delay_ms: Option<i64>,
        now: DateTime<Utc>,
    ) -> u64 {
        let delay = match requested_delay_ms {
            Some(ms) => Duration::milliseconds(ms.max(0)),
            None => self.timing.default_delay,
        };

        self.version += 1;
        let event = SoundEvent {
            url: url.into(),
            created_at: now,
            delay,
            sequence_version: self.version,
            expires_at: now + self.timing.expiration,
            expiry: ExpiryState::Pending,
        };
        debug!("Queued sound {} at version {}", event.url, self.version);
        self.events.insert(self.version, event);
        self.version
    }

    /// Remove every queued event in one atomic step.
    ///
    /// The clear itself costs a single version increment; the events being
    /// dropped already counted when they were appended. The version at
    /// which the clear happened is remembered so pollers that jump across
    /// it can be told the queue was explicitly cleared.
    pub fn cancel_all(&mut self) -> u64 {
        let removed = self.events.len();
        self.events.clear();
        self.version += 1;
        self.cleared_at = Some(self.version);
        debug!("Cancelled {} queued sounds, version now {}", removed, self.version);
        self.version
    }

    /// The event appended to produce version `v`, if it still exists.
    pub fn event_at_version(&self, v: u64) -> Option<&SoundEvent> {
        self.events.get(&v)
    }

    /// Whether an explicit clear happened after `last_version`.
    pub fn cleared_since(&self, last_version: u64) -> bool {
        self.cleared_at.map_or(false, |v| v > last_version)
    }

    /// Run one eviction pass over the queue.
    ///
    /// For each event past its deadline: grant the one-time grace
    /// extension if it has not had one, otherwise remove it and increment
    /// the version. Extension and removal never happen in the same pass,
    /// so an addressed event always survives at least one observation
    /// beyond its base deadline. Removals proceed oldest-first, one
    /// version increment each.
    ///
    /// Runs lazily at the top of every poll resolution; no background
    /// timer exists.
    pub fn evict_expired(&mut self, now: DateTime<Utc>) {
        let expired: Vec<u64> = self
            .events
            .values()
            .filter(|e| e.is_expired(now))
            .map(|e| e.sequence_version)
            .collect();

        for v in expired {
            let evict = match self.events.get_mut(&v) {
                Some(event) if event.expiry == ExpiryState::Pending => {
                    event.expires_at = event.expires_at + self.timing.expiry_extension;
                    event.expiry = ExpiryState::Extended;
                    debug!("Granted expiry extension to sound at version {}", v);
                    false
                }
                Some(_) => true,
                None => false,
            };

            if evict {
                self.events.remove(&v);
                self.version += 1;
                debug!("Evicted expired sound at version {}, version now {}", v, self.version);
            }
        }
    }
}
