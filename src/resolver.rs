//! Poll resolution
//!
//! Maps a client cursor (last-seen version plus mute preference) onto the
//! queue. Each resolution is one of three observable transitions:
//! advance-by-one with a sound to play, advance-by-jump with no payload
//! (catch-up after evictions or an explicit clear), or no change. There is
//! no terminal state; the protocol is an infinite poll/response loop.

use chrono::{DateTime, Utc};

use crate::queue::SoundQueue;

/// Sentinel version reported to muted clients instead of a real cursor.
pub const MUTED_VERSION: i64 = -1;

/// Outcome of one poll resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOutcome {
    /// Version the client should store for its next poll; `-1` when muted.
    pub version: i64,
    /// Sound to play, present only on an advance-by-one transition.
    pub play: Option<String>,
    /// Milliseconds the client should wait before playing (when `play` is
    /// present) or before re-polling (when muted).
    pub delay_ms: u64,
    /// The version jump crossed an explicit clear.
    pub cleared: bool,
}

impl PollOutcome {
    fn caught_up(version: u64, cleared: bool) -> Self {
        Self {
            version: version as i64,
            play: None,
            delay_ms: 0,
            cleared,
        }
    }
}

/// Resolve one poll against the queue.
///
/// Runs an eviction pass first so the response reflects current reality,
/// then walks the cursor: muted clients get the sentinel and a long
/// re-poll interval, first contacts get a baseline without replaying
/// history, and everyone else advances by one (with payload), jumps to the
/// current version (without), or stays put.
pub fn resolve(
    queue: &mut SoundQueue,
    last_version: Option<u64>,
    muted: bool,
    now: DateTime<Utc>,
) -> PollOutcome {
    queue.evict_expired(now);

    if muted {
        let interval = queue.timing().muted_poll_interval.num_milliseconds().max(0) as u64;
        return PollOutcome {
            version: MUTED_VERSION,
            play: None,
            delay_ms: interval,
            cleared: false,
        };
    }

    let current = queue.version();
    let last = match last_version {
        Some(v) => v,
        None => return PollOutcome::caught_up(current, false),
    };

    if let Some(event) = queue.event_at_version(last + 1) {
        return PollOutcome {
            version: (last + 1) as i64,
            play: Some(event.url().to_string()),
            delay_ms: event.delay_remaining(now),
            cleared: false,
        };
    }

    if current > last {
        // The versions between the cursor and the counter were consumed by
        // evictions or a cancel with nothing surviving at last + 1; jump
        // the cursor forward with no payload.
        return PollOutcome::caught_up(current, queue.cleared_since(last));
    }

    // No change, or a cursor from a previous process life addressing a
    // version ahead of this queue's history; the client adopts the current
    // version either way.
    PollOutcome::caught_up(current, false)
}
