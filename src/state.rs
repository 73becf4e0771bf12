//! Shared service state
//!
//! Thread-safe shared state tying the queue, the event broadcast and the
//! configuration together. The queue sits behind a single exclusive lock:
//! every poll resolution runs an eviction pass, so even "reads" mutate,
//! and version assignment must appear atomic across concurrent triggers.

use chrono::Utc;
use tokio::sync::{broadcast, Mutex};

use crate::config::Config;
use crate::events::ChimeEvent;
use crate::queue::{SoundEvent, SoundQueue};
use crate::resolver::{self, PollOutcome};

/// Shared state accessible by all handlers
pub struct SharedState {
    /// The versioned sound queue, serialized behind one lock
    queue: Mutex<SoundQueue>,

    /// Event broadcaster for SSE subscribers
    event_tx: broadcast::Sender<ChimeEvent>,

    /// Service configuration
    config: Config,
}

impl SharedState {
    pub fn new(config: Config) -> Self {
        let (event_tx, _) = broadcast::channel(100);
        Self {
            queue: Mutex::new(SoundQueue::with_base_version(
                config.timing(),
                config.base_version,
            )),
            event_tx,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Broadcast an event to all SSE listeners
    pub fn broadcast_event(&self, event: ChimeEvent) {
        // Ignore send errors (no receivers is OK)
        let _ = self.event_tx.send(event);
    }

    /// Subscribe to the event stream for SSE
    pub fn subscribe_events(&self) -> broadcast::Receiver<ChimeEvent> {
        self.event_tx.subscribe()
    }

    /// Queue a sound for all pollers; returns the assigned version.
    pub async fn trigger_sound(&self, url: String, delay_ms: Option<i64>) -> u64 {
        let now = Utc::now();
        let version = self.queue.lock().await.add_sound(url.clone(), delay_ms, now);
        self.broadcast_event(ChimeEvent::SoundQueued {
            url,
            version,
            timestamp: now,
        });
        version
    }

    /// Drop every queued sound; returns the queue version after the clear.
    pub async fn cancel_all(&self) -> u64 {
        let version = self.queue.lock().await.cancel_all();
        self.broadcast_event(ChimeEvent::SoundsCleared {
            version,
            timestamp: Utc::now(),
        });
        version
    }

    /// Resolve one poll against the queue.
    pub async fn resolve_poll(&self, last_version: Option<u64>, muted: bool) -> PollOutcome {
        let mut queue = self.queue.lock().await;
        resolver::resolve(&mut queue, last_version, muted, Utc::now())
    }

    /// Snapshot of the queue after an eviction pass: current version plus
    /// the surviving events in version order.
    pub async fn queue_snapshot(&self) -> (u64, Vec<SoundEvent>) {
        let mut queue = self.queue.lock().await;
        queue.evict_expired(Utc::now());
        (queue.version(), queue.iter().cloned().collect())
    }
}
