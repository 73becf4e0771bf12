//! Queue-change events
//!
//! Broadcast on the in-process bus and serialized for SSE transmission.
//! Events describe mutations already applied to the queue; pollers do not
//! consume them (the poll protocol is self-sufficient), but dashboards and
//! trigger sources can.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// chimed event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ChimeEvent {
    /// A sound was queued for pollers.
    SoundQueued {
        /// Sound resource locator
        url: String,
        /// Version assigned to the queued event
        version: u64,
        /// When the sound was queued
        timestamp: DateTime<Utc>,
    },

    /// Every queued sound was explicitly cancelled.
    SoundsCleared {
        /// Queue version after the clear
        version: u64,
        /// When the clear happened
        timestamp: DateTime<Utc>,
    },
}

impl ChimeEvent {
    /// Event name used for the SSE `event:` field.
    pub fn event_type(&self) -> &'static str {
        match self {
            ChimeEvent::SoundQueued { .. } => "SoundQueued",
            ChimeEvent::SoundsCleared { .. } => "SoundsCleared",
        }
    }
}
