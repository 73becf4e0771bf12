//! chimed configuration
//!
//! All timing knobs of the poll protocol live here so tests and deployers
//! can tighten them; the defaults are the protocol's contractual values.

use std::path::Path;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::queue::QueueTiming;

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Port the HTTP server listens on
    pub port: u16,
    /// Shared secret required on mutating endpoints; 0 disables auth
    pub shared_secret: i64,
    /// Pre-roll delay for triggers that do not request one (ms)
    pub default_delay_ms: u64,
    /// How long a queued sound stays addressable (ms)
    pub expiration_period_ms: u64,
    /// One-time grace window for expired-but-addressed sounds (ms)
    pub expiry_extension_ms: u64,
    /// Re-poll interval reported to muted clients (ms)
    pub muted_poll_interval_ms: u64,
    /// Baseline for the queue version counter
    pub base_version: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 5750,
            shared_secret: 0,
            default_delay_ms: 2_200,
            expiration_period_ms: 5_000,
            expiry_extension_ms: 1_000,
            muted_poll_interval_ms: 60_000,
            base_version: 0,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// Keys absent from the file fall back to their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw).map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Queue timing policy derived from the configured values.
    pub fn timing(&self) -> QueueTiming {
        QueueTiming {
            expiration: Duration::milliseconds(self.expiration_period_ms as i64),
            expiry_extension: Duration::milliseconds(self.expiry_extension_ms as i64),
            default_delay: Duration::milliseconds(self.default_delay_ms as i64),
            muted_poll_interval: Duration::milliseconds(self.muted_poll_interval_ms as i64),
        }
    }
}
