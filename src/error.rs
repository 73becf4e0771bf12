//! Error types for chimed
//!
//! The queue core is total over its domain (lookups return `Option`,
//! eviction cannot fail), so errors here cover the service shell only.

use thiserror::Error;

/// Main error type for chimed
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP server errors
    #[error("HTTP server error: {0}")]
    Http(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type using chimed Error
pub type Result<T> = std::result::Result<T, Error>;
