//! # chimed - sound notification microservice
//!
//! Holds a versioned queue of sound events and serves distributed polling
//! agents over HTTP: build triggers and administrators enqueue sounds,
//! pollers resume from their last-seen version and discover exactly the
//! events they have not yet consumed. The queue is volatile by contract;
//! events expire and are evicted rather than delivered to offline
//! clients.

pub mod api;
pub mod config;
pub mod error;
pub mod events;
pub mod queue;
pub mod resolver;
pub mod state;

pub use error::{Error, Result};
pub use state::SharedState;
