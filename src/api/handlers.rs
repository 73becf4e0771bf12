//! HTTP request handlers
//!
//! Implements the sound-agent poll protocol plus the trigger/cancel
//! administrative endpoints, health, and queue inspection.

use axum::{
    extract::{Query, State},
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::api::AppContext;
use crate::resolver::PollOutcome;

/// Cookie persisting a poller's last-seen version between requests
pub const VERSION_COOKIE: &str = "CHIMED_VERSION";

/// Cookie whose presence marks a poller as locally muted
pub const MUTE_COOKIE: &str = "CHIMED_MUTE";

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    status: String,
}

#[derive(Debug, Deserialize)]
pub struct PollQuery {
    /// Last-seen version; falls back to the version cookie when absent
    version: Option<i64>,
}

/// Wire format of a poll response: `v` is the version to store (`-1` when
/// muted), `play` the sound to fetch, `d` the milliseconds to wait before
/// playing (or before re-polling, when muted), `x` marks an explicit
/// clear. `play` and `x` are omitted entirely when they do not apply.
#[derive(Debug, Serialize)]
pub struct PollResponse {
    v: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    play: Option<String>,
    d: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    x: Option<bool>,
}

impl From<PollOutcome> for PollResponse {
    fn from(outcome: PollOutcome) -> Self {
        Self {
            v: outcome.version,
            play: outcome.play,
            d: outcome.delay_ms,
            x: outcome.cleared.then_some(true),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TriggerRequest {
    url: String,
    delay_ms: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct TriggerResponse {
    status: String,
    version: u64,
}

#[derive(Debug, Serialize)]
pub struct QueueResponse {
    version: u64,
    sounds: Vec<QueuedSoundInfo>,
}

#[derive(Debug, Serialize)]
pub struct QueuedSoundInfo {
    version: u64,
    url: String,
    delay_ms: u64,
    expired: bool,
}

// ============================================================================
// Health Endpoint
// ============================================================================

/// GET /health - Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        module: "chimed".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============================================================================
// Poll Endpoint
// ============================================================================

/// GET /sounds/poll - Poll for the next unplayed sound
///
/// The `version` query parameter takes precedence over the version
/// cookie. Negative cookie or parameter values (a stored mute sentinel)
/// are treated as absent, so a freshly unmuted client rebaselines instead
/// of resuming from `-1`. The returned version is always written back to
/// the cookie for the next poll.
pub async fn poll_sounds(
    State(ctx): State<AppContext>,
    Query(query): Query<PollQuery>,
    jar: CookieJar,
) -> (CookieJar, Json<PollResponse>) {
    let last_version = query
        .version
        .or_else(|| {
            jar.get(VERSION_COOKIE)
                .and_then(|c| c.value().parse::<i64>().ok())
        })
        .and_then(|v| u64::try_from(v).ok());
    let muted = jar.get(MUTE_COOKIE).is_some();

    let outcome = ctx.state.resolve_poll(last_version, muted).await;
    debug!(
        "Poll from {:?} resolved to version {} (play: {:?})",
        last_version, outcome.version, outcome.play
    );

    let mut cookie = Cookie::new(VERSION_COOKIE, outcome.version.to_string());
    cookie.set_path("/");
    let jar = jar.add(cookie);

    (jar, Json(outcome.into()))
}

// ============================================================================
// Administrative Endpoints
// ============================================================================

/// POST /sounds/trigger - Queue a sound for all pollers
pub async fn trigger_sound(
    State(ctx): State<AppContext>,
    Json(req): Json<TriggerRequest>,
) -> Json<TriggerResponse> {
    let version = ctx.state.trigger_sound(req.url.clone(), req.delay_ms).await;
    info!("Queued sound {} at version {}", req.url, version);

    Json(TriggerResponse {
        status: "ok".to_string(),
        version,
    })
}

/// POST /sounds/cancel - Drop every queued sound
///
/// No payload beyond a status; pollers observe the effect on their next
/// poll as a version jump with the cleared flag set.
pub async fn cancel_sounds(State(ctx): State<AppContext>) -> Json<StatusResponse> {
    let version = ctx.state.cancel_all().await;
    info!("Cancelled queued sounds, version now {}", version);

    Json(StatusResponse {
        status: "ok".to_string(),
    })
}

// ============================================================================
// Queue Inspection
// ============================================================================

/// GET /sounds/queue - Inspect currently queued sounds
///
/// Reports events that survived the eviction pass, including those inside
/// their grace window (`expired: true`).
pub async fn get_queue(State(ctx): State<AppContext>) -> Json<QueueResponse> {
    let (version, events) = ctx.state.queue_snapshot().await;
    let now = Utc::now();

    let sounds = events
        .iter()
        .map(|event| QueuedSoundInfo {
            version: event.sequence_version(),
            url: event.url().to_string(),
            delay_ms: event.delay_remaining(now),
            expired: event.is_expired(now),
        })
        .collect();

    Json(QueueResponse { version, sounds })
}
