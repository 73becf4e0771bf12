//! Shared-secret gate for mutating endpoints
//!
//! Authorization proper is not the queue's business; this middleware is
//! the boundary that must pass before any mutation reaches it. A shared
//! secret of 0 disables checking entirely, which is also how the test
//! suite runs.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::warn;

use crate::api::AppContext;

/// Header carrying the shared secret on protected requests
pub const SHARED_SECRET_HEADER: &str = "x-shared-secret";

/// Authentication middleware
///
/// Compares the request's secret header against the configured secret.
/// Returns 401 Unauthorized when they differ, 400 when the header cannot
/// be parsed.
pub async fn auth_middleware(
    State(ctx): State<AppContext>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let secret = ctx.state.config().shared_secret;
    if secret == 0 {
        // Auth disabled - pass through without validation
        return Ok(next.run(request).await);
    }

    let provided = request
        .headers()
        .get(SHARED_SECRET_HEADER)
        .ok_or(AuthError::MissingSecret)?
        .to_str()
        .map_err(|_| AuthError::MalformedSecret)?
        .parse::<i64>()
        .map_err(|_| AuthError::MalformedSecret)?;

    if provided != secret {
        warn!("Shared secret mismatch on {}", request.uri().path());
        return Err(AuthError::InvalidSecret);
    }

    Ok(next.run(request).await)
}

/// Authentication error types for HTTP responses
#[derive(Debug)]
pub enum AuthError {
    MissingSecret,
    MalformedSecret,
    InvalidSecret,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingSecret => (StatusCode::UNAUTHORIZED, "Missing shared secret"),
            AuthError::MalformedSecret => (StatusCode::BAD_REQUEST, "Malformed shared secret"),
            AuthError::InvalidSecret => (StatusCode::UNAUTHORIZED, "Invalid shared secret"),
        };

        let body = Json(json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}
