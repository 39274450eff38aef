//! Global token-bucket rate limiting.

use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use axum::{
    Json,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::AppState;
use crate::error::ErrorBody;

/// Token bucket shared by every client.
///
/// Refills at `rate_per_sec` up to `burst_size`; each admitted request
/// takes one token.
#[derive(Debug)]
pub struct SimpleRateLimiter {
    /// (last refill, tokens available)
    state: Mutex<(Instant, f32)>,
    rate_per_sec: f32,
    burst_size: f32,
}

impl SimpleRateLimiter {
    #[must_use]
    pub fn new(rate_per_sec: f32, burst_size: f32) -> Self {
        Self {
            state: Mutex::new((Instant::now(), burst_size)),
            rate_per_sec,
            burst_size,
        }
    }

    /// Take a token if one is available.
    pub fn check(&self) -> bool {
        let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let (last_update, tokens) = *guard;
        let now = Instant::now();
        let elapsed = now.duration_since(last_update).as_secs_f32();

        let tokens = (tokens + elapsed * self.rate_per_sec).min(self.burst_size);
        if tokens >= 1.0 {
            *guard = (now, tokens - 1.0);
            true
        } else {
            *guard = (now, tokens);
            false
        }
    }
}

pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    if state.config.resilience.rate_limit_enabled && !state.rate_limiter.check() {
        tracing::warn!(path = %req.uri().path(), "Rate limit exceeded");
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(ErrorBody {
                detail: "Too many requests".to_string(),
            }),
        )
            .into_response();
    }
    next.run(req).await
}
