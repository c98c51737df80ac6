//! Rate Limit Middleware
//!
//! Fixed-window limit per client IP and route, applied before any handler
//! touches credentials.

use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderValue, Request};
use axum::middleware::Next;
use axum::response::Response;
use platform::client::{extract_client_ip, rate_limit_key};
use platform::rate_limit::{RateLimitConfig, RateLimitResult, RateLimitStore};
use security::Severity;
use serde_json::json;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub const RATE_LIMIT_REMAINING_HEADER: &str = "x-ratelimit-remaining";

/// Count the request and reject it once the window is exhausted
pub async fn rate_limit(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> ApiResult<Response> {
    let direct_ip = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip());
    let client_ip = extract_client_ip(req.headers(), direct_ip);
    let key = rate_limit_key(client_ip, req.uri().path());

    let limiter = &state.services.rate_limiter;
    let result = check_rate_limit(limiter, &key, limiter.config()).await?;

    if !result.allowed {
        state.services.logger.log_security_event(
            "rate_limit_exceeded",
            json!({ "key": key, "reset_at_ms": result.reset_at_ms }),
            Severity::Medium,
        );
        return Err(ApiError::RateLimited {
            retry_after_secs: result.retry_after_secs(state.clock.now_ms()),
        });
    }

    let mut response = next.run(req).await;
    response.headers_mut().insert(
        RATE_LIMIT_REMAINING_HEADER,
        HeaderValue::from(result.remaining),
    );
    Ok(response)
}

/// Count one request against any storage backend
///
/// Store failures reject the request rather than letting it through.
pub async fn check_rate_limit<S>(
    store: &S,
    key: &str,
    config: &RateLimitConfig,
) -> ApiResult<RateLimitResult>
where
    S: RateLimitStore + Sync,
{
    store
        .check_and_increment(key, config)
        .await
        .map_err(|e| ApiError::RateLimitStore(e.to_string()))
}
