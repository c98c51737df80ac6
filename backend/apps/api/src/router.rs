//! API Router

use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::handlers;
use crate::middleware::rate_limit;
use crate::state::AppState;

/// Routes under `/api`; credential-handling routes are rate limited
pub fn api_router(state: AppState) -> Router {
    let limited = Router::new()
        .route("/auth/sign-up", post(handlers::sign_up))
        .route("/auth/sign-in", post(handlers::sign_in))
        .route("/uploads/validate", post(handlers::validate_upload))
        .route_layer(middleware::from_fn_with_state(state.clone(), rate_limit));

    let open = Router::new()
        .route("/auth/session", get(handlers::check_session))
        .route("/auth/csrf", get(handlers::issue_csrf))
        .route("/auth/sign-out", post(handlers::sign_out))
        .route("/security/stats", get(handlers::security_stats));

    Router::new()
        .nest("/api", limited.merge(open))
        .with_state(state)
}
