//! API Server Entry Point
//!
//! Application entry point and server initialization.
//! Uses `anyhow` for startup errors, but request-level errors
//! go through `error::ApiError` and render as `kernel::error::AppError`.

mod accounts;
mod config;
mod dto;
mod error;
mod handlers;
mod middleware;
mod router;
mod state;
mod sweep;

use anyhow::Context;
use axum::{
    Router, http,
    http::{Method, header},
};
use kernel::clock::SystemClock;
use security::{SecurityConfig, SecurityServices};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::ApiConfig;
use crate::router::api_router;
use crate::state::AppState;
use crate::sweep::spawn_sweeper;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "api=info,security=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Refuse to start without a signing secret
    let security_config =
        SecurityConfig::from_env().context("Security configuration is invalid")?;
    tracing::info!(config = ?security_config, "Security configuration loaded");

    let api_config = ApiConfig::from_env()?;

    let clock = SystemClock::shared();
    let services = SecurityServices::from_config(&security_config, clock.clone())?;
    let state = AppState::new(services, clock, api_config.secure_cookies);

    if let Some(admin) = &api_config.admin {
        state
            .seed_admin(&admin.email, &admin.password)
            .map_err(|e| anyhow::anyhow!("Failed to seed admin account: {}", e))?;
    }

    let sweeper = spawn_sweeper(state.services.clone(), api_config.sweep_interval);

    // CORS configuration
    let allowed_origins: Vec<http::HeaderValue> = api_config
        .frontend_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods(AllowMethods::list([
            Method::GET,
            Method::POST,
            Method::OPTIONS,
        ]))
        .allow_headers(AllowHeaders::list([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
            http::HeaderName::from_static(handlers::CSRF_HEADER),
        ]))
        .allow_credentials(true);

    // Build router
    let app = Router::new()
        .merge(api_router(state))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    tracing::info!("Listening on {}", api_config.addr);

    let listener = TcpListener::bind(api_config.addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    sweeper.abort();
    Ok(())
}
