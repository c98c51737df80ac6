//! HTTP Handlers
//!
//! Each route wires the security components in a fixed order:
//! rate limit (middleware) -> input validation -> password check ->
//! session + tokens, recording outcomes in the security log.

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use platform::cookie::{
    BEARER_COOKIE_NAME, SESSION_COOKIE_NAME, delete_cookie_header, extract_cookie,
    set_cookie_header,
};
use security::{Claims, Severity};
use serde_json::json;

use crate::accounts::{Role, normalize_email};
use crate::dto::{
    CsrfResponse, SessionResponse, SignInRequest, SignInResponse, SignUpRequest, SignUpResponse,
    StatsResponse, UploadCheckRequest, UploadCheckResponse,
};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Header carrying the anti-forgery token on state-changing requests
pub const CSRF_HEADER: &str = "x-csrf-token";

/// Session bound to the request's `sid` cookie
#[derive(Debug, Clone)]
pub struct CurrentSession {
    pub session_id: String,
    pub user_id: String,
    pub role: String,
}

/// POST /api/auth/sign-up
pub async fn sign_up(
    State(state): State<AppState>,
    Json(req): Json<SignUpRequest>,
) -> ApiResult<(StatusCode, Json<SignUpResponse>)> {
    let validator = &state.services.validator;
    let mut errors = Vec::new();

    let email = normalize_email(&req.email);
    if !validator.validate_email(&email) {
        errors.push("Invalid email address".to_string());
    }
    let display_name = validator.sanitize_string(&req.display_name);
    if display_name.is_empty() {
        errors.push("Display name is required".to_string());
    }
    errors.extend(validator.validate_password(&req.password).errors);

    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let role = req.role.unwrap_or(Role::Client);
    if !role.is_self_service() {
        state.services.logger.log_security_event(
            "privileged_sign_up_attempt",
            json!({ "email": email, "role": role.as_str() }),
            Severity::High,
        );
        return Err(ApiError::Forbidden);
    }

    if state.accounts.find_by_email(&email).is_some() {
        return Err(ApiError::EmailTaken);
    }

    let record = hash_password(&state, req.password).await?;
    let account = state
        .accounts
        .register(&email, &display_name, role, record)?;

    state.services.logger.log_security_event(
        "user_registered",
        json!({ "user_id": account.id, "role": role.as_str() }),
        Severity::Low,
    );

    Ok((
        StatusCode::CREATED,
        Json(SignUpResponse {
            user_id: account.id,
            email: account.email,
            display_name: account.display_name,
            role: account.role,
        }),
    ))
}

/// POST /api/auth/sign-in
pub async fn sign_in(
    State(state): State<AppState>,
    Json(req): Json<SignInRequest>,
) -> ApiResult<Response> {
    let services = &state.services;

    let email = normalize_email(&req.email);
    if !services.validator.validate_email(&email) {
        return Err(ApiError::Validation(vec!["Invalid email address".to_string()]));
    }

    // counted as a failure until the password checks out
    let attempts = services.rate_limiter.reserve_login_attempt(&email);
    if !attempts.allowed {
        services.logger.log_security_event(
            "login_blocked",
            json!({ "email": email, "lockout_until_ms": attempts.lockout_until_ms }),
            Severity::High,
        );
        let until_ms = attempts.lockout_until_ms.unwrap_or_else(|| state.clock.now_ms());
        return Err(ApiError::AccountLocked {
            retry_after_secs: secs_until(state.clock.now_ms(), until_ms),
        });
    }

    let account = state.accounts.find_by_email(&email);
    let verified = match &account {
        Some(account) => {
            verify_password(&state, req.password, account.password_record.clone()).await?
        }
        None => false,
    };

    let Some(account) = account.filter(|_| verified) else {
        services.logger.log_security_event(
            "login_failed",
            json!({ "email": email, "remaining_attempts": attempts.remaining_attempts }),
            Severity::Medium,
        );
        return Err(ApiError::InvalidCredentials);
    };
    services.rate_limiter.record_login_attempt(&email, true);

    let session_id = services
        .sessions
        .create_session(&account.id, account.role.as_str());

    let mut claims = Claims::new();
    claims.insert("sub".to_string(), json!(account.id));
    claims.insert("email".to_string(), json!(account.email));
    claims.insert("role".to_string(), json!(account.role.as_str()));
    let access_token = services.tokens.generate_jwt(&claims);
    let csrf_token = services.tokens.generate_csrf_token(&account.id, &session_id);

    services.logger.log_security_event(
        "login_success",
        json!({ "user_id": account.id }),
        Severity::Low,
    );

    let mut response = Json(SignInResponse {
        user_id: account.id,
        role: account.role,
        access_token: access_token.clone(),
        csrf_token,
        expires_in_secs: services.tokens.jwt_ttl().as_secs(),
    })
    .into_response();

    append_cookie(&mut response, set_cookie_header(&state.session_cookie(), &session_id))?;
    append_cookie(&mut response, set_cookie_header(&state.bearer_cookie(), &access_token))?;

    Ok(response)
}

/// GET /api/auth/session
///
/// Also slides the session expiry forward.
pub async fn check_session(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<SessionResponse>> {
    let current = require_session(&state, &headers)?;
    state.services.sessions.refresh_session(&current.session_id);

    Ok(Json(SessionResponse {
        authenticated: true,
        user_id: current.user_id,
        role: current.role,
    }))
}

/// GET /api/auth/csrf
pub async fn issue_csrf(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<CsrfResponse>> {
    let current = require_session(&state, &headers)?;
    let csrf_token = state
        .services
        .tokens
        .generate_csrf_token(&current.user_id, &current.session_id);

    Ok(Json(CsrfResponse { csrf_token }))
}

/// POST /api/auth/sign-out
pub async fn sign_out(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let current = require_session(&state, &headers)?;
    require_csrf(&state, &headers, &current, "/api/auth/sign-out")?;

    state.services.sessions.destroy_session(&current.session_id);
    state.services.logger.log_security_event(
        "logout",
        json!({ "user_id": current.user_id }),
        Severity::Low,
    );

    let mut response = StatusCode::NO_CONTENT.into_response();
    append_cookie(&mut response, delete_cookie_header(&state.session_cookie()))?;
    append_cookie(&mut response, delete_cookie_header(&state.bearer_cookie()))?;

    tracing::info!(user_id = %current.user_id, "Signed out");
    Ok(response)
}

/// POST /api/uploads/validate
pub async fn validate_upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<UploadCheckRequest>,
) -> ApiResult<Json<UploadCheckResponse>> {
    let current = require_session(&state, &headers)?;
    let services = &state.services;

    let filename = services.validator.sanitize_string(&req.filename);
    let report = services.validator.validate_file_upload(&req.filename, req.size);

    if !report.valid {
        services.logger.log_security_event(
            "upload_rejected",
            json!({
                "user_id": current.user_id,
                "filename": filename,
                "size": req.size,
                "errors": report.errors,
            }),
            Severity::Medium,
        );
    }

    Ok(Json(UploadCheckResponse {
        filename,
        valid: report.valid,
        errors: report.errors,
    }))
}

/// GET /api/security/stats (admin bearer token)
pub async fn security_stats(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<StatsResponse>> {
    let services = &state.services;

    let claims = bearer_token(&headers)
        .and_then(|token| services.tokens.validate_jwt(&token))
        .ok_or(ApiError::Unauthenticated)?;

    if claims.get("role").and_then(|r| r.as_str()) != Some(Role::Admin.as_str()) {
        services.logger.log_security_event(
            "admin_access_denied",
            json!({ "sub": claims.get("sub") }),
            Severity::Medium,
        );
        return Err(ApiError::Forbidden);
    }

    Ok(Json(StatsResponse {
        active_sessions: services.sessions.active_sessions(),
        registered_accounts: state.accounts.len(),
        stats: services.logger.get_security_stats(),
    }))
}

// ============================================================================
// Helpers
// ============================================================================

/// Resolve the `sid` cookie to a live session
pub fn require_session(state: &AppState, headers: &HeaderMap) -> ApiResult<CurrentSession> {
    let session_id =
        extract_cookie(headers, SESSION_COOKIE_NAME).ok_or(ApiError::Unauthenticated)?;
    let validation = state.services.sessions.validate_session(&session_id);

    match (validation.valid, validation.user_id, validation.role) {
        (true, Some(user_id), Some(role)) => Ok(CurrentSession {
            session_id,
            user_id,
            role,
        }),
        _ => Err(ApiError::Unauthenticated),
    }
}

/// Check the `X-CSRF-Token` header against the current session
fn require_csrf(
    state: &AppState,
    headers: &HeaderMap,
    current: &CurrentSession,
    route: &str,
) -> ApiResult<()> {
    let valid = headers
        .get(CSRF_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|token| {
            state
                .services
                .tokens
                .validate_csrf_token(token, &current.user_id, &current.session_id)
        });

    if !valid {
        state.services.logger.log_security_event(
            "csrf_rejected",
            json!({ "user_id": current.user_id, "route": route }),
            Severity::High,
        );
        return Err(ApiError::CsrfRejected);
    }
    Ok(())
}

/// `Authorization: Bearer` header first, then the `access_token` cookie
fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .or_else(|| extract_cookie(headers, BEARER_COOKIE_NAME))
}

fn append_cookie(response: &mut Response, cookie: Option<HeaderValue>) -> ApiResult<()> {
    let cookie = cookie.ok_or_else(|| ApiError::Internal("invalid cookie value".to_string()))?;
    response.headers_mut().append(header::SET_COOKIE, cookie);
    Ok(())
}

fn secs_until(now_ms: i64, until_ms: i64) -> u64 {
    ((until_ms - now_ms).max(0) as u64).div_ceil(1000).max(1)
}

/// Argon2 is CPU-bound; keep it off the async workers
async fn hash_password(state: &AppState, password: String) -> ApiResult<String> {
    let passwords = state.services.passwords.clone();
    let record = tokio::task::spawn_blocking(move || passwords.hash_password(&password))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;
    Ok(record.to_string())
}

async fn verify_password(state: &AppState, password: String, record: String) -> ApiResult<bool> {
    let passwords = state.services.passwords.clone();
    tokio::task::spawn_blocking(move || passwords.verify_password(&password, &record))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))
}
