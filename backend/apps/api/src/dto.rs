//! API DTOs (Data Transfer Objects)

use serde::{Deserialize, Serialize};

use crate::accounts::Role;

/// Request for POST /api/auth/sign-up
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub display_name: String,
    #[serde(default)]
    pub role: Option<Role>,
}

/// Response for POST /api/auth/sign-up
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpResponse {
    pub user_id: String,
    pub email: String,
    pub display_name: String,
    pub role: Role,
}

/// Request for POST /api/auth/sign-in
#[derive(Debug, Clone, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

/// Response for POST /api/auth/sign-in
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInResponse {
    pub user_id: String,
    pub role: Role,
    pub access_token: String,
    pub csrf_token: String,
    pub expires_in_secs: u64,
}

/// Response for GET /api/auth/session
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub authenticated: bool,
    pub user_id: String,
    pub role: String,
}

/// Response for GET /api/auth/csrf
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CsrfResponse {
    pub csrf_token: String,
}

/// Request for POST /api/uploads/validate
#[derive(Debug, Clone, Deserialize)]
pub struct UploadCheckRequest {
    pub filename: String,
    pub size: u64,
}

/// Response for POST /api/uploads/validate
#[derive(Debug, Clone, Serialize)]
pub struct UploadCheckResponse {
    pub filename: String,
    pub valid: bool,
    pub errors: Vec<String>,
}

/// Response for GET /api/security/stats
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub active_sessions: usize,
    pub registered_accounts: usize,
    #[serde(flatten)]
    pub stats: security::SecurityStats,
}
