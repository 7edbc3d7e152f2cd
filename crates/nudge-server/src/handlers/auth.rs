//! Authentication-related handlers

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::{Deserialize, Serialize};

use nudge_core::models::Session;

use crate::{AppError, AppState};

/// Email and password, for both sign-up and sign-in
#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

/// Issued session; send `token` as `Authorization: Bearer <token>`
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub user_id: i64,
    pub email: String,
}

impl From<Session> for SessionResponse {
    fn from(s: Session) -> Self {
        Self {
            token: s.token,
            user_id: s.user_id,
            email: s.email,
        }
    }
}

/// Response for the /api/me endpoint
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user_id: i64,
    pub email: String,
    pub display_name: String,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// POST /api/auth/signup - Create an account and start a session
pub async fn sign_up(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CredentialsRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), AppError> {
    // Sign-up problems are about the submitted form, not missing credentials
    let session = state
        .auth
        .sign_up(&body.email, &body.password)
        .map_err(|e| match e {
            nudge_core::Error::Auth(msg) => AppError::bad_request(&msg),
            other => AppError::from(other),
        })?;

    Ok((StatusCode::CREATED, Json(session.into())))
}

/// POST /api/auth/login - Start a session
pub async fn sign_in(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CredentialsRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let session = state.auth.sign_in(&body.email, &body.password)?;
    Ok(Json(session.into()))
}

/// POST /api/auth/logout - Revoke the caller's token and drop any open decision
pub async fn sign_out(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.auth.revoke(&session.token)?;
    state.workflows.reset(session.user_id);
    Ok(Json(SuccessResponse { success: true }))
}

/// GET /api/me - The authenticated user
pub async fn get_me(Extension(session): Extension<Session>) -> Json<MeResponse> {
    Json(MeResponse {
        user_id: session.user_id,
        display_name: session.display_name().to_string(),
        email: session.email,
    })
}
