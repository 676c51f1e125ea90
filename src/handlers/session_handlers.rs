//! Sign-in, sign-out and the session-gated dashboard view.
//!
//! - POST   /api/session   -> exchange credentials for a bearer token
//! - DELETE /api/session   -> end the caller's session
//! - GET    /api/dashboard -> login view, or the dashboard for a signed-in admin

use crate::{
    errors::AppError,
    models::session::{Session, User},
    routes::routes::AppState,
    services::session_gate::{self, DashboardView},
};
use axum::{
    Json,
    extract::{FromRequestParts, State},
    http::{HeaderMap, StatusCode, header, request::Parts},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    #[serde(default)]
    pub identifier: String,
    #[serde(default)]
    pub secret: String,
}

/// A request carrying a live admin session.
#[derive(Debug, Clone)]
pub struct AdminUser {
    pub user: User,
    pub token: String,
}

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let token = extract_bearer_token(&parts.headers)?;
        let user = state
            .sessions
            .user_for_token(token)
            .await
            .ok_or_else(|| AppError::unauthorized("Session expired or signed out"))?;
        Ok(Self {
            user,
            token: token.to_string(),
        })
    }
}

pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let header = headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| AppError::unauthorized("Missing Authorization header"))?
        .to_str()
        .map_err(|_| AppError::unauthorized("Authorization header is not valid UTF-8"))?;

    let (scheme, token) = header
        .split_once(' ')
        .ok_or_else(|| AppError::unauthorized("Authorization header must be `Bearer <token>`"))?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AppError::unauthorized(
            "Authorization scheme must be `Bearer`",
        ));
    }
    let token = token.trim();
    if token.is_empty() {
        return Err(AppError::unauthorized("Bearer token is empty"));
    }

    Ok(token)
}

/// `POST /api/session`
pub async fn sign_in(
    State(state): State<AppState>,
    Json(req): Json<SignInRequest>,
) -> Result<Json<Session>, AppError> {
    let session = session_gate::sign_in(&*state.sessions, &req.identifier, &req.secret).await?;
    Ok(Json(session))
}

/// `DELETE /api/session`
pub async fn sign_out(
    State(state): State<AppState>,
    admin: AdminUser,
) -> Result<impl IntoResponse, AppError> {
    state.sessions.sign_out(&admin.token).await?;
    info!(uid = %admin.user.uid, "admin signed out");
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/dashboard`
///
/// Anonymous callers always get the login view; a signed-in admin gets the
/// gate's current dashboard.
pub async fn dashboard(State(state): State<AppState>, headers: HeaderMap) -> Json<DashboardView> {
    let signed_in = match extract_bearer_token(&headers) {
        Ok(token) => state.sessions.user_for_token(token).await.is_some(),
        Err(_) => false,
    };

    if signed_in {
        Json(state.gate.snapshot().await)
    } else {
        Json(DashboardView::Login)
    }
}
