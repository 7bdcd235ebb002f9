//! Login and the current account

use axum::{extract::State, Json};

use super::HandlerResult;
use crate::http::{AppState, CurrentUser};
use crate::services::auth::{LoginRequest, MeResponse, TokenResponse};

/// POST /api/auth/login
pub async fn login(State(state): State<AppState>, Json(request): Json<LoginRequest>) -> HandlerResult<TokenResponse> {
    Ok(Json(state.services.auth.login(request).await?))
}

/// GET /api/auth/me
pub async fn me(State(state): State<AppState>, CurrentUser(principal): CurrentUser) -> HandlerResult<MeResponse> {
    Ok(Json(state.services.auth.me(&principal).await?))
}
