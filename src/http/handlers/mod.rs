//! HTTP handlers for the REST API.
//!
//! Each handler authenticates through [`CurrentUser`](super::CurrentUser)
//! and delegates to the service layer.

pub mod accounts;
pub mod attendance;
pub mod auth;
pub mod dashboard;
pub mod directory;
pub mod events;
pub mod reports;

use axum::{extract::State, http::StatusCode, Json};

use super::state::AppState;
use crate::services::ServiceHealthStatus;
use crate::utils::errors::KindergartenError;

/// Result type for handlers.
pub type HandlerResult<T> = Result<Json<T>, KindergartenError>;

/// GET /health
///
/// Liveness probe that also pings the database.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<ServiceHealthStatus>) {
    let status = state.services.health_check().await;
    let code = if status.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(status))
}
