//! Dashboards, charts and headline numbers

use axum::{extract::State, Json};

use super::HandlerResult;
use crate::database::repositories::reports::HomeTotals;
use crate::http::{AppState, CurrentUser};
use crate::services::dashboard::{Charts, Dashboard, Statistics};

/// GET /api/dashboard
pub async fn dashboard(State(state): State<AppState>, CurrentUser(principal): CurrentUser) -> HandlerResult<Dashboard> {
    Ok(Json(state.services.dashboard.dashboard(&principal).await?))
}

/// GET /api/dashboard/charts
pub async fn charts(State(state): State<AppState>, CurrentUser(principal): CurrentUser) -> HandlerResult<Charts> {
    Ok(Json(state.services.dashboard.charts(&principal).await?))
}

/// GET /api/stats
pub async fn statistics(State(state): State<AppState>, CurrentUser(principal): CurrentUser) -> HandlerResult<Statistics> {
    Ok(Json(state.services.dashboard.statistics(&principal).await?))
}

/// GET /api/home
pub async fn home(State(state): State<AppState>, CurrentUser(_principal): CurrentUser) -> HandlerResult<HomeTotals> {
    Ok(Json(state.services.dashboard.home().await?))
}
