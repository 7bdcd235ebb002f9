//! Calendar events

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use super::HandlerResult;
use crate::http::{AppState, CurrentUser};
use crate::models::{CreateEventRequest, Event, EventFilter, Page, PageRequest, UpdateEventRequest};
use crate::utils::errors::KindergartenError;

pub async fn list_events(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Query(filter): Query<EventFilter>,
    Query(page): Query<PageRequest>,
) -> HandlerResult<Page<Event>> {
    Ok(Json(state.services.events.list(&principal, &filter, &page).await?))
}

pub async fn get_event(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Path(id): Path<i64>,
) -> HandlerResult<Event> {
    Ok(Json(state.services.events.get(&principal, id).await?))
}

pub async fn create_event(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Json(request): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<Event>), KindergartenError> {
    let event = state.services.events.create(&principal, request).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

pub async fn update_event(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Path(id): Path<i64>,
    Json(request): Json<UpdateEventRequest>,
) -> HandlerResult<Event> {
    Ok(Json(state.services.events.update(&principal, id, request).await?))
}

pub async fn delete_event(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, KindergartenError> {
    state.services.events.delete(&principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
