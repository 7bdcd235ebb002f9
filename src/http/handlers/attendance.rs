//! Attendance roster, marking and records

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;

use super::HandlerResult;
use crate::http::{AppState, CurrentUser};
use crate::models::{
    Attendance, AttendanceEntry, AttendanceFilter, BulkMarkOutcome, BulkMarkRequest,
    MarkAttendanceRequest, Page, PageRequest, RosterEntry, UpdateAttendanceRequest,
};
use crate::utils::errors::KindergartenError;
use crate::utils::helpers::today;

#[derive(Debug, Deserialize)]
pub struct RosterQuery {
    pub date: Option<NaiveDate>,
    pub group: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct StatusBody {
    pub status: bool,
}

pub async fn list_attendance(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Query(filter): Query<AttendanceFilter>,
    Query(page): Query<PageRequest>,
) -> HandlerResult<Page<AttendanceEntry>> {
    Ok(Json(state.services.attendance.list(&principal, &filter, &page).await?))
}

pub async fn get_attendance(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Path(id): Path<i64>,
) -> HandlerResult<AttendanceEntry> {
    Ok(Json(state.services.attendance.get(&principal, id).await?))
}

/// GET /api/attendance/roster?date=&group=
pub async fn roster(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Query(query): Query<RosterQuery>,
) -> HandlerResult<Vec<RosterEntry>> {
    let date = query.date.unwrap_or_else(today);
    Ok(Json(state.services.attendance.roster(&principal, date, query.group).await?))
}

/// POST /api/attendance, creating or overwriting the day's record
pub async fn mark_attendance(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Json(request): Json<MarkAttendanceRequest>,
) -> HandlerResult<Attendance> {
    Ok(Json(state.services.attendance.mark(&principal, request).await?))
}

pub async fn bulk_mark(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Json(request): Json<BulkMarkRequest>,
) -> HandlerResult<BulkMarkOutcome> {
    Ok(Json(state.services.attendance.bulk_mark(&principal, request).await?))
}

pub async fn update_attendance(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Path(id): Path<i64>,
    Json(request): Json<UpdateAttendanceRequest>,
) -> HandlerResult<Attendance> {
    Ok(Json(state.services.attendance.update(&principal, id, request).await?))
}

pub async fn set_attendance_status(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Path(id): Path<i64>,
    Json(body): Json<StatusBody>,
) -> HandlerResult<Attendance> {
    Ok(Json(state.services.attendance.set_status(&principal, id, body.status).await?))
}

pub async fn delete_attendance(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, KindergartenError> {
    state.services.attendance.delete(&principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
