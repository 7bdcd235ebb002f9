//! Report downloads

use axum::{
    extract::{Path, Query, State},
    http::header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    response::{IntoResponse, Response},
};

use crate::http::{AppState, CurrentUser};
use crate::reports::{RenderedReport, ReportKind};
use crate::services::ReportParams;
use crate::utils::errors::KindergartenError;

/// GET /api/reports/{kind}?format=json|csv|html
pub async fn get_report(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Path(kind): Path<String>,
    Query(params): Query<ReportParams>,
) -> Result<Response, KindergartenError> {
    let kind: ReportKind = kind.parse()?;
    let rendered = state.services.reports.export(&principal, kind, &params).await?;
    Ok(into_download(rendered))
}

fn into_download(report: RenderedReport) -> Response {
    match report.filename {
        Some(filename) => (
            [
                (CONTENT_TYPE, report.content_type.to_string()),
                (CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", filename)),
            ],
            report.body,
        )
            .into_response(),
        None => ([(CONTENT_TYPE, report.content_type.to_string())], report.body).into_response(),
    }
}
