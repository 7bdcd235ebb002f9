//! HTTP error handling and response types.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::utils::errors::{ErrorSeverity, KindergartenError};

/// API error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Status code for a domain error
pub fn status_for(err: &KindergartenError) -> StatusCode {
    match err {
        KindergartenError::InvalidInput(_) => StatusCode::UNPROCESSABLE_ENTITY,
        KindergartenError::NotFound { .. } => StatusCode::NOT_FOUND,
        KindergartenError::PermissionDenied(_) => StatusCode::FORBIDDEN,
        KindergartenError::Authentication(_) | KindergartenError::Token(_) => StatusCode::UNAUTHORIZED,
        KindergartenError::Conflict(_) => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for KindergartenError {
    fn into_response(self) -> Response {
        let status = status_for(&self);

        match self.severity() {
            ErrorSeverity::Critical | ErrorSeverity::Error => {
                error!(error = %self, code = self.code(), "Request failed")
            }
            ErrorSeverity::Warning => warn!(error = %self, code = self.code(), "Request rejected"),
            ErrorSeverity::Info => info!(error = %self, code = self.code(), "Request rejected"),
        }

        let body = match &self {
            KindergartenError::InvalidInput(msg)
            | KindergartenError::PermissionDenied(msg)
            | KindergartenError::Conflict(msg)
            | KindergartenError::Authentication(msg) => ApiError::new(self.code(), msg.clone()),
            KindergartenError::NotFound { .. } => ApiError::new(self.code(), self.to_string()),
            KindergartenError::Token(e) => {
                ApiError::new(self.code(), "Invalid or expired token").with_details(e.to_string())
            }
            // Internal failures are logged above, not echoed to the client
            _ => ApiError::new(self.code(), "Internal server error"),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(&KindergartenError::invalid("bad")), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(status_for(&KindergartenError::not_found("Group", 1)), StatusCode::NOT_FOUND);
        assert_eq!(status_for(&KindergartenError::forbidden("no")), StatusCode::FORBIDDEN);
        assert_eq!(
            status_for(&KindergartenError::Authentication("no token".into())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(status_for(&KindergartenError::Conflict("dup".into())), StatusCode::CONFLICT);
        assert_eq!(
            status_for(&KindergartenError::Config("broken".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_errors_are_not_echoed() {
        let response = KindergartenError::Config("secret path /etc/x".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_api_error_skips_empty_details() {
        let value = serde_json::to_value(ApiError::new("CONFLICT", "Duplicate")).unwrap();
        assert_eq!(value, serde_json::json!({"code": "CONFLICT", "message": "Duplicate"}));
    }
}
