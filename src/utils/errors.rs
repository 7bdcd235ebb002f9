//! Error handling for the kindergarten service
//!
//! This module defines the main error type used throughout the application
//! and provides a unified error handling strategy.

use thiserror::Error;

/// SQLSTATE reported by PostgreSQL for unique constraint violations
const UNIQUE_VIOLATION: &str = "23505";

/// SQLSTATE reported by PostgreSQL for foreign key violations
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// SQLSTATE reported by PostgreSQL for check constraint violations
const CHECK_VIOLATION: &str = "23514";

/// Main error type for the kindergarten application
#[derive(Error, Debug)]
pub enum KindergartenError {
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("Password hashing error: {0}")]
    PasswordHash(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for kindergarten operations
pub type Result<T> = std::result::Result<T, KindergartenError>;

impl From<sqlx::Error> for KindergartenError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            match db_err.code().as_deref() {
                Some(UNIQUE_VIOLATION) => {
                    let constraint = db_err.constraint().unwrap_or("unique constraint");
                    return KindergartenError::Conflict(format!(
                        "Record already exists ({})",
                        constraint
                    ));
                }
                Some(FOREIGN_KEY_VIOLATION) => {
                    let constraint = db_err.constraint().unwrap_or("foreign key");
                    return KindergartenError::InvalidInput(format!(
                        "Referenced record does not exist ({})",
                        constraint
                    ));
                }
                Some(CHECK_VIOLATION) => {
                    return KindergartenError::InvalidInput(db_err.message().to_string());
                }
                _ => {}
            }
        }
        KindergartenError::Database(err)
    }
}

impl From<config::ConfigError> for KindergartenError {
    fn from(err: config::ConfigError) -> Self {
        KindergartenError::Config(err.to_string())
    }
}

impl KindergartenError {
    /// Shorthand for a missing record
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        KindergartenError::NotFound { entity, id }
    }

    /// Shorthand for a permission failure
    pub fn forbidden(message: impl Into<String>) -> Self {
        KindergartenError::PermissionDenied(message.into())
    }

    /// Shorthand for a validation failure
    pub fn invalid(message: impl Into<String>) -> Self {
        KindergartenError::InvalidInput(message.into())
    }

    /// Machine readable error code
    pub fn code(&self) -> &'static str {
        match self {
            KindergartenError::Database(_) => "DATABASE_ERROR",
            KindergartenError::Migration(_) => "MIGRATION_ERROR",
            KindergartenError::Config(_) => "CONFIG_ERROR",
            KindergartenError::PermissionDenied(_) => "FORBIDDEN",
            KindergartenError::NotFound { .. } => "NOT_FOUND",
            KindergartenError::Conflict(_) => "CONFLICT",
            KindergartenError::Authentication(_) => "UNAUTHORIZED",
            KindergartenError::InvalidInput(_) => "INVALID_INPUT",
            KindergartenError::Token(_) => "UNAUTHORIZED",
            KindergartenError::PasswordHash(_) => "INTERNAL_ERROR",
            KindergartenError::Serialization(_) => "INTERNAL_ERROR",
            KindergartenError::Io(_) => "INTERNAL_ERROR",
        }
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            KindergartenError::Database(_) => ErrorSeverity::Critical,
            KindergartenError::Migration(_) => ErrorSeverity::Critical,
            KindergartenError::Config(_) => ErrorSeverity::Critical,
            KindergartenError::PermissionDenied(_) => ErrorSeverity::Warning,
            KindergartenError::Authentication(_) => ErrorSeverity::Warning,
            KindergartenError::Token(_) => ErrorSeverity::Warning,
            KindergartenError::InvalidInput(_) => ErrorSeverity::Info,
            KindergartenError::NotFound { .. } => ErrorSeverity::Info,
            KindergartenError::Conflict(_) => ErrorSeverity::Info,
            _ => ErrorSeverity::Error,
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "INFO"),
            ErrorSeverity::Warning => write!(f, "WARN"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        let err = KindergartenError::not_found("Student", 42);
        assert_eq!(err.to_string(), "Student not found: 42");
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[test]
    fn test_severity() {
        assert_eq!(KindergartenError::forbidden("no").severity(), ErrorSeverity::Warning);
        assert_eq!(KindergartenError::invalid("bad").severity(), ErrorSeverity::Info);
        assert_eq!(
            KindergartenError::Config("broken".to_string()).severity(),
            ErrorSeverity::Critical
        );
    }

    #[test]
    fn test_row_not_found_is_database_error() {
        let err: KindergartenError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, KindergartenError::Database(_)));
    }
}
