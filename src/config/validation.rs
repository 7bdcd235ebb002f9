//! Configuration validation module
//!
//! This module provides validation functions for application configuration
//! to ensure all required settings are properly configured.

use super::Settings;
use crate::utils::errors::{KindergartenError, Result};

const MIN_SECRET_LENGTH: usize = 16;

/// Validate all configuration settings
pub fn validate_settings(settings: &Settings) -> Result<()> {
    validate_server_config(&settings.server)?;
    validate_database_config(&settings.database)?;
    validate_auth_config(&settings.auth)?;
    validate_logging_config(&settings.logging)?;
    validate_reports_config(&settings.reports)?;

    Ok(())
}

fn validate_server_config(config: &super::ServerConfig) -> Result<()> {
    if config.host.is_empty() {
        return Err(KindergartenError::Config("Server host is required".to_string()));
    }

    Ok(())
}

/// Validate database configuration
fn validate_database_config(config: &super::DatabaseConfig) -> Result<()> {
    if config.url.is_empty() {
        return Err(KindergartenError::Config("Database URL is required".to_string()));
    }

    if config.max_connections == 0 {
        return Err(KindergartenError::Config(
            "Max connections must be greater than 0".to_string(),
        ));
    }

    if config.min_connections > config.max_connections {
        return Err(KindergartenError::Config(
            "Min connections cannot be greater than max connections".to_string(),
        ));
    }

    Ok(())
}

/// Validate token authentication configuration
fn validate_auth_config(config: &super::AuthConfig) -> Result<()> {
    if config.jwt_secret.len() < MIN_SECRET_LENGTH {
        return Err(KindergartenError::Config(format!(
            "JWT secret must be at least {} bytes",
            MIN_SECRET_LENGTH
        )));
    }

    if config.token_ttl_hours <= 0 {
        return Err(KindergartenError::Config(
            "Token lifetime must be greater than 0".to_string(),
        ));
    }

    Ok(())
}

/// Validate logging configuration
fn validate_logging_config(config: &super::LoggingConfig) -> Result<()> {
    if config.level.is_empty() {
        return Err(KindergartenError::Config("Log level is required".to_string()));
    }

    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.level.as_str()) {
        return Err(KindergartenError::Config(format!(
            "Invalid log level: {}. Valid levels: {:?}",
            config.level, valid_levels
        )));
    }

    if config.directory.is_empty() {
        return Err(KindergartenError::Config("Log directory is required".to_string()));
    }

    Ok(())
}

fn validate_reports_config(config: &super::ReportsConfig) -> Result<()> {
    if !matches!(config.csv_delimiter, ';' | ',') {
        return Err(KindergartenError::Config(format!(
            "Unsupported CSV delimiter: {:?}",
            config.csv_delimiter
        )));
    }

    if config.detailed_attendance_limit <= 0
        || config.recent_days <= 0
        || config.trend_days <= 0
        || config.page_size <= 0
    {
        return Err(KindergartenError::Config(
            "Report limits must be greater than 0".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_settings() -> Settings {
        let mut settings = Settings::default();
        settings.auth.jwt_secret = "a-long-enough-test-secret".to_string();
        settings
    }

    #[test]
    fn test_valid_settings_pass() {
        assert!(validate_settings(&valid_settings()).is_ok());
    }

    #[test]
    fn test_default_secret_is_rejected() {
        assert!(validate_settings(&Settings::default()).is_err());
    }

    #[test]
    fn test_connection_bounds() {
        let mut settings = valid_settings();
        settings.database.min_connections = 20;
        assert!(validate_settings(&settings).is_err());
    }

    #[test]
    fn test_log_level() {
        let mut settings = valid_settings();
        settings.logging.level = "verbose".to_string();
        assert!(validate_settings(&settings).is_err());
    }

    #[test]
    fn test_csv_delimiter() {
        let mut settings = valid_settings();
        settings.reports.csv_delimiter = '|';
        assert!(validate_settings(&settings).is_err());

        settings.reports.csv_delimiter = ',';
        assert!(validate_settings(&settings).is_ok());
    }
}
