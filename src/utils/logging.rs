//! Logging configuration and setup
//!
//! This module provides logging initialization and structured logging utilities
//! for the kindergarten service.

use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use crate::config::LoggingConfig;
use crate::utils::errors::{KindergartenError, Result};

/// Initialize logging based on configuration.
///
/// The returned guard flushes the file writer on drop and must be held
/// for as long as the process logs.
pub fn init_logging(config: &LoggingConfig) -> Result<WorkerGuard> {
    let file_appender = tracing_appender::rolling::daily(&config.directory, "kindergarten.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = tracing_subscriber::EnvFilter::try_new(&config.level)
        .map_err(|e| KindergartenError::Config(format!("Invalid log filter: {}", e)))?;

    let stdout_layer = if config.json {
        tracing_subscriber::fmt::layer().json().with_writer(std::io::stdout).boxed()
    } else {
        tracing_subscriber::fmt::layer().with_writer(std::io::stdout).boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(non_blocking),
        )
        .try_init()
        .map_err(|e| KindergartenError::Config(format!("Logging already initialized: {}", e)))?;

    info!("Logging initialized with level: {}", config.level);
    Ok(guard)
}

/// Log account management actions
pub fn log_account_action(actor_id: i64, action: &str, target: Option<&str>) {
    warn!(
        actor_id = actor_id,
        action = action,
        target = target,
        "Account action performed"
    );
}

/// Log rejected access attempts
pub fn log_permission_denied(account_id: i64, role: &str, action: &str) {
    warn!(
        account_id = account_id,
        role = role,
        action = action,
        "Permission denied"
    );
}

/// Log attendance marking
pub fn log_attendance_marked(account_id: i64, group_id: Option<i64>, date: chrono::NaiveDate, records: usize) {
    info!(
        account_id = account_id,
        group_id = group_id,
        date = %date,
        records = records,
        "Attendance marked"
    );
}

/// Log report generation
pub fn log_report_generated(account_id: i64, report: &str, format: &str, rows: usize) {
    debug!(
        account_id = account_id,
        report = report,
        format = format,
        rows = rows,
        "Report generated"
    );
}
