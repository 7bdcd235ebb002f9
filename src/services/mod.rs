//! Services module
//!
//! Business logic on top of the repositories: permission checks, scoping,
//! validation and the shaping of responses.

pub mod accounts;
pub mod attendance;
pub mod auth;
pub mod dashboard;
pub mod events;
pub mod groups;
pub mod parents;
pub mod reports;
pub mod search;
pub mod students;
pub mod teachers;

pub use accounts::AccountService;
pub use attendance::AttendanceService;
pub use auth::AuthService;
pub use dashboard::DashboardService;
pub use events::EventService;
pub use groups::GroupService;
pub use parents::ParentService;
pub use reports::{ReportParams, ReportService};
pub use search::SearchService;
pub use students::StudentService;
pub use teachers::TeacherService;

use serde::Serialize;

use crate::config::settings::Settings;
use crate::database::DatabaseService;

/// Service factory for creating and managing all services
#[derive(Clone)]
pub struct ServiceFactory {
    pub db: DatabaseService,
    pub auth: AuthService,
    pub accounts: AccountService,
    pub students: StudentService,
    pub teachers: TeacherService,
    pub groups: GroupService,
    pub parents: ParentService,
    pub attendance: AttendanceService,
    pub events: EventService,
    pub search: SearchService,
    pub reports: ReportService,
    pub dashboard: DashboardService,
}

impl ServiceFactory {
    /// Create a new ServiceFactory with all services initialized
    pub fn new(db: DatabaseService, settings: &Settings) -> Self {
        let page_size = settings.reports.page_size;

        Self {
            auth: AuthService::new(db.clone(), &settings.auth),
            accounts: AccountService::new(db.clone()),
            students: StudentService::new(db.clone(), page_size),
            teachers: TeacherService::new(db.clone(), page_size),
            groups: GroupService::new(db.clone()),
            parents: ParentService::new(db.clone(), page_size),
            attendance: AttendanceService::new(db.clone(), page_size),
            events: EventService::new(db.clone(), page_size),
            search: SearchService::new(db.clone()),
            reports: ReportService::new(db.clone(), settings.reports.clone()),
            dashboard: DashboardService::new(db.clone(), &settings.reports),
            db,
        }
    }

    /// Health check for all services
    pub async fn health_check(&self) -> ServiceHealthStatus {
        let database_healthy = match self.db.health_check().await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(error = %e, "Database health check failed");
                false
            }
        };

        ServiceHealthStatus {
            database_healthy,
            version: crate::VERSION,
        }
    }
}

/// Health status for all services
#[derive(Debug, Clone, Serialize)]
pub struct ServiceHealthStatus {
    pub database_healthy: bool,
    pub version: &'static str,
}

impl ServiceHealthStatus {
    /// Check if all critical services are healthy
    pub fn is_healthy(&self) -> bool {
        self.database_healthy
    }

    /// Get list of unhealthy services
    pub fn get_issues(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if !self.database_healthy {
            issues.push("Database connection failed".to_string());
        }
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_issues() {
        let status = ServiceHealthStatus { database_healthy: false, version: "0.1.0" };
        assert!(!status.is_healthy());
        assert_eq!(status.get_issues(), vec!["Database connection failed".to_string()]);

        let status = ServiceHealthStatus { database_healthy: true, version: "0.1.0" };
        assert!(status.is_healthy());
        assert!(status.get_issues().is_empty());
    }
}
