//! Kindergarten administration service
//!
//! Tracks students, teachers, groups, parents, attendance and events, and
//! serves scoped CRUD endpoints, dashboards and reports over HTTP. What an
//! account may see or change is decided by its role: superuser, director,
//! teacher or parent.

pub mod access;
pub mod config;
pub mod database;
pub mod http;
pub mod models;
pub mod reports;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use config::Settings;
pub use utils::errors::{KindergartenError, Result};

// Re-export main components for easy access
pub use access::{AccessScope, Principal, Role};
pub use database::DatabaseService;
pub use http::{create_router, AppState};
pub use services::ServiceFactory;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn info() -> String {
    format!("{} v{}", NAME, VERSION)
}
