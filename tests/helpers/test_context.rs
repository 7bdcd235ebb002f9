//! Test context for unified test setup

use axum::Router;

use kindergarten::config::Settings;
use kindergarten::database::DatabaseService;
use kindergarten::http::{create_router, AppState};
use kindergarten::services::ServiceFactory;

use super::database_helper::TestDatabase;

pub const TEST_JWT_SECRET: &str = "integration-test-secret-0123456789";

/// Database, services and settings wired together the way `main` does it
pub struct TestContext {
    pub database: TestDatabase,
    pub db: DatabaseService,
    pub services: ServiceFactory,
    pub settings: Settings,
}

impl TestContext {
    pub async fn new() -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let database = TestDatabase::new().await?;
        let mut settings = test_settings();
        settings.database.url = database.database_url.clone();

        let db = DatabaseService::new(database.pool.clone());
        let services = ServiceFactory::new(db.clone(), &settings);

        Ok(Self {
            database,
            db,
            services,
            settings,
        })
    }

    pub fn router(&self) -> Router {
        create_router(AppState::new(self.services.clone(), self.settings.clone()))
    }
}

pub fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.auth.jwt_secret = TEST_JWT_SECRET.to_string();
    settings.logging.level = "warn".to_string();
    settings
}
