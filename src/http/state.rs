//! Application state for the HTTP server.

use std::sync::Arc;

use crate::config::Settings;
use crate::services::ServiceFactory;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub services: Arc<ServiceFactory>,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(services: ServiceFactory, settings: Settings) -> Self {
        Self {
            services: Arc::new(services),
            settings: Arc::new(settings),
        }
    }
}
