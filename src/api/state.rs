//! Application state - Dependency injection container.
//!
//! Provides centralized access to all application services and infrastructure.

use std::sync::Arc;

use crate::config::Config;
use crate::errors::AppResult;
use crate::infra::Database;
use crate::services::{
    AuthService, GatewayService, ProvisioningService, ServiceContainer, Services,
};

/// Application state containing all services (DI container).
#[derive(Clone)]
pub struct AppState {
    /// Authentication service
    pub auth_service: Arc<dyn AuthService>,
    /// Gateway administration
    pub gateway_service: Arc<dyn GatewayService>,
    /// Tunnel provisioning
    pub provisioning_service: Arc<dyn ProvisioningService>,
    /// Database handle used by the health check; absent in router tests
    pub database: Option<Arc<Database>>,
}

impl AppState {
    /// Build state from a connected database.
    ///
    /// Returns the container as well so the caller can start the stats
    /// poller on the same registry and agent client.
    pub fn from_config(database: Arc<Database>, config: &Config) -> AppResult<(Self, Arc<Services>)> {
        let container = Arc::new(Services::from_connection(
            database.get_connection(),
            config,
        )?);

        let state = Self {
            auth_service: container.auth(),
            gateway_service: container.gateways(),
            provisioning_service: container.provisioning(),
            database: Some(database),
        };
        Ok((state, container))
    }

    /// Create application state with manually injected services.
    pub fn new(
        auth_service: Arc<dyn AuthService>,
        gateway_service: Arc<dyn GatewayService>,
        provisioning_service: Arc<dyn ProvisioningService>,
    ) -> Self {
        Self {
            auth_service,
            gateway_service,
            provisioning_service,
            database: None,
        }
    }

    pub fn with_database(mut self, database: Arc<Database>) -> Self {
        self.database = Some(database);
        self
    }
}
