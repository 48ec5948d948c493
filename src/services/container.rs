//! Service Container - Centralized service access.
//!
//! Builds every service from one database connection and one config, so the
//! HTTP layer and the stats poller share the same repositories, agent client
//! and address ledger.

use std::sync::Arc;

use sea_orm::DatabaseConnection;

use super::{
    AuthService, Authenticator, GatewayManager, GatewayService, LedgerAllocator, Provisioner,
    ProvisioningService, TunnelAllocator,
};
use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::infra::{AgentClient, GatewayRepository, GatewayStore, HttpAgentClient, UserRepository, UserStore};
use crate::jobs::StatsPoller;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Service container trait for dependency injection.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
pub trait ServiceContainer: Send + Sync {
    fn auth(&self) -> Arc<dyn AuthService>;

    fn gateways(&self) -> Arc<dyn GatewayService>;

    fn provisioning(&self) -> Arc<dyn ProvisioningService>;
}

/// Concrete implementation of ServiceContainer
pub struct Services {
    auth_service: Arc<dyn AuthService>,
    gateway_service: Arc<dyn GatewayService>,
    provisioning_service: Arc<dyn ProvisioningService>,
    gateway_repository: Arc<dyn GatewayRepository>,
    agent_client: Arc<dyn AgentClient>,
    config: Config,
}

impl Services {
    /// Create service container from database connection and config
    pub fn from_connection(db: DatabaseConnection, config: &Config) -> AppResult<Self> {
        let gateways: Arc<dyn GatewayRepository> = Arc::new(GatewayStore::new(db.clone()));
        let users: Arc<dyn UserRepository> = Arc::new(UserStore::new(db));
        let agent: Arc<dyn AgentClient> = Arc::new(
            HttpAgentClient::new(config.agent_timeout())
                .map_err(|e| AppError::internal(format!("Failed to build agent client: {}", e)))?,
        );
        let allocator: Arc<dyn TunnelAllocator> = Arc::new(LedgerAllocator::new(
            users.clone(),
            config.address_allocation_attempts,
        ));

        let auth_service = Arc::new(Authenticator::new(users.clone(), config.clone()));
        let gateway_service = Arc::new(GatewayManager::new(
            gateways.clone(),
            users.clone(),
            allocator.clone(),
        ));
        let provisioning_service = Arc::new(Provisioner::new(
            gateways.clone(),
            users,
            agent.clone(),
            allocator,
            config.tunnel_port,
        ));

        Ok(Self {
            auth_service,
            gateway_service,
            provisioning_service,
            gateway_repository: gateways,
            agent_client: agent,
            config: config.clone(),
        })
    }

    /// A stats poller sharing this container's registry and agent client
    pub fn stats_poller(&self) -> StatsPoller {
        StatsPoller::new(
            self.gateway_repository.clone(),
            self.agent_client.clone(),
            self.config.stats_poll_interval(),
            self.config.stats_poll_concurrency,
        )
    }
}

impl ServiceContainer for Services {
    fn auth(&self) -> Arc<dyn AuthService> {
        self.auth_service.clone()
    }

    fn gateways(&self) -> Arc<dyn GatewayService> {
        self.gateway_service.clone()
    }

    fn provisioning(&self) -> Arc<dyn ProvisioningService> {
        self.provisioning_service.clone()
    }
}
