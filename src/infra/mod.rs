//! Infrastructure layer - External systems integration
//!
//! - PostgreSQL connection, migrations and repositories
//! - HTTP client for gateway agents
//! - Storage of tunnel private keys

pub mod agent_client;
pub mod db;
pub mod repositories;
pub mod secrets;

pub use agent_client::{AgentClient, AgentError, AgentStats, HttpAgentClient, PeerRequest};
pub use db::{Database, Migrator};
pub use repositories::{GatewayRepository, GatewayStore, UserRepository, UserStore};
pub use secrets::{PlaintextVault, SecretVault};

#[cfg(any(test, feature = "test-utils"))]
pub use agent_client::MockAgentClient;
#[cfg(any(test, feature = "test-utils"))]
pub use repositories::{MockGatewayRepository, MockUserRepository};
