//! Provisioning - hands each user exactly one tunnel on one gateway.
//!
//! A user is either unprovisioned or provisioned; the transition happens
//! once. First-time provisioning runs in its own task under a per-user lock,
//! so a caller that goes away mid-request cannot cancel an agent call that
//! is already in flight. The persisted write is conditional on the user
//! still being unassigned, which also covers other control-plane processes.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use super::allocator::TunnelAllocator;
use super::user_locks::UserLocks;
use crate::domain::{tunnel_config, Gateway, TunnelAssignment, User};
use crate::errors::{AppError, AppResult};
use crate::infra::{AgentClient, GatewayRepository, PeerRequest, UserRepository};

#[async_trait]
pub trait ProvisioningService: Send + Sync {
    /// Config text for `user`, provisioning them first if needed.
    async fn get_or_create_config(&self, user: &User) -> AppResult<String>;

    /// Same as `get_or_create_config` for a user id taken from a token.
    async fn config_for(&self, user_id: Uuid) -> AppResult<String>;
}

pub struct Provisioner {
    inner: Arc<ProvisionerInner>,
}

struct ProvisionerInner {
    gateways: Arc<dyn GatewayRepository>,
    users: Arc<dyn UserRepository>,
    agent: Arc<dyn AgentClient>,
    allocator: Arc<dyn TunnelAllocator>,
    locks: UserLocks,
    tunnel_port: u16,
}

impl Provisioner {
    pub fn new(
        gateways: Arc<dyn GatewayRepository>,
        users: Arc<dyn UserRepository>,
        agent: Arc<dyn AgentClient>,
        allocator: Arc<dyn TunnelAllocator>,
        tunnel_port: u16,
    ) -> Self {
        Self {
            inner: Arc::new(ProvisionerInner {
                gateways,
                users,
                agent,
                allocator,
                locks: UserLocks::new(),
                tunnel_port,
            }),
        }
    }
}

#[async_trait]
impl ProvisioningService for Provisioner {
    async fn get_or_create_config(&self, user: &User) -> AppResult<String> {
        if let Some(assignment) = &user.tunnel {
            return self.inner.render_existing(assignment).await;
        }

        let inner = self.inner.clone();
        let user_id = user.id;
        tokio::spawn(async move { inner.provision(user_id).await })
            .await
            .map_err(|e| AppError::internal(format!("Provisioning task failed: {}", e)))?
    }

    async fn config_for(&self, user_id: Uuid) -> AppResult<String> {
        let user = self
            .inner
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AppError::Unauthorized)?;
        self.get_or_create_config(&user).await
    }
}

impl ProvisionerInner {
    /// Render a persisted assignment without contacting any agent.
    async fn render_existing(&self, assignment: &TunnelAssignment) -> AppResult<String> {
        let gateway = self
            .gateways
            .find_by_id(assignment.gateway_id)
            .await?
            .ok_or(AppError::GatewayMissing)?;
        tunnel_config::render(assignment, &gateway, self.tunnel_port)
    }

    async fn provision(&self, user_id: Uuid) -> AppResult<String> {
        let _guard = self.locks.acquire(user_id).await;

        // Re-read under the lock; a previous holder may have finished
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AppError::Unauthorized)?;
        if let Some(assignment) = &user.tunnel {
            return self.render_existing(assignment).await;
        }

        let gateway = self.select_gateway().await?;
        let address = self.allocator.allocate_address(&gateway).await?;
        let (private_key, public_key) = self.allocator.generate_key_pair().into_parts();

        let peer = PeerRequest {
            public_key: public_key.clone(),
            address,
            peer_name: user.peer_name().to_string(),
        };
        if let Err(err) = self.agent.add_peer(&gateway, &peer).await {
            self.allocator.release_address(gateway.id, address).await;
            tracing::warn!(
                user_id = %user.id,
                gateway = %gateway.name,
                error = %err,
                "Peer registration failed, user left unprovisioned"
            );
            return Err(err.into());
        }

        let assignment = TunnelAssignment {
            gateway_id: gateway.id,
            address,
            public_key,
            private_key,
        };

        match self.users.assign_tunnel(user.id, &assignment).await {
            Ok(true) => {
                tracing::info!(
                    user_id = %user.id,
                    gateway = %gateway.name,
                    %address,
                    "User provisioned"
                );
                tunnel_config::render(&assignment, &gateway, self.tunnel_port)
            }
            Ok(false) => {
                // Another process assigned this user first; its assignment wins
                self.allocator.release_address(gateway.id, address).await;
                tracing::warn!(
                    user_id = %user.id,
                    gateway = %gateway.name,
                    %address,
                    "Lost assignment race, peer on agent is orphaned"
                );
                let winner = self
                    .users
                    .find_by_id(user.id)
                    .await?
                    .and_then(|u| u.tunnel)
                    .ok_or_else(|| AppError::internal("Assignment vanished after conflict"))?;
                self.render_existing(&winner).await
            }
            Err(err) => {
                self.allocator.release_address(gateway.id, address).await;
                tracing::error!(
                    user_id = %user.id,
                    gateway = %gateway.name,
                    %address,
                    error = %err,
                    "Failed to persist assignment, peer on agent is orphaned"
                );
                Err(err)
            }
        }
    }

    async fn select_gateway(&self) -> AppResult<Gateway> {
        match self.gateways.least_loaded().await {
            Ok(gateway) if gateway.health.is_reachable() => Ok(gateway),
            Ok(_) | Err(AppError::NotFound) => Err(AppError::NoGatewayAvailable),
            Err(err) => Err(err),
        }
    }
}
