//! Gateway administration - create, list, update and delete gateway records.

use std::sync::Arc;

use async_trait::async_trait;
use ipnet::Ipv4Net;
use uuid::Uuid;

use super::allocator::TunnelAllocator;
use crate::config::MAX_GATEWAY_PREFIX_LEN;
use crate::domain::{
    gateway::endpoint_host, keys, CreateGateway, Gateway, GatewayChanges, NewGateway,
    UpdateGateway,
};
use crate::errors::{AppError, AppResult, OptionExt};
use crate::infra::{GatewayRepository, UserRepository};

#[async_trait]
pub trait GatewayService: Send + Sync {
    async fn create_gateway(&self, input: CreateGateway) -> AppResult<Gateway>;

    /// All gateways ordered by name
    async fn list_gateways(&self) -> AppResult<Vec<Gateway>>;

    async fn update_gateway(&self, id: Uuid, input: UpdateGateway) -> AppResult<Gateway>;

    /// Refused with `PrecheckFailed` while users are assigned
    async fn delete_gateway(&self, id: Uuid) -> AppResult<()>;
}

pub struct GatewayManager {
    gateways: Arc<dyn GatewayRepository>,
    users: Arc<dyn UserRepository>,
    allocator: Arc<dyn TunnelAllocator>,
}

impl GatewayManager {
    pub fn new(
        gateways: Arc<dyn GatewayRepository>,
        users: Arc<dyn UserRepository>,
        allocator: Arc<dyn TunnelAllocator>,
    ) -> Self {
        Self {
            gateways,
            users,
            allocator,
        }
    }

    async fn assigned_users(&self, id: Uuid) -> AppResult<u64> {
        self.users.count_by_gateway(id).await
    }
}

fn parse_name(name: &str) -> AppResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::validation("Name is required"));
    }
    Ok(name.to_string())
}

fn parse_endpoint(endpoint: &str) -> AppResult<String> {
    let endpoint = endpoint.trim().trim_end_matches('/');
    endpoint_host(endpoint)
        .map(|_| endpoint.to_string())
        .ok_or_else(|| AppError::validation("api_endpoint must be an http(s) URL with a host"))
}

/// Parse an IPv4 CIDR and normalize it to its network address.
fn parse_subnet(subnet: &str) -> AppResult<Ipv4Net> {
    let net: Ipv4Net = subnet
        .trim()
        .parse()
        .map_err(|_| AppError::validation("subnet must be an IPv4 CIDR such as 10.10.0.0/16"))?;
    if net.prefix_len() > MAX_GATEWAY_PREFIX_LEN {
        return Err(AppError::validation(format!(
            "subnet prefix must be /{} or shorter",
            MAX_GATEWAY_PREFIX_LEN
        )));
    }
    Ok(net.trunc())
}

fn parse_public_key(key: &str) -> AppResult<String> {
    let key = key.trim();
    if !keys::is_valid_key(key) {
        return Err(AppError::validation(
            "public_key must be a base64 WireGuard public key",
        ));
    }
    Ok(key.to_string())
}

fn parse_api_key(key: &str) -> AppResult<String> {
    if key.trim().is_empty() {
        return Err(AppError::validation("api_key is required"));
    }
    Ok(key.to_string())
}

#[async_trait]
impl GatewayService for GatewayManager {
    async fn create_gateway(&self, input: CreateGateway) -> AppResult<Gateway> {
        let gateway = NewGateway {
            name: parse_name(&input.name)?,
            api_endpoint: parse_endpoint(&input.api_endpoint)?,
            api_key: parse_api_key(&input.api_key)?,
            subnet: parse_subnet(&input.subnet)?,
            public_key: parse_public_key(&input.public_key)?,
        };

        let created = self.gateways.create(gateway).await?;
        tracing::info!(gateway = %created.name, subnet = %created.subnet, "Gateway created");
        Ok(created)
    }

    async fn list_gateways(&self) -> AppResult<Vec<Gateway>> {
        self.gateways.list().await
    }

    async fn update_gateway(&self, id: Uuid, input: UpdateGateway) -> AppResult<Gateway> {
        let mut changes = GatewayChanges {
            name: input.name.as_deref().map(parse_name).transpose()?,
            api_endpoint: input.api_endpoint.as_deref().map(parse_endpoint).transpose()?,
            api_key: input.api_key.as_deref().map(parse_api_key).transpose()?,
            subnet: input.subnet.as_deref().map(parse_subnet).transpose()?,
            public_key: input.public_key.as_deref().map(parse_public_key).transpose()?,
        };

        if changes.is_empty() {
            return Err(AppError::validation("No fields to update"));
        }

        let mut readdressed = false;
        if let Some(subnet) = changes.subnet {
            let current = self.gateways.find_by_id(id).await?.ok_or_not_found()?;
            if current.subnet == subnet {
                changes.subnet = None;
            } else {
                let assigned = self.assigned_users(id).await?;
                if assigned > 0 {
                    return Err(AppError::precheck(format!(
                        "Cannot change subnet: {} user(s) are assigned to this gateway",
                        assigned
                    )));
                }
                readdressed = true;
            }
        }

        // The store re-checks assignments in the write itself
        let updated = self.gateways.update(id, changes).await?;
        if readdressed {
            self.allocator.forget_gateway(id).await;
        }
        tracing::info!(gateway = %updated.name, "Gateway updated");
        Ok(updated)
    }

    async fn delete_gateway(&self, id: Uuid) -> AppResult<()> {
        let assigned = self.assigned_users(id).await?;
        if assigned > 0 {
            return Err(AppError::precheck(format!(
                "Cannot delete gateway: {} user(s) are assigned to it",
                assigned
            )));
        }

        self.gateways.delete(id).await?;
        self.allocator.forget_gateway(id).await;
        tracing::info!(gateway_id = %id, "Gateway deleted");
        Ok(())
    }
}
