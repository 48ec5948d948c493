//! Gateway domain entity and selection policy.

use chrono::{DateTime, Utc};
use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::config::UNREACHABLE_LOAD_SENTINEL;
use crate::errors::{AppError, AppResult};

/// Load state of a gateway as last reported by its agent.
///
/// Storage encodes `Unreachable` as `-1`; inside the application the two
/// states are never compared numerically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayHealth {
    Healthy { active_users: u32 },
    Unreachable,
}

impl GatewayHealth {
    /// Decode the stored load column. Any negative value is unreachable.
    pub fn from_stored(value: i32) -> Self {
        u32::try_from(value)
            .map(|active_users| GatewayHealth::Healthy { active_users })
            .unwrap_or(GatewayHealth::Unreachable)
    }

    /// Encode for the stored load column.
    pub fn to_stored(self) -> i32 {
        match self {
            GatewayHealth::Healthy { active_users } => {
                i32::try_from(active_users).unwrap_or(i32::MAX)
            }
            GatewayHealth::Unreachable => UNREACHABLE_LOAD_SENTINEL,
        }
    }

    pub fn active_users(&self) -> Option<u32> {
        match self {
            GatewayHealth::Healthy { active_users } => Some(*active_users),
            GatewayHealth::Unreachable => None,
        }
    }

    pub fn is_reachable(&self) -> bool {
        matches!(self, GatewayHealth::Healthy { .. })
    }
}

/// Gateway domain entity
#[derive(Clone)]
pub struct Gateway {
    pub id: Uuid,
    pub name: String,
    /// Base URL of the gateway's agent API
    pub api_endpoint: String,
    pub api_key: String,
    pub subnet: Ipv4Net,
    /// The gateway's own WireGuard public key
    pub public_key: String,
    pub health: GatewayHealth,
    pub total_peers: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Keep the agent secret out of logs
impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("api_endpoint", &self.api_endpoint)
            .field("api_key", &"[REDACTED]")
            .field("subnet", &self.subnet)
            .field("public_key", &self.public_key)
            .field("health", &self.health)
            .field("total_peers", &self.total_peers)
            .finish()
    }
}

impl Gateway {
    /// Host part of the agent endpoint, used as the public tunnel endpoint.
    pub fn public_host(&self) -> AppResult<String> {
        endpoint_host(&self.api_endpoint).ok_or_else(|| {
            AppError::internal(format!(
                "Gateway {} has an invalid api endpoint: {}",
                self.name, self.api_endpoint
            ))
        })
    }

    /// Absolute URL of an agent route such as `stats` or `add-peer`.
    pub fn agent_url(&self, path: &str) -> String {
        format!("{}/{}", self.api_endpoint.trim_end_matches('/'), path)
    }
}

/// Extract the host of an http(s) URL, `None` if it has none.
pub fn endpoint_host(endpoint: &str) -> Option<String> {
    let url = reqwest::Url::parse(endpoint).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.host_str().map(str::to_string)
}

/// Pick the reachable gateway with the fewest active users.
///
/// Unreachable gateways are removed before ordering. Ties are broken by name.
pub fn least_loaded<'a, I>(gateways: I) -> Option<&'a Gateway>
where
    I: IntoIterator<Item = &'a Gateway>,
{
    gateways
        .into_iter()
        .filter_map(|g| g.health.active_users().map(|load| (load, g)))
        .min_by(|(a, ga), (b, gb)| a.cmp(b).then_with(|| ga.name.cmp(&gb.name)))
        .map(|(_, g)| g)
}

/// Gateway creation data transfer object
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateGateway {
    /// Unique display name
    #[validate(length(min = 1, max = 64, message = "Name is required"))]
    #[schema(example = "fra-1")]
    pub name: String,
    /// Base URL of the gateway agent
    #[validate(url(message = "api_endpoint must be a valid URL"))]
    #[schema(example = "https://fra-1.vpn.example.com:8000")]
    pub api_endpoint: String,
    /// Shared secret sent to the agent
    #[validate(length(min = 1, message = "api_key is required"))]
    #[schema(example = "change-me")]
    pub api_key: String,
    /// Client address pool (IPv4 CIDR)
    #[validate(length(min = 1, message = "subnet is required"))]
    #[schema(example = "10.10.0.0/16")]
    pub subnet: String,
    /// Gateway WireGuard public key
    #[validate(length(min = 1, message = "public_key is required"))]
    #[schema(example = "xTIBA5rboUvnH4htodjb6e697QjLERt1NAB4mZqp8Dg=")]
    pub public_key: String,
}

/// Gateway update data transfer object (all fields optional)
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateGateway {
    #[validate(length(min = 1, max = 64, message = "Name must not be empty"))]
    pub name: Option<String>,
    #[validate(url(message = "api_endpoint must be a valid URL"))]
    pub api_endpoint: Option<String>,
    #[validate(length(min = 1, message = "api_key must not be empty"))]
    pub api_key: Option<String>,
    pub subnet: Option<String>,
    pub public_key: Option<String>,
}

/// Validated data for a new gateway
#[derive(Debug, Clone)]
pub struct NewGateway {
    pub name: String,
    pub api_endpoint: String,
    pub api_key: String,
    pub subnet: Ipv4Net,
    pub public_key: String,
}

/// Validated partial update of a gateway
#[derive(Debug, Clone, Default)]
pub struct GatewayChanges {
    pub name: Option<String>,
    pub api_endpoint: Option<String>,
    pub api_key: Option<String>,
    pub subnet: Option<Ipv4Net>,
    pub public_key: Option<String>,
}

impl GatewayChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.api_endpoint.is_none()
            && self.api_key.is_none()
            && self.subnet.is_none()
            && self.public_key.is_none()
    }
}

/// Gateway response (never carries the agent secret)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GatewayResponse {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: Uuid,
    #[schema(example = "fra-1")]
    pub name: String,
    #[schema(example = "https://fra-1.vpn.example.com:8000")]
    pub api_endpoint: String,
    #[schema(example = "10.10.0.0/16")]
    pub subnet: String,
    #[schema(example = "xTIBA5rboUvnH4htodjb6e697QjLERt1NAB4mZqp8Dg=")]
    pub public_key: String,
    /// Active users reported by the agent, -1 when unreachable
    #[schema(example = 12)]
    pub active_user_count: i32,
    #[schema(example = 40)]
    pub total_peers: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Gateway> for GatewayResponse {
    fn from(gateway: Gateway) -> Self {
        Self {
            id: gateway.id,
            name: gateway.name,
            api_endpoint: gateway.api_endpoint,
            subnet: gateway.subnet.to_string(),
            public_key: gateway.public_key,
            active_user_count: gateway.health.to_stored(),
            total_peers: gateway.total_peers,
            created_at: gateway.created_at,
            updated_at: gateway.updated_at,
        }
    }
}
