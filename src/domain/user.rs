//! User domain entity and related types.

use std::net::Ipv4Addr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::{PLAN_FREE, PLAN_PREMIUM, ROLE_ADMIN, ROLE_USER};

/// User roles enumeration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    User,
    Admin,
}

impl UserRole {
    /// Check if this role has admin privileges
    pub fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin)
    }
}

impl From<&str> for UserRole {
    fn from(s: &str) -> Self {
        match s {
            ROLE_ADMIN => UserRole::Admin,
            _ => UserRole::User,
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserRole::Admin => write!(f, "{}", ROLE_ADMIN),
            UserRole::User => write!(f, "{}", ROLE_USER),
        }
    }
}

/// Subscription plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    Free,
    Premium,
}

impl From<&str> for PlanTier {
    fn from(s: &str) -> Self {
        match s {
            PLAN_PREMIUM => PlanTier::Premium,
            _ => PlanTier::Free,
        }
    }
}

impl std::fmt::Display for PlanTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlanTier::Free => write!(f, "{}", PLAN_FREE),
            PlanTier::Premium => write!(f, "{}", PLAN_PREMIUM),
        }
    }
}

/// A user's tunnel identity on one gateway.
///
/// The four fields only exist together, so a user is either fully
/// provisioned or not provisioned at all.
#[derive(Clone, PartialEq, Eq)]
pub struct TunnelAssignment {
    pub gateway_id: Uuid,
    pub address: Ipv4Addr,
    pub public_key: String,
    pub private_key: String,
}

impl std::fmt::Debug for TunnelAssignment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TunnelAssignment")
            .field("gateway_id", &self.gateway_id)
            .field("address", &self.address)
            .field("public_key", &self.public_key)
            .field("private_key", &"[REDACTED]")
            .finish()
    }
}

/// User domain entity
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
    pub plan: PlanTier,
    pub tunnel: Option<TunnelAssignment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new, unprovisioned user with default role and plan
    pub fn new(id: Uuid, email: String, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            email,
            password_hash,
            role: UserRole::User,
            plan: PlanTier::Free,
            tunnel: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check if user has admin role
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    pub fn is_provisioned(&self) -> bool {
        self.tunnel.is_some()
    }

    /// Peer label sent to the gateway agent (local part of the email).
    pub fn peer_name(&self) -> &str {
        self.email.split('@').next().unwrap_or(&self.email)
    }
}

/// User response (safe to return to client)
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserResponse {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: Uuid,
    #[schema(example = "user@example.com")]
    pub email: String,
    #[schema(example = "user")]
    pub role: String,
    #[schema(example = "free")]
    pub plan: String,
    /// Whether a tunnel has been assigned yet
    pub provisioned: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            provisioned: user.is_provisioned(),
            email: user.email,
            role: user.role.to_string(),
            plan: user.plan.to_string(),
            created_at: user.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peer_name_is_email_local_part() {
        let user = User::new(Uuid::new_v4(), "alice@example.com".into(), "h".into());
        assert_eq!(user.peer_name(), "alice");
        assert!(!user.is_provisioned());
    }

    #[test]
    fn test_assignment_debug_hides_private_key() {
        let assignment = TunnelAssignment {
            gateway_id: Uuid::new_v4(),
            address: Ipv4Addr::new(10, 10, 7, 14),
            public_key: "pub".into(),
            private_key: "very-secret".into(),
        };
        assert!(!format!("{:?}", assignment).contains("very-secret"));
    }

    #[test]
    fn test_unknown_role_and_plan_fall_back() {
        assert_eq!(UserRole::from("root"), UserRole::User);
        assert_eq!(PlanTier::from("gold"), PlanTier::Free);
        assert_eq!(PlanTier::from("premium").to_string(), "premium");
    }
}
