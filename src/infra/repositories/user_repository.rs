//! User store, including the one-shot tunnel assignment write.

use std::net::Ipv4Addr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QuerySelect, Set, SqlErr,
};
use uuid::Uuid;

use super::entities::user::{self, ActiveModel, Entity as UserEntity};
use crate::config::{PLAN_FREE, ROLE_USER};
use crate::domain::{TunnelAssignment, User, UserRole};
use crate::errors::{AppError, AppResult, OptionExt};
use crate::infra::secrets::{PlaintextVault, SecretVault};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// User repository trait for dependency injection.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>>;

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;

    /// Create an unprovisioned user; duplicate emails are `Conflict`
    async fn create(&self, email: String, password_hash: String) -> AppResult<User>;

    /// Change a user's role; `NotFound` for an unknown email
    async fn set_role(&self, email: &str, role: UserRole) -> AppResult<User>;

    /// Persist a tunnel assignment only if the user has none yet.
    ///
    /// Returns `false` when another writer got there first.
    async fn assign_tunnel(&self, id: Uuid, assignment: &TunnelAssignment) -> AppResult<bool>;

    /// Number of users assigned to a gateway
    async fn count_by_gateway(&self, gateway_id: Uuid) -> AppResult<u64>;

    /// Tunnel addresses already handed out on a gateway
    async fn tunnel_addresses(&self, gateway_id: Uuid) -> AppResult<Vec<Ipv4Addr>>;
}

/// Concrete implementation of UserRepository
pub struct UserStore {
    db: DatabaseConnection,
    vault: Arc<dyn SecretVault>,
}

impl UserStore {
    /// Store private keys as-is
    pub fn new(db: DatabaseConnection) -> Self {
        Self::with_vault(db, Arc::new(PlaintextVault))
    }

    pub fn with_vault(db: DatabaseConnection, vault: Arc<dyn SecretVault>) -> Self {
        Self { db, vault }
    }

    fn to_domain(&self, model: user::Model) -> AppResult<User> {
        model.into_domain(self.vault.as_ref())
    }
}

#[async_trait]
impl UserRepository for UserStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        UserEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(|m| self.to_domain(m))
            .transpose()
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        UserEntity::find()
            .filter(user::Column::Email.eq(email.to_lowercase()))
            .one(&self.db)
            .await?
            .map(|m| self.to_domain(m))
            .transpose()
    }

    async fn create(&self, email: String, password_hash: String) -> AppResult<User> {
        let now = Utc::now();
        let active_model = ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(email.to_lowercase()),
            password_hash: Set(password_hash),
            role: Set(ROLE_USER.to_string()),
            plan: Set(PLAN_FREE.to_string()),
            assigned_gateway_id: Set(None),
            tunnel_address: Set(None),
            tunnel_public_key: Set(None),
            tunnel_private_key: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let model = active_model
            .insert(&self.db)
            .await
            .map_err(|e: DbErr| match e.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => AppError::conflict("User"),
                _ => AppError::from(e),
            })?;
        self.to_domain(model)
    }

    async fn set_role(&self, email: &str, role: UserRole) -> AppResult<User> {
        let model = UserEntity::find()
            .filter(user::Column::Email.eq(email.to_lowercase()))
            .one(&self.db)
            .await?
            .ok_or_not_found()?;

        let mut active: ActiveModel = model.into();
        active.role = Set(role.to_string());
        active.updated_at = Set(Utc::now());
        let updated = active.update(&self.db).await?;
        self.to_domain(updated)
    }

    async fn assign_tunnel(&self, id: Uuid, assignment: &TunnelAssignment) -> AppResult<bool> {
        let sealed = self.vault.seal(&assignment.private_key)?;

        // Single conditional UPDATE: all four columns or nothing
        let result = UserEntity::update_many()
            .col_expr(
                user::Column::AssignedGatewayId,
                Expr::value(assignment.gateway_id),
            )
            .col_expr(
                user::Column::TunnelAddress,
                Expr::value(assignment.address.to_string()),
            )
            .col_expr(
                user::Column::TunnelPublicKey,
                Expr::value(assignment.public_key.clone()),
            )
            .col_expr(user::Column::TunnelPrivateKey, Expr::value(sealed))
            .col_expr(user::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(user::Column::Id.eq(id))
            .filter(user::Column::AssignedGatewayId.is_null())
            .exec(&self.db)
            .await
            .map_err(|e| match e.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => {
                    AppError::conflict("Tunnel address")
                }
                _ => AppError::from(e),
            })?;

        Ok(result.rows_affected == 1)
    }

    async fn count_by_gateway(&self, gateway_id: Uuid) -> AppResult<u64> {
        let count = UserEntity::find()
            .filter(user::Column::AssignedGatewayId.eq(gateway_id))
            .count(&self.db)
            .await?;
        Ok(count)
    }

    async fn tunnel_addresses(&self, gateway_id: Uuid) -> AppResult<Vec<Ipv4Addr>> {
        let rows: Vec<Option<String>> = UserEntity::find()
            .select_only()
            .column(user::Column::TunnelAddress)
            .filter(user::Column::AssignedGatewayId.eq(gateway_id))
            .into_tuple()
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .flatten()
            .filter_map(|addr| match addr.parse() {
                Ok(ip) => Some(ip),
                Err(_) => {
                    tracing::warn!(%gateway_id, address = %addr, "Skipping unparsable tunnel address");
                    None
                }
            })
            .collect())
    }
}
