//! Gateway registry backed by SeaORM.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, QueryTrait, Set, SqlErr,
};
use uuid::Uuid;

use super::entities::gateway::{self, ActiveModel, Entity as GatewayEntity};
use super::entities::user::{self, Entity as UserEntity};
use crate::config::UNREACHABLE_LOAD_SENTINEL;
use crate::domain::{Gateway, GatewayChanges, GatewayHealth, NewGateway};
use crate::errors::{AppError, AppResult};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Gateway registry contract.
///
/// Load columns are only written through `update_load` and `mark_unreachable`.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait GatewayRepository: Send + Sync {
    /// Reachable gateway with the fewest active users, `NotFound` if none
    async fn least_loaded(&self) -> AppResult<Gateway>;

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Gateway>>;

    /// All gateways ordered by name
    async fn list(&self) -> AppResult<Vec<Gateway>>;

    /// Insert a gateway; duplicate names are `Conflict`
    async fn create(&self, gateway: NewGateway) -> AppResult<Gateway>;

    /// Apply the set fields of `changes`.
    ///
    /// A subnet change is only written while no user is assigned to the
    /// gateway; otherwise nothing changes and `PrecheckFailed` is returned.
    async fn update(&self, id: Uuid, changes: GatewayChanges) -> AppResult<Gateway>;

    /// Record a successful stats poll
    async fn update_load(&self, id: Uuid, active_users: u32, total_peers: u32) -> AppResult<()>;

    /// Exclude from selection; `total_peers` is left untouched
    async fn mark_unreachable(&self, id: Uuid) -> AppResult<()>;

    async fn delete(&self, id: Uuid) -> AppResult<()>;
}

/// Concrete implementation of GatewayRepository
pub struct GatewayStore {
    db: DatabaseConnection,
}

impl GatewayStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn set_load(&self, id: Uuid, load: i32, total_peers: Option<i32>) -> AppResult<()> {
        let mut update = GatewayEntity::update_many()
            .col_expr(gateway::Column::ActiveUserCount, Expr::value(load))
            .col_expr(gateway::Column::UpdatedAt, Expr::value(Utc::now()));
        if let Some(total) = total_peers {
            update = update.col_expr(gateway::Column::TotalPeers, Expr::value(total));
        }

        let result = update
            .filter(gateway::Column::Id.eq(id))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }
}

/// Map a unique-name violation to `Conflict`.
fn map_write_err(err: DbErr) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => AppError::conflict("Gateway name"),
        _ => AppError::from(err),
    }
}

fn saturating_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

#[async_trait]
impl GatewayRepository for GatewayStore {
    async fn least_loaded(&self) -> AppResult<Gateway> {
        let model = GatewayEntity::find()
            .filter(gateway::Column::ActiveUserCount.gte(0))
            .order_by_asc(gateway::Column::ActiveUserCount)
            .order_by_asc(gateway::Column::Name)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;

        Gateway::try_from(model)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Gateway>> {
        GatewayEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(Gateway::try_from)
            .transpose()
    }

    async fn list(&self) -> AppResult<Vec<Gateway>> {
        GatewayEntity::find()
            .order_by_asc(gateway::Column::Name)
            .all(&self.db)
            .await?
            .into_iter()
            .map(Gateway::try_from)
            .collect()
    }

    async fn create(&self, gateway: NewGateway) -> AppResult<Gateway> {
        let now = Utc::now();
        let active_model = ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(gateway.name),
            api_endpoint: Set(gateway.api_endpoint),
            api_key: Set(gateway.api_key),
            subnet: Set(gateway.subnet.to_string()),
            public_key: Set(gateway.public_key),
            active_user_count: Set(GatewayHealth::Healthy { active_users: 0 }.to_stored()),
            total_peers: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let model = active_model.insert(&self.db).await.map_err(map_write_err)?;
        Gateway::try_from(model)
    }

    async fn update(&self, id: Uuid, changes: GatewayChanges) -> AppResult<Gateway> {
        let mut update = GatewayEntity::update_many()
            .col_expr(gateway::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(gateway::Column::Id.eq(id));
        if let Some(name) = changes.name {
            update = update.col_expr(gateway::Column::Name, Expr::value(name));
        }
        if let Some(endpoint) = changes.api_endpoint {
            update = update.col_expr(gateway::Column::ApiEndpoint, Expr::value(endpoint));
        }
        if let Some(key) = changes.api_key {
            update = update.col_expr(gateway::Column::ApiKey, Expr::value(key));
        }
        if let Some(public_key) = changes.public_key {
            update = update.col_expr(gateway::Column::PublicKey, Expr::value(public_key));
        }
        let readdressing = changes.subnet.is_some();
        if let Some(subnet) = changes.subnet {
            // Same statement as the write, so an assignment cannot slip in between
            let assigned = UserEntity::find()
                .select_only()
                .column(user::Column::AssignedGatewayId)
                .filter(user::Column::AssignedGatewayId.eq(id))
                .into_query();
            update = update
                .col_expr(gateway::Column::Subnet, Expr::value(subnet.to_string()))
                .filter(gateway::Column::Id.not_in_subquery(assigned));
        }

        let result = update.exec(&self.db).await.map_err(map_write_err)?;

        let model = GatewayEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;
        if result.rows_affected == 0 && readdressing {
            return Err(AppError::precheck(
                "Cannot change subnet: users are assigned to this gateway",
            ));
        }
        Gateway::try_from(model)
    }

    async fn update_load(&self, id: Uuid, active_users: u32, total_peers: u32) -> AppResult<()> {
        self.set_load(id, saturating_i32(active_users), Some(saturating_i32(total_peers)))
            .await
    }

    async fn mark_unreachable(&self, id: Uuid) -> AppResult<()> {
        self.set_load(id, UNREACHABLE_LOAD_SENTINEL, None).await
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let result = GatewayEntity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(|e| match e.sql_err() {
                // Users still reference the gateway
                Some(SqlErr::ForeignKeyConstraintViolation(_)) => {
                    AppError::precheck("Cannot delete gateway: users are still assigned to it")
                }
                _ => AppError::from(e),
            })?;

        if result.rows_affected == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }
}
