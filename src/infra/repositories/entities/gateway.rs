//! Gateway database entity for SeaORM.

use sea_orm::entity::prelude::*;

use crate::domain::{Gateway, GatewayHealth};
use crate::errors::AppError;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "gateways")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub name: String,
    pub api_endpoint: String,
    pub api_key: String,
    /// IPv4 CIDR, e.g. `10.10.0.0/16`
    pub subnet: String,
    pub public_key: String,
    /// Agent-reported active users, -1 when the last poll failed
    pub active_user_count: i32,
    pub total_peers: i32,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Gateway {
    type Error = AppError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let subnet = model.subnet.parse().map_err(|_| {
            AppError::internal(format!(
                "Gateway {} has an invalid stored subnet: {}",
                model.id, model.subnet
            ))
        })?;

        Ok(Gateway {
            id: model.id,
            name: model.name,
            api_endpoint: model.api_endpoint,
            api_key: model.api_key,
            subnet,
            public_key: model.public_key,
            health: GatewayHealth::from_stored(model.active_user_count),
            total_peers: u32::try_from(model.total_peers).unwrap_or(0),
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
