//! User database entity for SeaORM.

use std::net::Ipv4Addr;

use sea_orm::entity::prelude::*;

use crate::domain::{PlanTier, TunnelAssignment, User, UserRole};
use crate::errors::{AppError, AppResult};
use crate::infra::secrets::SecretVault;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub plan: String,
    pub assigned_gateway_id: Option<Uuid>,
    pub tunnel_address: Option<String>,
    pub tunnel_public_key: Option<String>,
    /// Sealed by the configured `SecretVault`
    pub tunnel_private_key: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::gateway::Entity",
        from = "Column::AssignedGatewayId",
        to = "super::gateway::Column::Id"
    )]
    Gateway,
}

impl Related<super::gateway::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Gateway.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Convert to the domain entity, opening the sealed private key.
    ///
    /// A row with only some assignment columns set is reported as an error.
    pub fn into_domain(self, vault: &dyn SecretVault) -> AppResult<User> {
        let tunnel = match (
            self.assigned_gateway_id,
            self.tunnel_address,
            self.tunnel_public_key,
            self.tunnel_private_key,
        ) {
            (None, None, None, None) => None,
            (Some(gateway_id), Some(address), Some(public_key), Some(sealed)) => {
                let address: Ipv4Addr = address.parse().map_err(|_| {
                    AppError::internal(format!(
                        "User {} has an invalid tunnel address: {}",
                        self.id, address
                    ))
                })?;
                Some(TunnelAssignment {
                    gateway_id,
                    address,
                    public_key,
                    private_key: vault.open(&sealed)?,
                })
            }
            _ => {
                return Err(AppError::internal(format!(
                    "User {} has a partial tunnel assignment",
                    self.id
                )))
            }
        };

        Ok(User {
            id: self.id,
            email: self.email,
            password_hash: self.password_hash,
            role: UserRole::from(self.role.as_str()),
            plan: PlanTier::from(self.plan.as_str()),
            tunnel,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
