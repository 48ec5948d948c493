//! Migration: Create users table with tunnel assignment columns.

use sea_orm_migration::prelude::*;

use super::m20250101_000001_create_gateways_table::Gateways;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Users::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Users::Email).string().not_null().unique_key())
                    .col(ColumnDef::new(Users::PasswordHash).string().not_null())
                    .col(
                        ColumnDef::new(Users::Role)
                            .string_len(16)
                            .not_null()
                            .default("user"),
                    )
                    .col(
                        ColumnDef::new(Users::Plan)
                            .string_len(16)
                            .not_null()
                            .default("free"),
                    )
                    .col(ColumnDef::new(Users::AssignedGatewayId).uuid().null())
                    .col(ColumnDef::new(Users::TunnelAddress).string_len(15).null())
                    .col(ColumnDef::new(Users::TunnelPublicKey).string().null())
                    .col(ColumnDef::new(Users::TunnelPrivateKey).string().null())
                    .col(
                        ColumnDef::new(Users::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Users::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    // Deleting a gateway with assigned users must fail
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_users_assigned_gateway_id")
                            .from(Users::Table, Users::AssignedGatewayId)
                            .to(Gateways::Table, Gateways::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One address per gateway
        manager
            .create_index(
                Index::create()
                    .name("idx_users_gateway_tunnel_address")
                    .table(Users::Table)
                    .col(Users::AssignedGatewayId)
                    .col(Users::TunnelAddress)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Users {
    Table,
    Id,
    Email,
    PasswordHash,
    Role,
    Plan,
    AssignedGatewayId,
    TunnelAddress,
    TunnelPublicKey,
    TunnelPrivateKey,
    CreatedAt,
    UpdatedAt,
}
