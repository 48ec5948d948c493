//! Migration: Create gateways table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Gateways::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Gateways::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(Gateways::Name)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Gateways::ApiEndpoint).string().not_null())
                    .col(ColumnDef::new(Gateways::ApiKey).string().not_null())
                    .col(ColumnDef::new(Gateways::Subnet).string().not_null())
                    .col(ColumnDef::new(Gateways::PublicKey).string().not_null())
                    .col(
                        ColumnDef::new(Gateways::ActiveUserCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Gateways::TotalPeers)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Gateways::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Gateways::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    // Load is a count or the -1 unreachable marker
                    .check(Expr::col(Gateways::ActiveUserCount).gte(-1))
                    .to_owned(),
            )
            .await?;

        // Selection orders by load
        manager
            .create_index(
                Index::create()
                    .name("idx_gateways_active_user_count")
                    .table(Gateways::Table)
                    .col(Gateways::ActiveUserCount)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Gateways::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Gateways {
    Table,
    Id,
    Name,
    ApiEndpoint,
    ApiKey,
    Subnet,
    PublicKey,
    ActiveUserCount,
    TotalPeers,
    CreatedAt,
    UpdatedAt,
}
