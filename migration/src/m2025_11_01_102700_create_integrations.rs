//! Migration to create the integrations table.
//!
//! The table holds at most one row: the primary key is pinned to a single slot
//! by a CHECK constraint, so a second connected account can never be stored.

use sea_orm_migration::prelude::*;

/// The only primary key value the integrations table accepts.
pub const INTEGRATION_SLOT: i32 = 1;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Integrations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Integrations::Id)
                            .integer()
                            .not_null()
                            .primary_key()
                            .check(Expr::col(Integrations::Id).eq(INTEGRATION_SLOT)),
                    )
                    .col(ColumnDef::new(Integrations::AccessToken).text().not_null())
                    .col(
                        ColumnDef::new(Integrations::Connected)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Integrations::ConnectedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(Integrations::UserProfile).json_binary().null())
                    .col(
                        ColumnDef::new(Integrations::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Integrations::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Integrations::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Integrations {
    Table,
    Id,
    AccessToken,
    Connected,
    ConnectedAt,
    UserProfile,
    CreatedAt,
    UpdatedAt,
}
