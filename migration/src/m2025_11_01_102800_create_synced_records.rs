//! Migration to create the synced_records table.
//!
//! Every named collection lives in this one table, partitioned by the
//! `collection` column. `position` preserves the order a batch was written in.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SyncedRecords::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SyncedRecords::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SyncedRecords::Collection).text().not_null())
                    .col(
                        ColumnDef::new(SyncedRecords::Position)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SyncedRecords::Payload).json_binary().not_null())
                    .col(
                        ColumnDef::new(SyncedRecords::SyncedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Replace and list operations always scope by collection and read in order
        manager
            .create_index(
                Index::create()
                    .name("idx_synced_records_collection_position")
                    .table(SyncedRecords::Table)
                    .col(SyncedRecords::Collection)
                    .col(SyncedRecords::Position)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_synced_records_collection_position")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(SyncedRecords::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum SyncedRecords {
    Table,
    Id,
    Collection,
    Position,
    Payload,
    SyncedAt,
}
