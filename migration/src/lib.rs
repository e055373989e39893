//! Database migrations for the activity sync service.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2025_11_01_102700_create_integrations;
mod m2025_11_01_102800_create_synced_records;

pub use m2025_11_01_102700_create_integrations::INTEGRATION_SLOT;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2025_11_01_102700_create_integrations::Migration),
            Box::new(m2025_11_01_102800_create_synced_records::Migration),
        ]
    }
}
