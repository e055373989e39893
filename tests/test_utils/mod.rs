//! Test utilities for database testing.
//!
//! This module provides utilities for setting up in-memory SQLite databases
//! with migrations for testing purposes.

use activity_sync::config::{AppConfig, SyncConfig};
use activity_sync::repositories::IntegrationRepository;
use anyhow::Result;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::sync::Arc;

/// Sets up an in-memory SQLite database with all migrations applied.
///
/// The pool is pinned to one connection: each SQLite memory connection is its own
/// database, so a second pooled connection would not see the migrated schema.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1).sqlx_logging(false);

    let db = Database::connect(opt).await?;
    Migrator::up(&db, None).await?;

    Ok(db)
}

/// Same as [`setup_test_db`], wrapped for the repositories and the resync service.
#[allow(dead_code)]
pub async fn setup_test_db_arc() -> Result<Arc<DatabaseConnection>> {
    Ok(Arc::new(setup_test_db().await?))
}

/// Configuration pointed at a mock GitHub server, without page pacing.
#[allow(dead_code)]
pub fn test_config(api_base: &str) -> AppConfig {
    AppConfig {
        profile: "test".to_string(),
        github_api_base: api_base.to_string(),
        github_request_timeout_seconds: 5,
        sync: SyncConfig {
            page_delay_ms: 0,
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Stores a connected integration with the given token.
#[allow(dead_code)]
pub async fn seed_integration(db: &Arc<DatabaseConnection>, token: &str) -> Result<()> {
    IntegrationRepository::new(db.clone())
        .upsert(token, Some(serde_json::json!({"login": "octocat", "id": 1})))
        .await?;
    Ok(())
}
