//! Integration repository for database operations
//!
//! This module provides the IntegrationRepository struct which encapsulates
//! SeaORM operations for the single-row integrations table.

use anyhow::Result;
use chrono::Utc;
use migration::INTEGRATION_SLOT;
use sea_orm::sea_query::OnConflict;
use sea_orm::{DatabaseConnection, EntityTrait, Set};
use serde_json::Value;
use std::sync::Arc;

use crate::models::integration::{self, Entity as Integration};

/// Repository for the connected GitHub account
#[derive(Debug, Clone)]
pub struct IntegrationRepository {
    /// Database connection pool
    pub db: Arc<DatabaseConnection>,
}

impl IntegrationRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Reads the integration row, if one has been stored.
    pub async fn get(&self) -> Result<Option<integration::Model>> {
        let integration = Integration::find_by_id(INTEGRATION_SLOT)
            .one(&*self.db)
            .await?;
        Ok(integration)
    }

    /// Stores the token and profile as the connected integration.
    ///
    /// Writes through `INSERT ... ON CONFLICT (id) DO UPDATE`, so concurrent callers
    /// overwrite the same slot instead of racing to create a second row.
    pub async fn upsert(
        &self,
        access_token: &str,
        user_profile: Option<Value>,
    ) -> Result<integration::Model> {
        let now = Utc::now().fixed_offset();

        let am = integration::ActiveModel {
            id: Set(INTEGRATION_SLOT),
            access_token: Set(access_token.to_string()),
            connected: Set(true),
            connected_at: Set(Some(now)),
            user_profile: Set(user_profile),
            created_at: Set(now),
            updated_at: Set(now),
        };

        Integration::insert(am)
            .on_conflict(
                OnConflict::column(integration::Column::Id)
                    .update_columns([
                        integration::Column::AccessToken,
                        integration::Column::Connected,
                        integration::Column::ConnectedAt,
                        integration::Column::UserProfile,
                        integration::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec(&*self.db)
            .await?;

        self.get()
            .await?
            .ok_or_else(|| anyhow::anyhow!("integration not persisted"))
    }

    /// Removes the integration. Returns whether a row existed.
    pub async fn delete(&self) -> Result<bool> {
        let delete_result = Integration::delete_by_id(INTEGRATION_SLOT)
            .exec(&*self.db)
            .await?;

        Ok(delete_result.rows_affected > 0)
    }
}
