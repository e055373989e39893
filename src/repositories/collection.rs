//! Collection repository for synced records
//!
//! Every collection is replaced wholesale on each resync. Records keep the order
//! they were fetched in through the `position` column.

use anyhow::Result;
use chrono::Utc;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::collections::Collection;
use crate::models::synced_record::{self, Entity as SyncedRecord};

/// Rows per insert statement unless configured otherwise.
pub const DEFAULT_BATCH_SIZE: usize = 500;

/// Repository for named collections of synced records
#[derive(Debug, Clone)]
pub struct CollectionRepository {
    /// Database connection pool
    pub db: Arc<DatabaseConnection>,
}

impl CollectionRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Replaces the whole contents of `collection` with `records`.
    ///
    /// An empty batch is a no-op: existing rows are kept and 0 is returned. Otherwise
    /// every row of the collection is deleted and the records are inserted in chunks of
    /// at most `batch_size`. The delete and inserts do not share a transaction, so a
    /// failing chunk leaves the earlier chunks in place.
    ///
    /// # Returns
    ///
    /// Returns the number of rows written
    pub async fn replace_collection(
        &self,
        collection: Collection,
        records: &[Value],
        batch_size: usize,
    ) -> Result<u64> {
        if records.is_empty() {
            debug!(collection = %collection, "empty batch, keeping existing records");
            return Ok(0);
        }

        let deleted = SyncedRecord::delete_many()
            .filter(synced_record::Column::Collection.eq(collection.name()))
            .exec(&*self.db)
            .await?;
        debug!(
            collection = %collection,
            deleted = deleted.rows_affected,
            "cleared collection"
        );

        let synced_at = Utc::now().fixed_offset();
        let mut written = 0u64;

        for (chunk_index, chunk) in records.chunks(batch_size.max(1)).enumerate() {
            let offset = chunk_index * batch_size.max(1);
            let models = chunk
                .iter()
                .enumerate()
                .map(|(index, payload)| synced_record::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    collection: Set(collection.name().to_string()),
                    position: Set((offset + index) as i64),
                    payload: Set(payload.clone()),
                    synced_at: Set(synced_at),
                });

            SyncedRecord::insert_many(models).exec(&*self.db).await?;
            written += chunk.len() as u64;
        }

        Ok(written)
    }

    /// Lists the payloads of a collection in stored order.
    pub async fn list(&self, collection: Collection) -> Result<Vec<Value>> {
        let records = SyncedRecord::find()
            .filter(synced_record::Column::Collection.eq(collection.name()))
            .order_by_asc(synced_record::Column::Position)
            .all(&*self.db)
            .await?;

        Ok(records.into_iter().map(|record| record.payload).collect())
    }

    /// Counts the records stored in a collection.
    pub async fn count(&self, collection: Collection) -> Result<u64> {
        let count = SyncedRecord::find()
            .filter(synced_record::Column::Collection.eq(collection.name()))
            .count(&*self.db)
            .await?;

        Ok(count)
    }

    /// Counts every collection, in write order.
    pub async fn counts(&self) -> Result<Vec<(Collection, u64)>> {
        let mut counts = Vec::with_capacity(Collection::ALL.len());
        for collection in Collection::ALL {
            counts.push((collection, self.count(collection).await?));
        }
        Ok(counts)
    }
}
