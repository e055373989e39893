//! Synced record entity model
//!
//! One row per fetched GitHub item, tagged with the collection it belongs to.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::Value as JsonValue;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "synced_records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Stored collection identifier, e.g. `github_commits`
    #[sea_orm(column_type = "Text")]
    pub collection: String,

    /// Zero-based index of the record within the batch that wrote it
    pub position: i64,

    /// The item exactly as GitHub returned it
    #[sea_orm(column_type = "JsonBinary")]
    pub payload: JsonValue,

    pub synced_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
