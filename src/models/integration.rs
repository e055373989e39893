//! Integration entity model
//!
//! This module contains the SeaORM entity model for the integrations table,
//! which holds the single connected GitHub account the resync runs as.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::Value as JsonValue;

/// The connected GitHub account. At most one row exists.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "integrations")]
pub struct Model {
    /// Fixed slot identifier, always `migration::INTEGRATION_SLOT`
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i32,

    /// Bearer token used for every GitHub request
    #[sea_orm(column_type = "Text")]
    pub access_token: String,

    /// Whether the integration is usable for a resync
    pub connected: bool,

    /// When the token was last stored
    pub connected_at: Option<DateTimeWithTimeZone>,

    /// Profile of the authenticated user as returned by `GET /user`
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub user_profile: Option<JsonValue>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    /// A resync may only run with a connected integration that carries a token.
    pub fn is_active(&self) -> bool {
        self.connected && !self.access_token.trim().is_empty()
    }

    /// Login of the authenticated user, if the stored profile has one.
    pub fn login(&self) -> Option<&str> {
        self.user_profile
            .as_ref()
            .and_then(|profile| profile.get("login"))
            .and_then(JsonValue::as_str)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
