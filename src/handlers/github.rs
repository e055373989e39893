//! # GitHub Integration Handlers
//!
//! Resync trigger plus status and removal of the connected account.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::collections::Collection;
use crate::error::{ApiError, not_found};
use crate::repositories::{CollectionRepository, IntegrationRepository};
use crate::server::AppState;
use crate::sync::{ResyncService, ResyncSummary};
use crate::telemetry::{TraceContext, with_trace_context};

/// Number of records stored in one collection
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CollectionCount {
    /// Stored identifier, e.g. `github_commits`
    pub collection: String,
    pub count: u64,
}

/// Connection state and stored record counts
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IntegrationStatus {
    pub connected: bool,
    /// Login of the connected GitHub user
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login: Option<String>,
    /// RFC 3339 timestamp of when the token was stored
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connected_at: Option<String>,
    pub collections: Vec<CollectionCount>,
}

/// Run a full resync and report what was written
#[utoipa::path(
    post,
    path = "/github/resync",
    responses(
        (status = 200, description = "Resync finished", body = ResyncSummary),
        (status = 404, description = "No active integration", body = ApiError),
        (status = 502, description = "GitHub rejected an organization or repository listing", body = ApiError),
        (status = 504, description = "Run exceeded its deadline", body = ApiError)
    ),
    tag = "github"
)]
pub async fn trigger_resync(State(state): State<AppState>) -> Result<Json<ResyncSummary>, ApiError> {
    let service = ResyncService::new(state.db.clone(), state.config.clone());

    // Errors built inside the scope echo the run id as their trace id
    with_trace_context(TraceContext::generate(), async move {
        let summary = service.resync().await?;
        Ok::<_, ApiError>(Json(summary))
    })
    .await
}

/// Show whether an account is connected and how many records each collection holds
#[utoipa::path(
    get,
    path = "/github/status",
    responses(
        (status = 200, description = "Integration status", body = IntegrationStatus),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "github"
)]
pub async fn integration_status(
    State(state): State<AppState>,
) -> Result<Json<IntegrationStatus>, ApiError> {
    let integration = IntegrationRepository::new(state.db.clone()).get().await?;
    let counts = CollectionRepository::new(state.db.clone()).counts().await?;

    let collections = counts
        .into_iter()
        .map(|(collection, count)| CollectionCount {
            collection: collection.name().to_string(),
            count,
        })
        .collect();

    let status = match integration {
        Some(integration) => IntegrationStatus {
            connected: integration.is_active(),
            login: integration.login().map(str::to_string),
            connected_at: integration.connected_at.map(|at| at.to_rfc3339()),
            collections,
        },
        None => IntegrationStatus {
            connected: false,
            login: None,
            connected_at: None,
            collections,
        },
    };

    Ok(Json(status))
}

/// Forget the connected account. Synced collections are left as they are.
#[utoipa::path(
    delete,
    path = "/github/integration",
    responses(
        (status = 204, description = "Integration removed"),
        (status = 404, description = "No integration stored", body = ApiError)
    ),
    tag = "github"
)]
pub async fn delete_integration(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    let removed = IntegrationRepository::new(state.db.clone()).delete().await?;

    if removed {
        tracing::info!("GitHub integration removed");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::new(
            StatusCode::NOT_FOUND,
            "NO_ACTIVE_INTEGRATION",
            "No GitHub integration is stored",
        ))
    }
}

/// Count the records stored in one collection
#[utoipa::path(
    get,
    path = "/github/collections/{collection}",
    params(
        ("collection" = String, Path, description = "Collection name, with or without the `github_` prefix")
    ),
    responses(
        (status = 200, description = "Stored record count", body = CollectionCount),
        (status = 404, description = "Unknown collection", body = ApiError)
    ),
    tag = "github"
)]
pub async fn collection_count(
    State(state): State<AppState>,
    Path(collection): Path<String>,
) -> Result<Json<CollectionCount>, ApiError> {
    let collection: Collection = collection
        .parse()
        .map_err(|err: crate::collections::UnknownCollection| not_found(&err.to_string()))?;

    let count = CollectionRepository::new(state.db.clone())
        .count(collection)
        .await?;

    Ok(Json(CollectionCount {
        collection: collection.name().to_string(),
        count,
    }))
}
