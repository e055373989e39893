//! # Server Configuration
//!
//! Router, shared state and OpenAPI document for the activity sync HTTP API.

use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    routing::{delete, get, post},
};
use sea_orm::DatabaseConnection;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::AppConfig;
use crate::handlers;

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: Arc<AppConfig>,
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/github/resync", post(handlers::github::trigger_resync))
        .route("/github/status", get(handlers::github::integration_status))
        .route(
            "/github/integration",
            delete(handlers::github::delete_integration),
        )
        .route(
            "/github/collections/{collection}",
            get(handlers::github::collection_count),
        )
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
}

/// Binds the configured address and serves until the process is stopped
pub async fn run_server(config: Arc<AppConfig>, db: Arc<DatabaseConnection>) -> anyhow::Result<()> {
    let addr = config
        .bind_addr()
        .with_context(|| format!("invalid server address '{}'", config.api_bind_addr))?;

    let state = AppState {
        db,
        config: config.clone(),
    };
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    tracing::info!(%addr, profile = %config.profile, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::health,
        crate::handlers::github::trigger_resync,
        crate::handlers::github::integration_status,
        crate::handlers::github::delete_integration,
        crate::handlers::github::collection_count,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::handlers::HealthResponse,
            crate::handlers::github::CollectionCount,
            crate::handlers::github::IntegrationStatus,
            crate::sync::ResyncSummary,
            crate::error::ApiError,
        )
    ),
    tags(
        (name = "root", description = "Service metadata"),
        (name = "github", description = "GitHub activity resync")
    ),
    info(
        title = "Activity Sync API",
        description = "Resyncs an organization's GitHub activity into local collections",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
