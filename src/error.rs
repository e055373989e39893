//! # Error Handling
//!
//! Every HTTP error is rendered as `application/problem+json` carrying a stable
//! code, a message and the trace id of the request.

use axum::{
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use utoipa::ToSchema;

use crate::github::GitHubError;
use crate::sync::ResyncError;
use crate::telemetry;

/// Unified API error response structure
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ApiError {
    /// HTTP status code for the response
    #[serde(skip)]
    pub status: StatusCode,
    /// Error code for programmatic handling
    pub code: Box<str>,
    /// Human-readable error message
    pub message: Box<str>,
    /// Additional error details (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Box<serde_json::Value>>,
    /// Suggested retry delay in seconds (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
    /// Correlation trace ID for debugging (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<Box<str>>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &str, message: &str) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
            details: None,
            retry_after: None,
            trace_id: Self::current_trace_id(),
        }
    }

    pub fn with_details<V: Into<serde_json::Value>>(mut self, details: V) -> Self {
        self.details = Some(Box::new(details.into()));
        self
    }

    pub fn with_retry_after(mut self, seconds: u64) -> Self {
        self.retry_after = Some(seconds);
        self
    }

    /// Trace id of the enclosing request scope, or a short generated correlation id.
    fn current_trace_id() -> Option<Box<str>> {
        telemetry::current_trace_id()
            .map(String::into_boxed_str)
            .or_else(|| {
                Some(format!("corr-{}", &uuid::Uuid::new_v4().to_string()[..8]).into_boxed_str())
            })
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut headers = HeaderMap::new();
        headers.insert(
            "content-type",
            HeaderValue::from_static("application/problem+json"),
        );

        if let Some(retry_after) = self.retry_after
            && let Ok(header_value) = HeaderValue::from_str(&retry_after.to_string())
        {
            headers.insert("retry-after", header_value);
        }

        (self.status, headers, axum::Json(self)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(error: anyhow::Error) -> Self {
        tracing::error!("Internal error: {:?}", error);

        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_SERVER_ERROR",
            "An internal error occurred",
        )
    }
}

impl From<sea_orm::DbErr> for ApiError {
    fn from(error: sea_orm::DbErr) -> Self {
        match error {
            sea_orm::DbErr::Conn(connection_err) => {
                tracing::error!("Database connection error: {:?}", connection_err);
                Self::new(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE",
                    "Database service unavailable",
                )
            }
            other => {
                tracing::error!("Database error: {:?}", other);
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_SERVER_ERROR",
                    "Database error occurred",
                )
            }
        }
    }
}

impl From<ResyncError> for ApiError {
    fn from(error: ResyncError) -> Self {
        match error {
            ResyncError::NoActiveIntegration => Self::new(
                StatusCode::NOT_FOUND,
                "NO_ACTIVE_INTEGRATION",
                "No active GitHub integration; connect an account first",
            ),
            ResyncError::Fetch { resource, source } => {
                tracing::warn!(%resource, error = %source, "resync aborted by upstream error");
                provider_error(&resource, &source)
            }
            ResyncError::TimedOut { seconds } => Self::new(
                StatusCode::GATEWAY_TIMEOUT,
                "RESYNC_TIMEOUT",
                &format!("Resync did not finish within {} seconds", seconds),
            ),
            ResyncError::Persistence { collection, source } => {
                tracing::error!(%collection, error = %source, "resync failed to persist");
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_SERVER_ERROR",
                    &format!("Failed to store {}", collection),
                )
            }
            other => {
                tracing::error!(error = %other, "resync failed");
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_SERVER_ERROR",
                    "An internal error occurred",
                )
            }
        }
    }
}

/// Upstream GitHub failures surface as 502 PROVIDER_ERROR with the upstream status in details.
pub fn provider_error(resource: &str, source: &GitHubError) -> ApiError {
    let upstream_status = match source {
        GitHubError::Api { status, .. } => Some(*status),
        GitHubError::Unauthorized => Some(401),
        GitHubError::RateLimited { .. } => Some(429),
        _ => None,
    };

    let error = ApiError::new(
        StatusCode::BAD_GATEWAY,
        "PROVIDER_ERROR",
        &format!("GitHub request for {} failed", resource),
    )
    .with_details(json!({
        "provider": "github",
        "resource": resource,
        "status": upstream_status,
    }));

    match source {
        GitHubError::RateLimited {
            retry_after: Some(seconds),
        } => error.with_retry_after(*seconds),
        _ => error,
    }
}

/// 404 for an unknown path parameter
pub fn not_found(message: &str) -> ApiError {
    ApiError::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collections::Collection;

    #[test]
    fn test_no_active_integration_maps_to_404() {
        let error: ApiError = ResyncError::NoActiveIntegration.into();
        assert_eq!(error.status, StatusCode::NOT_FOUND);
        assert_eq!(error.code, Box::from("NO_ACTIVE_INTEGRATION"));
        assert!(error.trace_id.is_some());
    }

    #[test]
    fn test_rate_limited_fetch_carries_retry_after() {
        let error: ApiError = ResyncError::Fetch {
            resource: "organizations".to_string(),
            source: GitHubError::RateLimited {
                retry_after: Some(60),
            },
        }
        .into();

        assert_eq!(error.status, StatusCode::BAD_GATEWAY);
        assert_eq!(error.code, Box::from("PROVIDER_ERROR"));
        assert_eq!(error.retry_after, Some(60));

        let response = error.into_response();
        assert_eq!(response.headers().get("retry-after").unwrap(), "60");
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "application/problem+json"
        );
    }

    #[test]
    fn test_provider_error_details() {
        let error = provider_error(
            "repositories of acme",
            &GitHubError::Api {
                status: 503,
                message: "unavailable".to_string(),
            },
        );

        let details = error.details.unwrap();
        assert_eq!(details["provider"], "github");
        assert_eq!(details["status"], 503);
    }

    #[test]
    fn test_timeout_and_persistence_mapping() {
        let timeout: ApiError = ResyncError::TimedOut { seconds: 5 }.into();
        assert_eq!(timeout.status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(timeout.code, Box::from("RESYNC_TIMEOUT"));

        let persistence: ApiError = ResyncError::Persistence {
            collection: Collection::Users,
            source: "disk full".into(),
        }
        .into();
        assert_eq!(persistence.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(persistence.message.contains("github_users"));
    }

    #[test]
    fn test_trace_id_fallback_format() {
        let error = not_found("missing");
        let trace_id = error.trace_id.unwrap();
        assert!(trace_id.starts_with("corr-"));
        assert_eq!(trace_id.len(), 13);
    }

    #[test]
    fn test_from_anyhow() {
        let api_error: ApiError = anyhow::anyhow!("Something went wrong").into();
        assert_eq!(api_error.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api_error.message, Box::from("An internal error occurred"));
    }
}
