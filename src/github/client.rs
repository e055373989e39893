//! Thin REST client for the GitHub v3 API.
//!
//! Requests are authenticated with the stored bearer token. Responses are kept as
//! opaque JSON; only the status code and rate-limit headers are interpreted here.

use std::time::Duration;

use chrono::Utc;
use reqwest::{Response, StatusCode};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, warn};
use url::Url;

use crate::config::AppConfig;

const ACCEPT_HEADER: &str = "application/vnd.github.v3+json";
const USER_AGENT: &str = concat!("activity-sync/", env!("CARGO_PKG_VERSION"));

/// Remaining-request count below which every response logs a warning.
const RATE_LIMIT_LOW_WATERMARK: u64 = 100;

/// Upstream bodies are cut to this many characters in error messages.
const BODY_SNIPPET_CHARS: usize = 200;

/// GitHub API errors
#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("Rate limited by GitHub API (retry after {retry_after:?} seconds)")]
    RateLimited { retry_after: Option<u64> },

    #[error("GitHub rejected the access token")]
    Unauthorized,

    #[error("API request failed with status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Expected a JSON array from {path}")]
    UnexpectedBody { path: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),
}

/// Authenticated GitHub REST client
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    api_base: String,
    access_token: String,
}

impl GitHubClient {
    /// Create a client against `api_base` with a per-request timeout
    pub fn new(
        api_base: impl Into<String>,
        access_token: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self, GitHubError> {
        let api_base = api_base.into().trim_end_matches('/').to_string();
        // Fail early on a base that could never produce a request URL
        Url::parse(&api_base)?;

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(request_timeout)
            .build()?;

        Ok(Self {
            http,
            api_base,
            access_token: access_token.into(),
        })
    }

    pub fn from_config(config: &AppConfig, access_token: &str) -> Result<Self, GitHubError> {
        Self::new(
            config.github_api_base.clone(),
            access_token,
            config.github_request_timeout(),
        )
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Fetch the profile of the user the token belongs to (`GET /user`)
    pub async fn get_authenticated_user(&self) -> Result<Value, GitHubError> {
        let url = self.url_for("/user")?;
        let response = self.send(url).await?;
        Ok(response.json().await?)
    }

    /// Fetch one page of a list resource.
    ///
    /// `path` may already carry query parameters (`/repos/o/r/pulls?state=all`);
    /// `per_page` and `page` are appended to them.
    pub async fn get_page(
        &self,
        path: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<Value>, GitHubError> {
        let mut url = self.url_for(path)?;
        url.query_pairs_mut()
            .append_pair("per_page", &per_page.to_string())
            .append_pair("page", &page.to_string());

        debug!(path, page, per_page, "requesting GitHub page");

        let response = self.send(url).await?;
        match response.json::<Value>().await? {
            Value::Array(items) => Ok(items),
            _ => Err(GitHubError::UnexpectedBody {
                path: path.to_string(),
            }),
        }
    }

    fn url_for(&self, path: &str) -> Result<Url, GitHubError> {
        let separator = if path.starts_with('/') { "" } else { "/" };
        Ok(Url::parse(&format!("{}{}{}", self.api_base, separator, path))?)
    }

    async fn send(&self, url: Url) -> Result<Response, GitHubError> {
        let response = self
            .http
            .get(url)
            .header("Authorization", format!("Bearer {}", self.access_token))
            .header("Accept", ACCEPT_HEADER)
            .send()
            .await?;

        let rate_limit = RateLimitInfo::from_response(&response);
        if let Some(remaining) = rate_limit.remaining
            && remaining < RATE_LIMIT_LOW_WATERMARK
        {
            warn!(remaining, "GitHub API rate limit running low");
        }

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::TOO_MANY_REQUESTS
            || (status == StatusCode::FORBIDDEN && rate_limit.remaining == Some(0))
        {
            let retry_after = rate_limit.retry_after_seconds();
            warn!(?retry_after, "Rate limited by GitHub API");
            return Err(GitHubError::RateLimited { retry_after });
        }

        if status == StatusCode::UNAUTHORIZED {
            error!("GitHub API authentication failed: 401 Unauthorized");
            return Err(GitHubError::Unauthorized);
        }

        let body = response.text().await.unwrap_or_default();
        Err(GitHubError::Api {
            status: status.as_u16(),
            message: truncate_body(&body),
        })
    }
}

/// Rate limit headers of a single response
#[derive(Debug, Clone, Default)]
struct RateLimitInfo {
    remaining: Option<u64>,
    reset: Option<i64>,
    retry_after: Option<u64>,
}

impl RateLimitInfo {
    fn from_response(response: &Response) -> Self {
        let header = |name: &str| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };

        Self {
            remaining: header("X-RateLimit-Remaining").and_then(|v| v.parse().ok()),
            reset: header("X-RateLimit-Reset").and_then(|v| v.parse().ok()),
            retry_after: header("Retry-After").and_then(|v| v.parse().ok()),
        }
    }

    /// Prefer an explicit `Retry-After`, else wait until the window resets.
    fn retry_after_seconds(&self) -> Option<u64> {
        self.retry_after.or_else(|| {
            self.reset
                .map(|reset| (reset - Utc::now().timestamp()).max(0) as u64)
        })
    }
}

fn truncate_body(body: &str) -> String {
    if body.chars().count() > BODY_SNIPPET_CHARS {
        let truncated: String = body.chars().take(BODY_SNIPPET_CHARS).collect();
        format!("{}...", truncated)
    } else {
        body.to_string()
    }
}
