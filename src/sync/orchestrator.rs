//! Full resync of the connected account's GitHub activity.
//!
//! A run walks organizations, then their repositories, then each repository's
//! commits, pull requests and issues, then each issue's timeline. Everything is
//! aggregated in memory and written collection by collection at the end.

use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::collections::Collection;
use crate::config::AppConfig;
use crate::github::{FetchOptions, GitHubClient, GitHubError};
use crate::repositories::{CollectionRepository, IntegrationRepository};
use crate::sync::users::{dedupe_users, extract_users};
use crate::telemetry;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that end a resync run
#[derive(Debug, Error)]
pub enum ResyncError {
    #[error("no active GitHub integration")]
    NoActiveIntegration,

    #[error("failed to load GitHub integration: {0}")]
    Credential(#[source] BoxError),

    #[error("failed to build GitHub client: {0}")]
    Client(#[source] GitHubError),

    #[error("failed to fetch {resource}: {source}")]
    Fetch {
        resource: String,
        #[source]
        source: GitHubError,
    },

    #[error("failed to persist {collection}: {source}")]
    Persistence {
        collection: Collection,
        #[source]
        source: BoxError,
    },

    #[error("resync did not finish within {seconds} seconds")]
    TimedOut { seconds: u64 },
}

/// Outcome of a successful run: rows written per collection plus skipped work
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ResyncSummary {
    /// Identifier attached to every log line of the run
    pub run_id: String,
    pub organizations: u64,
    pub repositories: u64,
    pub commits: u64,
    pub pulls: u64,
    pub issues: u64,
    pub issue_changelogs: u64,
    pub users: u64,
    /// Repositories skipped after an unrecoverable error
    pub failed_repositories: u64,
    /// Commit, pull or issue listings that failed and were left out
    pub failed_resources: u64,
    /// Issues whose timeline could not be fetched
    pub failed_timelines: u64,
    pub duration_ms: u64,
}

impl ResyncSummary {
    fn record_written(&mut self, collection: Collection, written: u64) {
        let slot = match collection {
            Collection::Organizations => &mut self.organizations,
            Collection::Repositories => &mut self.repositories,
            Collection::Commits => &mut self.commits,
            Collection::Pulls => &mut self.pulls,
            Collection::Issues => &mut self.issues,
            Collection::IssueChangelogs => &mut self.issue_changelogs,
            Collection::Users => &mut self.users,
        };
        *slot = written;
    }

    /// Rows written across all collections
    pub fn total_written(&self) -> u64 {
        self.organizations
            + self.repositories
            + self.commits
            + self.pulls
            + self.issues
            + self.issue_changelogs
            + self.users
    }
}

/// Reasons a single repository is skipped
#[derive(Debug, Error)]
enum RepositoryError {
    #[error("repository item has no full_name")]
    MissingFullName,
    #[error("issue without a number in {repo}")]
    MissingIssueNumber { repo: String },
}

/// Items gathered for one repository
#[derive(Debug, Default)]
struct RepositoryActivity {
    commits: Vec<Value>,
    pulls: Vec<Value>,
    issues: Vec<Value>,
    issue_changelogs: Vec<Value>,
    failed_resources: u64,
    failed_timelines: u64,
}

/// Items gathered for the whole run
#[derive(Debug, Default)]
struct Snapshot {
    organizations: Vec<Value>,
    repositories: Vec<Value>,
    commits: Vec<Value>,
    pulls: Vec<Value>,
    issues: Vec<Value>,
    issue_changelogs: Vec<Value>,
    failed_repositories: u64,
    failed_resources: u64,
    failed_timelines: u64,
}

impl Snapshot {
    fn absorb(&mut self, activity: RepositoryActivity) {
        self.commits.extend(activity.commits);
        self.pulls.extend(activity.pulls);
        self.issues.extend(activity.issues);
        self.issue_changelogs.extend(activity.issue_changelogs);
        self.failed_resources += activity.failed_resources;
        self.failed_timelines += activity.failed_timelines;
    }

    fn users(&self) -> Vec<Value> {
        let referenced = extract_users(
            self.commits
                .iter()
                .chain(self.pulls.iter())
                .chain(self.issues.iter()),
        );
        dedupe_users(referenced)
    }
}

/// Runs full resyncs against the stored integration
#[derive(Debug, Clone)]
pub struct ResyncService {
    config: Arc<AppConfig>,
    integrations: IntegrationRepository,
    collections: CollectionRepository,
}

impl ResyncService {
    pub fn new(db: Arc<DatabaseConnection>, config: Arc<AppConfig>) -> Self {
        Self {
            config,
            integrations: IntegrationRepository::new(db.clone()),
            collections: CollectionRepository::new(db),
        }
    }

    /// Replace every collection with a fresh snapshot from GitHub.
    ///
    /// Fails before any request when no connected integration with a token exists.
    #[instrument(skip(self), fields(run_id = tracing::field::Empty))]
    pub async fn resync(&self) -> Result<ResyncSummary, ResyncError> {
        let run_id = telemetry::current_trace_id().unwrap_or_else(|| Uuid::new_v4().to_string());
        tracing::Span::current().record("run_id", run_id.as_str());

        let integration = self
            .integrations
            .get()
            .await
            .map_err(|err| ResyncError::Credential(err.into()))?
            .filter(|integration| integration.is_active())
            .ok_or(ResyncError::NoActiveIntegration)?;

        let client = GitHubClient::from_config(&self.config, &integration.access_token)
            .map_err(ResyncError::Client)?;

        info!(login = integration.login(), "starting resync");
        let started = Instant::now();

        let deadline = self.config.sync.run_timeout();
        let outcome = tokio::time::timeout(deadline, self.run(&client)).await;
        histogram!("resync_duration_seconds").record(started.elapsed().as_secs_f64());

        let mut summary = outcome.map_err(|_| ResyncError::TimedOut {
            seconds: self.config.sync.run_timeout_seconds,
        })??;

        summary.run_id = run_id;
        summary.duration_ms = started.elapsed().as_millis() as u64;

        info!(
            written = summary.total_written(),
            failed_repositories = summary.failed_repositories,
            failed_resources = summary.failed_resources,
            failed_timelines = summary.failed_timelines,
            duration_ms = summary.duration_ms,
            "resync complete"
        );

        Ok(summary)
    }

    async fn run(&self, client: &GitHubClient) -> Result<ResyncSummary, ResyncError> {
        let snapshot = self.collect(client).await?;
        self.persist(snapshot).await
    }

    async fn collect(&self, client: &GitHubClient) -> Result<Snapshot, ResyncError> {
        let sync = &self.config.sync;
        let default_options = FetchOptions::from_sync_config(sync, sync.default_cap);
        let mut snapshot = Snapshot::default();

        snapshot.organizations = client
            .fetch_all_pages("/user/orgs", &default_options)
            .await
            .map_err(|source| ResyncError::Fetch {
                resource: "organizations".to_string(),
                source,
            })?;
        info!(count = snapshot.organizations.len(), "fetched organizations");

        for org in &snapshot.organizations {
            let Some(login) = org.get("login").and_then(Value::as_str) else {
                warn!("organization item has no login, skipping");
                continue;
            };

            let repos = client
                .fetch_all_pages(&format!("/orgs/{}/repos", login), &default_options)
                .await
                .map_err(|source| ResyncError::Fetch {
                    resource: format!("repositories of {}", login),
                    source,
                })?;
            debug!(org = login, count = repos.len(), "fetched repositories");
            snapshot.repositories.extend(repos);
        }
        info!(count = snapshot.repositories.len(), "fetched repositories");

        let repositories = std::mem::take(&mut snapshot.repositories);
        for repo in &repositories {
            let result = match repo.get("full_name").and_then(Value::as_str) {
                Some(full_name) => self.sync_repository(client, full_name).await,
                None => Err(RepositoryError::MissingFullName),
            };

            match result {
                Ok(activity) => snapshot.absorb(activity),
                Err(err) => {
                    warn!(error = %err, "skipping repository");
                    counter!("resync_repository_failures_total").increment(1);
                    snapshot.failed_repositories += 1;
                }
            }
        }
        snapshot.repositories = repositories;

        Ok(snapshot)
    }

    /// Commits, pulls and issues are fetched concurrently; a failed fetch yields no items
    /// for that resource while the other two are kept.
    #[instrument(skip(self, client, full_name), fields(repo = full_name))]
    async fn sync_repository(
        &self,
        client: &GitHubClient,
        full_name: &str,
    ) -> Result<RepositoryActivity, RepositoryError> {
        let sync = &self.config.sync;
        let commit_path = format!("/repos/{}/commits", full_name);
        let pull_path = format!("/repos/{}/pulls?state=all", full_name);
        let issue_path = format!("/repos/{}/issues?state=all", full_name);
        let commit_options = FetchOptions::from_sync_config(sync, sync.commit_cap);
        let pull_options = FetchOptions::from_sync_config(sync, sync.pull_cap);
        let issue_options = FetchOptions::from_sync_config(sync, sync.issue_cap);

        let (commits, pulls, issues) = tokio::join!(
            client.fetch_all_pages(&commit_path, &commit_options),
            client.fetch_all_pages(&pull_path, &pull_options),
            client.fetch_all_pages(&issue_path, &issue_options),
        );

        let mut activity = RepositoryActivity::default();
        activity.commits = activity.items_or_empty(commits, full_name, "commits");
        activity.pulls = activity.items_or_empty(pulls, full_name, "pulls");
        activity.issues = activity.items_or_empty(issues, full_name, "issues");

        let timeline_options = FetchOptions::from_sync_config(sync, sync.default_cap);
        for issue in &activity.issues {
            let number = issue.get("number").and_then(Value::as_u64).ok_or_else(|| {
                RepositoryError::MissingIssueNumber {
                    repo: full_name.to_string(),
                }
            })?;

            let timeline_path = format!("/repos/{}/issues/{}/timeline", full_name, number);
            match client.fetch_all_pages(&timeline_path, &timeline_options).await {
                Ok(events) => activity.issue_changelogs.extend(events),
                Err(err) => {
                    warn!(issue = number, error = %err, "failed to fetch issue timeline");
                    counter!("resync_timeline_failures_total").increment(1);
                    activity.failed_timelines += 1;
                }
            }
        }

        debug!(
            commits = activity.commits.len(),
            pulls = activity.pulls.len(),
            issues = activity.issues.len(),
            events = activity.issue_changelogs.len(),
            "repository synced"
        );

        Ok(activity)
    }

    async fn persist(&self, snapshot: Snapshot) -> Result<ResyncSummary, ResyncError> {
        let users = snapshot.users();
        let mut summary = ResyncSummary {
            failed_repositories: snapshot.failed_repositories,
            failed_resources: snapshot.failed_resources,
            failed_timelines: snapshot.failed_timelines,
            ..Default::default()
        };

        let batches = [
            (Collection::Organizations, &snapshot.organizations),
            (Collection::Repositories, &snapshot.repositories),
            (Collection::Commits, &snapshot.commits),
            (Collection::Pulls, &snapshot.pulls),
            (Collection::Issues, &snapshot.issues),
            (Collection::IssueChangelogs, &snapshot.issue_changelogs),
            (Collection::Users, &users),
        ];

        for (collection, records) in batches {
            let written = self
                .collections
                .replace_collection(collection, records, self.config.sync.batch_size)
                .await
                .map_err(|err| ResyncError::Persistence {
                    collection,
                    source: err.into(),
                })?;

            counter!("resync_records_written_total", "collection" => collection.name())
                .increment(written);
            info!(collection = %collection, count = written, "collection written");
            summary.record_written(collection, written);
        }

        Ok(summary)
    }
}

impl RepositoryActivity {
    /// Unwraps one listing; a failure is counted and contributes no items.
    fn items_or_empty(
        &mut self,
        result: Result<Vec<Value>, GitHubError>,
        full_name: &str,
        resource: &'static str,
    ) -> Vec<Value> {
        result.unwrap_or_else(|err| {
            warn!(repo = full_name, resource, error = %err, "fetch failed, continuing without it");
            counter!("resync_resource_failures_total", "resource" => resource).increment(1);
            self.failed_resources += 1;
            Vec::new()
        })
    }
}
