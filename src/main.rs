//! # Activity Sync Entry Point
//!
//! Serves the HTTP API by default; subcommands run one-off operations.

use std::sync::Arc;

use activity_sync::{
    config::ConfigLoader,
    db,
    github::GitHubClient,
    repositories::IntegrationRepository,
    server::run_server,
    sync::ResyncService,
    telemetry::{self, TraceContext, with_trace_context},
};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "activity-sync")]
#[command(version)]
#[command(about = "Resync an organization's GitHub activity into a local store")]
#[command(after_long_help = r#"CONFIGURATION
    Settings are read from .env, .env.local, .env.<profile> and .env.<profile>.local,
    then from ACTIVITY_SYNC_* environment variables, later sources winning.

ENVIRONMENT VARIABLES
    ACTIVITY_SYNC_DATABASE_URL        Database connection string
    ACTIVITY_SYNC_API_BIND_ADDR       HTTP listen address (default: 0.0.0.0:8080)
    ACTIVITY_SYNC_GITHUB_API_BASE     GitHub API base URL (default: https://api.github.com)
    ACTIVITY_SYNC_LOG_FORMAT          json or pretty
"#)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP API (default)
    Serve,
    /// Run one full resync and print the summary as JSON
    Resync,
    /// Store a GitHub access token as the connected integration
    Connect {
        /// Personal access token or OAuth token
        #[arg(long, env = "ACTIVITY_SYNC_GITHUB_TOKEN", hide_env_values = true)]
        token: String,
    },
    /// Remove the connected integration
    Disconnect,
    /// Apply pending database migrations and exit
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = ConfigLoader::new()
        .load()
        .context("loading configuration")?;
    telemetry::init_tracing(&config)?;

    if let Ok(redacted_json) = config.redacted_json() {
        tracing::debug!(config = %redacted_json, profile = %config.profile, "configuration loaded");
    }

    let db = Arc::new(
        db::init_pool(&config)
            .await
            .context("initializing database connection pool")?,
    );
    db::run_migrations(&db).await?;

    let config = Arc::new(config);

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => run_server(config, db).await?,
        Commands::Migrate => tracing::info!("migrations applied"),
        Commands::Resync => {
            let service = ResyncService::new(db, config);
            let summary = with_trace_context(TraceContext::generate(), service.resync()).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::Connect { token } => {
            let client = GitHubClient::from_config(&config, &token)?;
            let profile = client
                .get_authenticated_user()
                .await
                .context("verifying token against GET /user")?;

            let integration = IntegrationRepository::new(db)
                .upsert(&token, Some(profile))
                .await?;
            println!(
                "Connected as {}",
                integration.login().unwrap_or("<unknown login>")
            );
        }
        Commands::Disconnect => {
            if IntegrationRepository::new(db).delete().await? {
                println!("Integration removed");
            } else {
                println!("No integration was stored");
            }
        }
    }

    Ok(())
}
