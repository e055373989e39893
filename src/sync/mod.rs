//! Resync pipeline: the orchestrator and user deduplication.

pub mod orchestrator;
pub mod users;

pub use orchestrator::{ResyncError, ResyncService, ResyncSummary};
pub use users::{dedupe_users, extract_users};
