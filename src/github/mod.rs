//! GitHub REST access: an authenticated client and capped, paced pagination.

pub mod client;
pub mod pagination;

pub use client::{GitHubClient, GitHubError};
pub use pagination::FetchOptions;
