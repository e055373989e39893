//! # Activity Sync Library
//!
//! Resyncs the GitHub activity visible to a connected account (organizations,
//! repositories, commits, pull requests, issues, issue timelines and the users
//! they reference) into named collections of a local store.

pub mod collections;
pub mod config;
pub mod db;
pub mod error;
pub mod github;
pub mod handlers;
pub mod models;
pub mod repositories;
pub mod server;
pub mod sync;
pub mod telemetry;
pub use migration;
