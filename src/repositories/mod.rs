//! # Repository Layer
//!
//! This module contains repository implementations that encapsulate SeaORM operations
//! for the integration record and the synced collections.

pub mod collection;
pub mod integration;

pub use collection::CollectionRepository;
pub use integration::IntegrationRepository;
