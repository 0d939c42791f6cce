//! Organization registry.
//!
//! Tracks organizations through an editorial lifecycle
//! (DRAFT → IN_REVIEW → PUBLISHED → ARCHIVED) and serves the published ones for
//! map-style browsing with filters and faceted counts.
//!
//! - [`lifecycle`]: legal status transitions and the publish gate
//! - [`taxonomy`]: controlled vocabularies behind a TTL cache
//! - [`validation`]: normalization, structural rules, taxonomy membership
//! - [`filter`] / [`aggregates`]: one predicate for listing and counting
//! - [`store`]: persistence port with in-memory and Postgres adapters
//! - [`service`]: orchestration used by the HTTP layer in [`api`]

pub mod aggregates;
pub mod audit;
pub mod auth;
pub mod clock;
pub mod config;
pub mod error;
pub mod filter;
pub mod geocoding;
pub mod lifecycle;
pub mod models;
pub mod service;
pub mod store;
pub mod taxonomy;
pub mod validation;

#[cfg(feature = "server")]
pub mod api;

pub use error::{RegistryError, Result};
pub use service::{DeleteOutcome, OrganizationService};
