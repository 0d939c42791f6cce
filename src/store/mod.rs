//! Organization persistence port and its adapters.

pub mod memory;
#[cfg(feature = "database")]
pub mod postgres;
pub mod row;

use async_trait::async_trait;

use crate::error::Result;
use crate::filter::{FilterCriteria, OrganizationQuery};
use crate::models::{AggregatesResponse, Organization, OrganizationStatus};

pub use memory::MemoryOrganizationStore;
#[cfg(feature = "database")]
pub use postgres::{PgAuditSink, PgOrganizationStore, PgTaxonomyStore};
pub use row::OrganizationRow;

/// Storage for organization records.
///
/// Status only changes through [`OrganizationStore::update_status`]; `update`
/// writes every other field and leaves status and `created_at` alone. Every
/// mutation bumps `updated_at`. Mutations addressing a missing id fail with
/// `NotFound`.
#[async_trait]
pub trait OrganizationStore: Send + Sync {
    /// Fails with `AlreadyExists` when the id is taken.
    async fn create(&self, org: &Organization) -> Result<()>;
    async fn update(&self, org: &Organization) -> Result<()>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Organization>>;
    async fn find_published_by_id(&self, id: &str) -> Result<Option<Organization>>;
    /// Matching records, most recently updated first.
    async fn find_filtered(&self, query: &OrganizationQuery) -> Result<Vec<Organization>>;
    /// Per-dimension counts under `criteria`, applied as given.
    async fn aggregate(&self, criteria: &FilterCriteria) -> Result<AggregatesResponse>;
    async fn delete(&self, id: &str) -> Result<()>;
    async fn update_status(&self, id: &str, status: OrganizationStatus) -> Result<()>;
    async fn update_coordinates(&self, id: &str, lat: f64, lng: f64) -> Result<()>;
}
