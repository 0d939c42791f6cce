//! Domain types shared by every layer of the registry.

pub mod aggregates;
pub mod organization;
pub mod taxonomy;

pub use aggregates::{AggregateItem, AggregatesResponse};
pub use organization::{Organization, OrganizationStatus};
pub use taxonomy::{group_by_category, GroupedTaxonomies, Taxonomy};
