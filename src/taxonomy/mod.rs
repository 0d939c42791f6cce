//! Controlled vocabularies: the store port and the TTL-bounded validation cache.

pub mod cache;
pub mod store;

pub use cache::{TaxonomyCache, TaxonomySnapshot};
pub use store::{MemoryTaxonomyStore, TaxonomyStore};
