//! Source of controlled-vocabulary entries.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::models::Taxonomy;

/// Read-only access to the taxonomy table. Only active entries are returned.
#[async_trait]
pub trait TaxonomyStore: Send + Sync {
    async fn find_all_active(&self) -> Result<Vec<Taxonomy>>;
}

// ── MemoryTaxonomyStore ──

/// In-memory TaxonomyStore for tests and local runs.
///
/// Counts fetches so cache behaviour can be observed, and can be switched into
/// an unavailable mode to exercise upstream failure.
pub struct MemoryTaxonomyStore {
    entries: RwLock<Vec<Taxonomy>>,
    fetches: AtomicUsize,
    unavailable: AtomicBool,
}

impl MemoryTaxonomyStore {
    pub fn new(entries: Vec<Taxonomy>) -> Self {
        Self {
            entries: RwLock::new(entries),
            fetches: AtomicUsize::new(0),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Convenience constructor from `(category, value)` pairs.
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        let entries = pairs
            .iter()
            .enumerate()
            .map(|(i, (category, value))| Taxonomy {
                id: i as i64 + 1,
                category: category.to_string(),
                value: value.to_string(),
                label: value.to_string(),
                sort_order: i as i32,
                is_active: true,
            })
            .collect();
        Self::new(entries)
    }

    pub fn replace(&self, entries: Vec<Taxonomy>) -> Result<()> {
        let mut guard = self.entries.write().map_err(|e| anyhow!("Lock: {}", e))?;
        *guard = entries;
        Ok(())
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    fn active(&self) -> Result<Vec<Taxonomy>> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(anyhow!("taxonomy store unavailable"));
        }
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let guard = self.entries.read().map_err(|e| anyhow!("Lock: {}", e))?;
        Ok(guard
            .iter()
            .filter(|t| t.is_active)
            .cloned()
            .collect())
    }
}

impl Default for MemoryTaxonomyStore {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

#[async_trait]
impl TaxonomyStore for MemoryTaxonomyStore {
    async fn find_all_active(&self) -> Result<Vec<Taxonomy>> {
        self.active()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn inactive_entries_are_hidden() {
        let store = MemoryTaxonomyStore::from_pairs(&[("stage", "Seed"), ("stage", "Growth")]);
        let mut entries = store.find_all_active().await.unwrap();
        entries[1].is_active = false;
        store.replace(entries).unwrap();

        let active = store.find_all_active().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].value, "Seed");
    }

    #[tokio::test]
    async fn unavailable_store_errors_without_counting() {
        let store = MemoryTaxonomyStore::default();
        store.set_unavailable(true);
        assert!(store.find_all_active().await.is_err());
        assert_eq!(store.fetch_count(), 0);
    }
}
