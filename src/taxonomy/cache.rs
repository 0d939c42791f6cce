//! Time-bounded snapshot of valid taxonomy values.
//!
//! Readers share the current snapshot through an `Arc`. When the snapshot is
//! older than the TTL the next reader refetches from the store, outside of any
//! lock, and swaps the new snapshot in under a short write lock. Concurrent
//! refreshes may race; the last one to swap wins.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use anyhow::anyhow;
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::error::{RegistryError, Result};
use crate::models::Taxonomy;
use crate::taxonomy::store::TaxonomyStore;

pub const DEFAULT_TTL_SECS: i64 = 60;

/// Category → set of valid values, as of `fetched_at`.
#[derive(Debug, Clone)]
pub struct TaxonomySnapshot {
    sets: HashMap<String, HashSet<String>>,
    fetched_at: DateTime<Utc>,
}

impl TaxonomySnapshot {
    pub fn from_entries(entries: &[Taxonomy], fetched_at: DateTime<Utc>) -> Self {
        let mut sets: HashMap<String, HashSet<String>> = HashMap::new();
        for entry in entries {
            sets.entry(entry.category.clone())
                .or_default()
                .insert(entry.value.clone());
        }
        Self { sets, fetched_at }
    }

    /// A category with no entries at all is unconstrained and accepts anything.
    pub fn is_valid(&self, category: &str, value: &str) -> bool {
        match self.sets.get(category) {
            Some(values) => values.contains(value),
            None => true,
        }
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }
}

pub struct TaxonomyCache {
    store: Arc<dyn TaxonomyStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    current: RwLock<Option<Arc<TaxonomySnapshot>>>,
}

impl TaxonomyCache {
    pub fn new(store: Arc<dyn TaxonomyStore>, clock: Arc<dyn Clock>) -> Self {
        Self::with_ttl(store, clock, Duration::seconds(DEFAULT_TTL_SECS))
    }

    pub fn with_ttl(store: Arc<dyn TaxonomyStore>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            store,
            clock,
            ttl,
            current: RwLock::new(None),
        }
    }

    /// Current snapshot, refetched first if missing or expired.
    pub async fn snapshot(&self) -> Result<Arc<TaxonomySnapshot>> {
        if let Some(snapshot) = self.fresh()? {
            debug!(fetched_at = %snapshot.fetched_at, "taxonomy cache hit");
            return Ok(snapshot);
        }
        self.refresh().await
    }

    pub async fn is_valid(&self, category: &str, value: &str) -> Result<bool> {
        Ok(self.snapshot().await?.is_valid(category, value))
    }

    /// Unconditionally refetch and swap in a new snapshot.
    pub async fn refresh(&self) -> Result<Arc<TaxonomySnapshot>> {
        let entries = self.store.find_all_active().await.map_err(|e| {
            warn!(error = %e, "taxonomy refresh failed");
            RegistryError::TaxonomyUnavailable(e.to_string())
        })?;

        let snapshot = Arc::new(TaxonomySnapshot::from_entries(&entries, self.clock.now()));
        {
            let mut current = self
                .current
                .write()
                .map_err(|e| anyhow!("Lock: {}", e))?;
            *current = Some(Arc::clone(&snapshot));
        }
        debug!(
            entries = entries.len(),
            categories = snapshot.sets.len(),
            "taxonomy cache refreshed"
        );
        Ok(snapshot)
    }

    /// Drop the snapshot so the next read refetches.
    pub fn invalidate(&self) -> Result<()> {
        let mut current = self
            .current
            .write()
            .map_err(|e| anyhow!("Lock: {}", e))?;
        *current = None;
        Ok(())
    }

    fn fresh(&self) -> Result<Option<Arc<TaxonomySnapshot>>> {
        let current = self.current.read().map_err(|e| anyhow!("Lock: {}", e))?;
        let now = self.clock.now();
        Ok(current
            .as_ref()
            .filter(|s| now - s.fetched_at < self.ttl)
            .cloned())
    }
}
