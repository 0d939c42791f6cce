//! In-memory OrganizationStore for tests and local runs.
//!
//! Holds rows in the same encoded shape the database uses, so multi-valued
//! columns go through the same JSON round trip.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::aggregates;
use crate::clock::Clock;
use crate::error::{RegistryError, Result};
use crate::filter::{FilterCriteria, OrganizationQuery};
use crate::models::{AggregatesResponse, Organization, OrganizationStatus};
use crate::store::row::OrganizationRow;
use crate::store::OrganizationStore;

pub struct MemoryOrganizationStore {
    rows: RwLock<HashMap<String, OrganizationRow>>,
    clock: Arc<dyn Clock>,
}

impl MemoryOrganizationStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
            clock,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.read().map(|rows| rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn decoded(&self, criteria: &FilterCriteria) -> Result<Vec<Organization>> {
        let rows = self.rows.read().map_err(|e| anyhow!("Lock: {}", e))?;
        let mut matching = Vec::new();
        for row in rows.values() {
            let org = Organization::try_from(row.clone())?;
            if criteria.matches(&org) {
                matching.push(org);
            }
        }
        Ok(matching)
    }

    /// Apply `f` to the stored row for `id` and bump `updated_at`.
    fn mutate(&self, id: &str, f: impl FnOnce(&mut OrganizationRow, DateTime<Utc>)) -> Result<()> {
        let now = self.clock.now();
        let mut rows = self.rows.write().map_err(|e| anyhow!("Lock: {}", e))?;
        let row = rows
            .get_mut(id)
            .ok_or_else(|| RegistryError::not_found(id))?;
        f(row, now);
        row.updated_at = now;
        Ok(())
    }
}

#[async_trait]
impl OrganizationStore for MemoryOrganizationStore {
    async fn create(&self, org: &Organization) -> Result<()> {
        let row = OrganizationRow::try_from(org)?;
        let mut rows = self.rows.write().map_err(|e| anyhow!("Lock: {}", e))?;
        if rows.contains_key(&row.id) {
            return Err(RegistryError::AlreadyExists(row.id));
        }
        rows.insert(row.id.clone(), row);
        Ok(())
    }

    async fn update(&self, org: &Organization) -> Result<()> {
        let incoming = OrganizationRow::try_from(org)?;
        self.mutate(&org.id, move |row, _| {
            let status = std::mem::take(&mut row.status);
            let created_at = row.created_at;
            *row = OrganizationRow {
                status,
                created_at,
                ..incoming
            };
        })
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Organization>> {
        let rows = self.rows.read().map_err(|e| anyhow!("Lock: {}", e))?;
        rows.get(id)
            .cloned()
            .map(Organization::try_from)
            .transpose()
            .map_err(RegistryError::from)
    }

    async fn find_published_by_id(&self, id: &str) -> Result<Option<Organization>> {
        Ok(self
            .find_by_id(id)
            .await?
            .filter(|org| org.status == OrganizationStatus::Published))
    }

    async fn find_filtered(&self, query: &OrganizationQuery) -> Result<Vec<Organization>> {
        let mut matching = self.decoded(&query.criteria)?;
        matching.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(query.page.apply(matching))
    }

    async fn aggregate(&self, criteria: &FilterCriteria) -> Result<AggregatesResponse> {
        Ok(aggregates::compute(&self.decoded(criteria)?))
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let mut rows = self.rows.write().map_err(|e| anyhow!("Lock: {}", e))?;
        rows.remove(id)
            .map(|_| ())
            .ok_or_else(|| RegistryError::not_found(id))
    }

    async fn update_status(&self, id: &str, status: OrganizationStatus) -> Result<()> {
        self.mutate(id, |row, _| row.status = status.to_string())
    }

    async fn update_coordinates(&self, id: &str, lat: f64, lng: f64) -> Result<()> {
        self.mutate(id, |row, _| {
            row.lat = Some(lat);
            row.lng = Some(lng);
        })
    }
}
