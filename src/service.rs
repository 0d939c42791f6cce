//! OrganizationService: the registry's write and read paths.
//!
//! Takes port traits via `Arc<dyn PortTrait>` so the same logic runs against
//! Postgres or the in-memory adapters. Every admin method takes the caller's
//! `&Principal` explicitly and checks the admin role before touching storage.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Duration;
use tracing::info;

use crate::aggregates;
use crate::audit::{self, AuditAction, AuditEvent, AuditSink, STATUS_DELETED};
use crate::auth::{Principal, SYSTEM_DELETE_ACTOR};
use crate::clock::Clock;
use crate::error::{RegistryError, Result};
use crate::filter::OrganizationQuery;
use crate::geocoding::{place_query, Geocoder};
use crate::lifecycle::{self, Transition};
use crate::models::{
    group_by_category, AggregatesResponse, GroupedTaxonomies, Organization, OrganizationStatus,
};
use crate::store::OrganizationStore;
use crate::taxonomy::{TaxonomyCache, TaxonomyStore};
use crate::validation::Validator;

/// What `delete` actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Row removed.
    Deleted,
    /// Record was PUBLISHED; it was archived instead.
    Archived,
}

pub struct OrganizationService {
    store: Arc<dyn OrganizationStore>,
    taxonomies: Arc<dyn TaxonomyStore>,
    validator: Validator,
    audit: Arc<dyn AuditSink>,
    geocoder: Arc<dyn Geocoder>,
    clock: Arc<dyn Clock>,
}

impl OrganizationService {
    pub fn new(
        store: Arc<dyn OrganizationStore>,
        taxonomies: Arc<dyn TaxonomyStore>,
        audit: Arc<dyn AuditSink>,
        geocoder: Arc<dyn Geocoder>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let cache = Arc::new(TaxonomyCache::new(taxonomies.clone(), clock.clone()));
        Self {
            store,
            taxonomies,
            validator: Validator::new(cache, clock.clone()),
            audit,
            geocoder,
            clock,
        }
    }

    /// Replace the taxonomy cache with one using `ttl`.
    pub fn with_taxonomy_ttl(mut self, ttl: Duration) -> Self {
        let cache = Arc::new(TaxonomyCache::with_ttl(
            self.taxonomies.clone(),
            self.clock.clone(),
            ttl,
        ));
        self.validator = Validator::new(cache, self.clock.clone());
        self
    }

    // ── Writes ────────────────────────────────────────────────

    /// New records always start in DRAFT with both timestamps set to now.
    pub async fn create(
        &self,
        principal: &Principal,
        mut org: Organization,
    ) -> Result<Organization> {
        principal.require_admin()?;
        self.validator.validate_for_write(&mut org).await?;

        let now = self.clock.now();
        org.status = OrganizationStatus::Draft;
        org.created_at = now;
        org.updated_at = now;
        self.store.create(&org).await?;

        info!(id = %org.id, actor = %principal.actor_id, "organization created");
        Ok(org)
    }

    /// Replace every field except id, status and created_at.
    pub async fn update(
        &self,
        principal: &Principal,
        id: &str,
        mut org: Organization,
    ) -> Result<Organization> {
        principal.require_admin()?;
        org.id = id.to_string();
        self.validator.validate_for_write(&mut org).await?;

        let existing = self.load(&org.id).await?;
        org.status = existing.status;
        org.created_at = existing.created_at;
        self.store.update(&org).await?;

        info!(id = %org.id, actor = %principal.actor_id, "organization updated");
        self.load(&org.id).await
    }

    pub async fn submit_for_review(&self, principal: &Principal, id: &str) -> Result<Organization> {
        self.transition(principal, id, AuditAction::SubmitForReview, |org| {
            lifecycle::submit_for_review(org.status)
        })
        .await
    }

    pub async fn publish(&self, principal: &Principal, id: &str) -> Result<Organization> {
        self.transition(principal, id, AuditAction::Publish, |org| {
            lifecycle::publish(org.status, org)
        })
        .await
    }

    /// Idempotent: archiving an archived record succeeds without a write.
    pub async fn archive(&self, principal: &Principal, id: &str) -> Result<Organization> {
        self.transition(principal, id, AuditAction::Archive, |org| {
            Ok(lifecycle::archive(org.status))
        })
        .await
    }

    pub async fn reject(&self, principal: &Principal, id: &str) -> Result<Organization> {
        self.transition(principal, id, AuditAction::Reject, |org| {
            lifecycle::reject(org.status)
        })
        .await
    }

    /// Hard delete from DRAFT or IN_REVIEW. PUBLISHED records are archived
    /// instead; ARCHIVED records need `force`.
    pub async fn delete(
        &self,
        principal: &Principal,
        id: &str,
        force: bool,
    ) -> Result<DeleteOutcome> {
        principal.require_admin()?;
        let org = self.load(id).await?;

        match org.status {
            OrganizationStatus::Published => {
                let t = lifecycle::archive(org.status);
                self.store.update_status(id, t.to).await?;
                self.record(id, AuditAction::Archive, t.from, t.to.as_ref(), SYSTEM_DELETE_ACTOR)
                    .await;
                info!(
                    id,
                    actor = %principal.actor_id,
                    "delete of published organization archived it"
                );
                Ok(DeleteOutcome::Archived)
            }
            OrganizationStatus::Archived if !force => Err(RegistryError::ConflictRequiresForce(
                format!("organization {} is archived; use force=true to delete permanently", id),
            )),
            from => {
                self.store.delete(id).await?;
                self.record(id, AuditAction::Delete, from, STATUS_DELETED, &principal.actor_id)
                    .await;
                info!(id, actor = %principal.actor_id, %from, "organization deleted");
                Ok(DeleteOutcome::Deleted)
            }
        }
    }

    pub async fn set_coordinates(
        &self,
        principal: &Principal,
        id: &str,
        lat: f64,
        lng: f64,
    ) -> Result<Organization> {
        principal.require_admin()?;
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
            return Err(RegistryError::invalid(format!(
                "coordinates out of range: lat={}, lng={}",
                lat, lng
            )));
        }
        self.load(id).await?;
        self.store.update_coordinates(id, lat, lng).await?;
        info!(id, lat, lng, "coordinates updated");
        self.load(id).await
    }

    /// Look up coordinates for the record's city/region/country and store them.
    pub async fn geocode(&self, principal: &Principal, id: &str) -> Result<Organization> {
        principal.require_admin()?;
        let org = self.load(id).await?;
        let coords = self
            .geocoder
            .geocode(&org.city, &org.region, &org.country)
            .await?
            .ok_or_else(|| {
                RegistryError::not_found(format!(
                    "no coordinates for {}",
                    place_query(&org.city, &org.region, &org.country)
                ))
            })?;
        self.store
            .update_coordinates(id, coords.lat, coords.lng)
            .await?;
        info!(id, lat = coords.lat, lng = coords.lng, "organization geocoded");
        self.load(id).await
    }

    // ── Reads ─────────────────────────────────────────────────

    pub async fn get(&self, principal: &Principal, id: &str) -> Result<Organization> {
        principal.require_admin()?;
        self.load(id).await
    }

    pub async fn get_published(&self, id: &str) -> Result<Organization> {
        self.store
            .find_published_by_id(id)
            .await?
            .ok_or_else(|| RegistryError::not_found(id))
    }

    /// Any status unless `status` is among the params.
    pub async fn list(
        &self,
        principal: &Principal,
        params: &HashMap<String, String>,
    ) -> Result<Vec<Organization>> {
        principal.require_admin()?;
        self.store
            .find_filtered(&OrganizationQuery::from_params(params))
            .await
    }

    /// PUBLISHED only, whatever `status` says.
    pub async fn list_published(
        &self,
        params: &HashMap<String, String>,
    ) -> Result<Vec<Organization>> {
        let query =
            OrganizationQuery::from_params(params).with_status(OrganizationStatus::Published);
        self.store.find_filtered(&query).await
    }

    /// Status defaults to PUBLISHED but may be overridden.
    pub async fn aggregates(
        &self,
        principal: &Principal,
        params: &HashMap<String, String>,
    ) -> Result<AggregatesResponse> {
        principal.require_admin()?;
        let criteria =
            aggregates::aggregation_criteria(OrganizationQuery::from_params(params).criteria);
        self.store.aggregate(&criteria).await
    }

    pub async fn public_aggregates(
        &self,
        params: &HashMap<String, String>,
    ) -> Result<AggregatesResponse> {
        let query =
            OrganizationQuery::from_params(params).with_status(OrganizationStatus::Published);
        self.store.aggregate(&query.criteria).await
    }

    /// Active entries grouped by category, straight from the taxonomy store.
    pub async fn taxonomies(&self) -> Result<GroupedTaxonomies> {
        let entries = self
            .taxonomies
            .find_all_active()
            .await
            .map_err(|e| RegistryError::TaxonomyUnavailable(e.to_string()))?;
        Ok(group_by_category(entries))
    }

    // ── Helpers ───────────────────────────────────────────────

    async fn load(&self, id: &str) -> Result<Organization> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| RegistryError::not_found(id))
    }

    async fn transition(
        &self,
        principal: &Principal,
        id: &str,
        action: AuditAction,
        decide: impl FnOnce(&Organization) -> Result<Transition>,
    ) -> Result<Organization> {
        principal.require_admin()?;
        let org = self.load(id).await?;
        let t = decide(&org)?;
        if t.is_noop() {
            return Ok(org);
        }

        self.store.update_status(id, t.to).await?;
        self.record(id, action, t.from, t.to.as_ref(), &principal.actor_id)
            .await;
        info!(id, from = %t.from, to = %t.to, actor = %principal.actor_id, "status changed");
        self.load(id).await
    }

    async fn record(
        &self,
        id: &str,
        action: AuditAction,
        from: OrganizationStatus,
        to: &str,
        performed_by: &str,
    ) {
        let event = AuditEvent::organization(id, action, from, to, performed_by, self.clock.now());
        audit::emit(self.audit.as_ref(), event).await;
    }
}
