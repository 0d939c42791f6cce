//! Validation engine for organization records.
//!
//! Three layers, applied in this order on every write:
//! 1. structural normalization ([`normalize`]): trimming, blank optionals to `None`,
//!    required fields, paired coordinates, founding year bounds;
//! 2. taxonomy membership ([`Validator::check_taxonomies`]) against the cache;
//! 3. the publish checklist ([`validate_for_publish`]), only when publishing.

use std::sync::Arc;

use chrono::Datelike;

use crate::clock::Clock;
use crate::error::{RegistryError, Result};
use crate::models::taxonomy::category;
use crate::models::Organization;
use crate::taxonomy::{TaxonomyCache, TaxonomySnapshot};

pub const MIN_YEAR_FOUNDED: i32 = 1800;
pub const MIN_PUBLISH_DESCRIPTION_CHARS: usize = 20;

/// Write-path validator. Owns the taxonomy cache and the clock that decides the
/// current year.
pub struct Validator {
    taxonomies: Arc<TaxonomyCache>,
    clock: Arc<dyn Clock>,
}

impl Validator {
    pub fn new(taxonomies: Arc<TaxonomyCache>, clock: Arc<dyn Clock>) -> Self {
        Self { taxonomies, clock }
    }

    /// Normalize in place, then check every controlled field.
    pub async fn validate_for_write(&self, org: &mut Organization) -> Result<()> {
        normalize(org, self.clock.now().year())?;
        self.check_taxonomies(org).await
    }

    pub async fn check_taxonomies(&self, org: &Organization) -> Result<()> {
        let snapshot = self.taxonomies.snapshot().await?;
        check_against(&snapshot, org)
    }
}

// ─── Structural normalization ─────────────────────────────────

pub fn normalize(org: &mut Organization, current_year: i32) -> Result<()> {
    for field in [
        &mut org.id,
        &mut org.name,
        &mut org.organization_type,
        &mut org.sector_primary,
        &mut org.outcome_status,
        &mut org.country,
        &mut org.region,
        &mut org.city,
    ] {
        trim_in_place(field);
    }

    if org.id.is_empty() {
        return Err(RegistryError::invalid("missing required field: id"));
    }
    if org.name.is_empty() {
        return Err(RegistryError::invalid("missing required field: name"));
    }

    for field in [
        &mut org.sector_secondary,
        &mut org.stage,
        &mut org.description,
        &mut org.website,
        &mut org.linkedin_url,
        &mut org.instagram_url,
        &mut org.logo_url,
        &mut org.contact_email,
        &mut org.contact_phone,
        &mut org.notes,
    ] {
        normalize_optional(field);
    }

    if org.lat.is_some() != org.lng.is_some() {
        return Err(RegistryError::invalid(
            "coordinates must be paired: provide both lat and lng, or neither",
        ));
    }

    if let Some(year) = org.year_founded {
        if !(MIN_YEAR_FOUNDED..=current_year).contains(&year) {
            return Err(RegistryError::invalid(format!(
                "year out of range: yearFounded must be between {} and {}",
                MIN_YEAR_FOUNDED, current_year
            )));
        }
    }

    Ok(())
}

fn trim_in_place(value: &mut String) {
    let trimmed = value.trim();
    if trimmed.len() != value.len() {
        *value = trimmed.to_string();
    }
}

fn normalize_optional(value: &mut Option<String>) {
    *value = value
        .take()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
}

// ─── Taxonomy membership ──────────────────────────────────────

/// Check every controlled field against one snapshot. Empty single values are
/// skipped; tags are free-form.
pub fn check_against(snapshot: &TaxonomySnapshot, org: &Organization) -> Result<()> {
    let singles: [(&str, Option<&str>); 5] = [
        (category::ORGANIZATION_TYPE, Some(org.organization_type.as_str())),
        (category::SECTOR_PRIMARY, Some(org.sector_primary.as_str())),
        (category::SECTOR_SECONDARY, org.sector_secondary.as_deref()),
        (category::STAGE, org.stage.as_deref()),
        (category::OUTCOME_STATUS, Some(org.outcome_status.as_str())),
    ];
    for (cat, value) in singles {
        match value {
            Some(v) if !v.is_empty() => check_one(snapshot, cat, v)?,
            _ => {}
        }
    }

    let multis: [(&str, &[String]); 3] = [
        (category::TECHNOLOGY, &org.technology),
        (category::IMPACT_AREA, &org.impact_area),
        (category::BADGE, &org.badge),
    ];
    for (cat, values) in multis {
        for v in values {
            check_one(snapshot, cat, v)?;
        }
    }

    Ok(())
}

fn check_one(snapshot: &TaxonomySnapshot, cat: &str, value: &str) -> Result<()> {
    if snapshot.is_valid(cat, value) {
        Ok(())
    } else {
        Err(RegistryError::invalid(format!("invalid {}: {}", cat, value)))
    }
}

// ─── Publish checklist ────────────────────────────────────────

/// Completeness rules a record must meet before it can be PUBLISHED.
/// Nothing is auto-corrected.
pub fn validate_for_publish(org: &Organization) -> Result<()> {
    let required = [
        &org.name,
        &org.organization_type,
        &org.sector_primary,
        &org.outcome_status,
        &org.country,
        &org.region,
        &org.city,
    ];
    if required.iter().any(|v| v.trim().is_empty()) {
        return Err(RegistryError::validation_failed(
            "missing required geographic or categorization fields",
        ));
    }

    let description_chars = org
        .description
        .as_deref()
        .map(|d| d.chars().count())
        .unwrap_or(0);
    if description_chars < MIN_PUBLISH_DESCRIPTION_CHARS {
        return Err(RegistryError::validation_failed(format!(
            "description is too short (min {} chars required for publishing)",
            MIN_PUBLISH_DESCRIPTION_CHARS
        )));
    }

    if !has_text(&org.website) && !has_text(&org.linkedin_url) {
        return Err(RegistryError::validation_failed(
            "at least one contact link (website or LinkedIn) is required to publish",
        ));
    }

    if org.organization_type.eq_ignore_ascii_case("startup") && !has_text(&org.stage) {
        return Err(RegistryError::validation_failed(
            "stage is mandatory for organizations of type Startup",
        ));
    }

    Ok(())
}

fn has_text(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::taxonomy::MemoryTaxonomyStore;
    use chrono::{TimeZone, Utc};

    fn ready() -> Organization {
        Organization {
            id: "acme".into(),
            name: "Acme".into(),
            organization_type: "NGO".into(),
            sector_primary: "WaterTech".into(),
            outcome_status: "Active".into(),
            country: "Chile".into(),
            region: "Valparaíso".into(),
            city: "Viña del Mar".into(),
            description: Some("x".repeat(MIN_PUBLISH_DESCRIPTION_CHARS)),
            linkedin_url: Some("https://linkedin.com/company/acme".into()),
            ..Default::default()
        }
    }

    fn validator(pairs: &[(&str, &str)]) -> Validator {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap(),
        ));
        let store = Arc::new(MemoryTaxonomyStore::from_pairs(pairs));
        let cache = Arc::new(TaxonomyCache::new(store, clock.clone()));
        Validator::new(cache, clock)
    }

    // ── normalize ──

    #[test]
    fn trims_and_blanks_optionals() {
        let mut org = ready();
        org.id = "  acme ".into();
        org.city = " Viña del Mar\t".into();
        org.notes = Some("   ".into());
        org.website = Some(" https://acme.example ".into());
        normalize(&mut org, 2026).unwrap();

        assert_eq!(org.id, "acme");
        assert_eq!(org.city, "Viña del Mar");
        assert_eq!(org.notes, None);
        assert_eq!(org.website.as_deref(), Some("https://acme.example"));
    }

    #[test]
    fn missing_id_or_name() {
        let mut org = ready();
        org.name = "   ".into();
        let err = normalize(&mut org, 2026).unwrap_err();
        assert!(matches!(
            err,
            RegistryError::Invalid(ref m) if m.contains("missing required field")
        ));

        let mut org = ready();
        org.id = String::new();
        assert!(matches!(
            normalize(&mut org, 2026),
            Err(RegistryError::Invalid(_))
        ));
    }

    #[test]
    fn coordinates_must_be_paired() {
        let mut org = ready();
        org.lat = Some(-33.0);
        let err = normalize(&mut org, 2026).unwrap_err();
        assert!(matches!(
            err,
            RegistryError::Invalid(ref m) if m.contains("coordinates must be paired")
        ));

        let mut org = ready();
        org.lng = Some(-71.5);
        assert!(normalize(&mut org, 2026).is_err());

        let mut org = ready();
        org.lat = Some(-33.0);
        org.lng = Some(-71.5);
        assert!(normalize(&mut org, 2026).is_ok());

        let mut org = ready();
        assert!(normalize(&mut org, 2026).is_ok());
    }

    #[test]
    fn year_founded_bounds_follow_clock() {
        for (year, ok) in [(1799, false), (1800, true), (2026, true), (2027, false)] {
            let mut org = ready();
            org.year_founded = Some(year);
            assert_eq!(normalize(&mut org, 2026).is_ok(), ok, "year {}", year);
        }
        let mut org = ready();
        org.year_founded = Some(2027);
        assert!(normalize(&mut org, 2027).is_ok());
    }

    // ── taxonomy ──

    #[tokio::test]
    async fn rejects_values_outside_taxonomy() {
        let v = validator(&[("organizationType", "NGO"), ("technology", "IoT")]);
        let mut org = ready();
        org.technology = vec!["IoT".into(), "Blockchain".into()];
        let err = v.validate_for_write(&mut org).await.unwrap_err();
        assert!(matches!(
            err,
            RegistryError::Invalid(ref m) if m == "invalid technology: Blockchain"
        ));

        let mut org = ready();
        org.organization_type = "Cooperative".into();
        assert!(v.validate_for_write(&mut org).await.is_err());
    }

    #[tokio::test]
    async fn tags_and_undefined_categories_are_free() {
        let v = validator(&[("organizationType", "NGO")]);
        let mut org = ready();
        org.tags = vec!["anything goes".into()];
        org.badge = vec!["Unlisted".into()];
        org.stage = Some("Whatever".into());
        v.validate_for_write(&mut org).await.unwrap();
    }

    #[tokio::test]
    async fn year_check_uses_injected_clock() {
        let v = validator(&[]);
        let mut org = ready();
        org.year_founded = Some(2026);
        v.validate_for_write(&mut org).await.unwrap();
        org.year_founded = Some(2027);
        assert!(v.validate_for_write(&mut org).await.is_err());
    }

    // ── publish checklist ──

    #[test]
    fn description_threshold_is_exactly_twenty_chars() {
        let mut org = ready();
        org.description = Some("x".repeat(19));
        assert!(matches!(
            validate_for_publish(&org),
            Err(RegistryError::ValidationFailed(_))
        ));
        org.description = Some("x".repeat(20));
        assert!(validate_for_publish(&org).is_ok());

        // Characters, not bytes.
        org.description = Some("ñ".repeat(19));
        assert!(validate_for_publish(&org).is_err());
        org.description = None;
        assert!(validate_for_publish(&org).is_err());
    }

    #[test]
    fn needs_website_or_linkedin() {
        let mut org = ready();
        org.linkedin_url = None;
        assert!(validate_for_publish(&org).is_err());
        org.website = Some("https://acme.example".into());
        assert!(validate_for_publish(&org).is_ok());
    }

    #[test]
    fn startup_needs_stage() {
        for org_type in ["Startup", "startup", "STARTUP"] {
            let mut org = ready();
            org.organization_type = org_type.into();
            org.stage = None;
            assert!(validate_for_publish(&org).is_err(), "{}", org_type);
            org.stage = Some(String::new());
            assert!(validate_for_publish(&org).is_err(), "{}", org_type);
            org.stage = Some("Seed".into());
            assert!(validate_for_publish(&org).is_ok(), "{}", org_type);
        }
    }

    #[test]
    fn missing_geography_fails_publish() {
        let mut org = ready();
        org.region = String::new();
        let err = validate_for_publish(&org).unwrap_err();
        assert!(err.to_string().contains("geographic"));
    }
}
