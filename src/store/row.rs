//! Persisted shape of an organization.
//!
//! Multi-valued attributes are stored as JSON text. An empty list is stored as
//! NULL and NULL reads back as an empty list.

use std::str::FromStr;

use anyhow::{anyhow, Context};
use chrono::{DateTime, Utc};

use crate::models::{Organization, OrganizationStatus};

/// Column list shared by every SELECT, in [`OrganizationRow`] field order.
pub const ORGANIZATION_COLUMNS: &str = "id, name, organization_type, sector_primary, \
    sector_secondary, stage, outcome_status, country, region, city, lat, lng, website, \
    notes, status, created_at, updated_at, description, year_founded, logo_url, \
    linkedin_url, contact_email, contact_phone, instagram_url, tags_json, technology_json, \
    impact_area_json, badge_json";

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "database", derive(sqlx::FromRow))]
pub struct OrganizationRow {
    pub id: String,
    pub name: String,
    pub organization_type: String,
    pub sector_primary: String,
    pub sector_secondary: Option<String>,
    pub stage: Option<String>,
    pub outcome_status: String,
    pub country: String,
    pub region: String,
    pub city: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub website: Option<String>,
    pub notes: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub description: Option<String>,
    pub year_founded: Option<i32>,
    pub logo_url: Option<String>,
    pub linkedin_url: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub instagram_url: Option<String>,
    pub tags_json: Option<String>,
    pub technology_json: Option<String>,
    pub impact_area_json: Option<String>,
    pub badge_json: Option<String>,
}

pub fn encode_multi(values: &[String]) -> anyhow::Result<Option<String>> {
    if values.is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::to_string(values)?))
}

pub fn decode_multi(raw: Option<&str>) -> anyhow::Result<Vec<String>> {
    match raw.map(str::trim) {
        None | Some("") | Some("null") => Ok(Vec::new()),
        Some(json) => serde_json::from_str(json).context("decoding multi-valued column"),
    }
}

impl TryFrom<&Organization> for OrganizationRow {
    type Error = anyhow::Error;

    fn try_from(org: &Organization) -> anyhow::Result<Self> {
        Ok(Self {
            id: org.id.clone(),
            name: org.name.clone(),
            organization_type: org.organization_type.clone(),
            sector_primary: org.sector_primary.clone(),
            sector_secondary: org.sector_secondary.clone(),
            stage: org.stage.clone(),
            outcome_status: org.outcome_status.clone(),
            country: org.country.clone(),
            region: org.region.clone(),
            city: org.city.clone(),
            lat: org.lat,
            lng: org.lng,
            website: org.website.clone(),
            notes: org.notes.clone(),
            status: org.status.to_string(),
            created_at: org.created_at,
            updated_at: org.updated_at,
            description: org.description.clone(),
            year_founded: org.year_founded,
            logo_url: org.logo_url.clone(),
            linkedin_url: org.linkedin_url.clone(),
            contact_email: org.contact_email.clone(),
            contact_phone: org.contact_phone.clone(),
            instagram_url: org.instagram_url.clone(),
            tags_json: encode_multi(&org.tags)?,
            technology_json: encode_multi(&org.technology)?,
            impact_area_json: encode_multi(&org.impact_area)?,
            badge_json: encode_multi(&org.badge)?,
        })
    }
}

impl TryFrom<OrganizationRow> for Organization {
    type Error = anyhow::Error;

    fn try_from(row: OrganizationRow) -> anyhow::Result<Self> {
        let status = OrganizationStatus::from_str(&row.status)
            .map_err(|_| anyhow!("organization {} has unknown status {:?}", row.id, row.status))?;
        Ok(Self {
            tags: decode_multi(row.tags_json.as_deref())?,
            technology: decode_multi(row.technology_json.as_deref())?,
            impact_area: decode_multi(row.impact_area_json.as_deref())?,
            badge: decode_multi(row.badge_json.as_deref())?,
            id: row.id,
            name: row.name,
            organization_type: row.organization_type,
            sector_primary: row.sector_primary,
            sector_secondary: row.sector_secondary,
            stage: row.stage,
            outcome_status: row.outcome_status,
            country: row.country,
            region: row.region,
            city: row.city,
            lat: row.lat,
            lng: row.lng,
            website: row.website,
            notes: row.notes,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
            description: row.description,
            year_founded: row.year_founded,
            logo_url: row.logo_url,
            linkedin_url: row.linkedin_url,
            contact_email: row.contact_email,
            contact_phone: row.contact_phone,
            instagram_url: row.instagram_url,
        })
    }
}
