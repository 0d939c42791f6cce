//! The organization record and its lifecycle status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

// ─── Lifecycle status ─────────────────────────────────────────

/// Editorial state of an organization.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    AsRefStr,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum OrganizationStatus {
    #[default]
    Draft,
    InReview,
    Published,
    Archived,
}

// ─── Organization ─────────────────────────────────────────────

/// A directory entry. `id` is supplied by the caller and never changes.
///
/// Deserialization is lenient about missing fields (they default to empty and are
/// caught by validation) but strict about unknown ones.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct Organization {
    pub id: String,
    pub name: String,
    pub organization_type: String,
    pub sector_primary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sector_secondary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    pub outcome_status: String,

    pub country: String,
    pub region: String,
    pub city: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year_founded: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linkedin_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instagram_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    /// Free-form labels, not validated against any taxonomy.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub technology: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub impact_area: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub badge: Vec<String>,

    pub status: OrganizationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Organization {
    pub fn is_mappable(&self) -> bool {
        self.lat.is_some() && self.lng.is_some()
    }
}
