//! Aggregation engine: value → count distributions for the six facet
//! dimensions, computed under the same criteria used for listing.

use std::collections::HashMap;

use strum::{EnumIter, IntoEnumIterator};

use crate::filter::FilterCriteria;
use crate::models::{AggregateItem, AggregatesResponse, Organization, OrganizationStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum Dimension {
    Country,
    SectorPrimary,
    SectorSecondary,
    OrganizationType,
    Stage,
    OutcomeStatus,
}

impl Dimension {
    pub fn column(self) -> &'static str {
        match self {
            Self::Country => "country",
            Self::SectorPrimary => "sector_primary",
            Self::SectorSecondary => "sector_secondary",
            Self::OrganizationType => "organization_type",
            Self::Stage => "stage",
            Self::OutcomeStatus => "outcome_status",
        }
    }

    /// Optional dimensions leave out records with no value.
    pub fn skips_empty(self) -> bool {
        matches!(self, Self::SectorSecondary | Self::Stage)
    }

    /// The record's value for this dimension, or `None` when it is excluded.
    pub fn value_of(self, org: &Organization) -> Option<&str> {
        let value = match self {
            Self::Country => Some(org.country.as_str()),
            Self::SectorPrimary => Some(org.sector_primary.as_str()),
            Self::SectorSecondary => org.sector_secondary.as_deref(),
            Self::OrganizationType => Some(org.organization_type.as_str()),
            Self::Stage => org.stage.as_deref(),
            Self::OutcomeStatus => Some(org.outcome_status.as_str()),
        };
        match value {
            Some(v) if self.skips_empty() && v.is_empty() => None,
            Some(v) => Some(v),
            None if self.skips_empty() => None,
            None => Some(""),
        }
    }
}

/// Criteria for aggregation: without an explicit status, only PUBLISHED
/// records are counted.
pub fn aggregation_criteria(mut criteria: FilterCriteria) -> FilterCriteria {
    if criteria.status.is_none() {
        criteria.status = Some(OrganizationStatus::Published.to_string());
    }
    criteria
}

/// Order by count descending, then value ascending.
pub fn sort_items(items: &mut [AggregateItem]) {
    items.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
}

/// Count one dimension over records that already satisfy the criteria.
pub fn count_dimension<'a>(
    dimension: Dimension,
    records: impl IntoIterator<Item = &'a Organization>,
) -> Vec<AggregateItem> {
    let mut counts: HashMap<&str, i64> = HashMap::new();
    for org in records {
        if let Some(value) = dimension.value_of(org) {
            *counts.entry(value).or_default() += 1;
        }
    }
    let mut items: Vec<AggregateItem> = counts
        .into_iter()
        .map(|(value, count)| AggregateItem {
            value: value.to_string(),
            count,
        })
        .collect();
    sort_items(&mut items);
    items
}

/// Build the full response from an already filtered record set.
pub fn compute(records: &[Organization]) -> AggregatesResponse {
    let mut response = AggregatesResponse::default();
    for dimension in Dimension::iter() {
        response.set(dimension, count_dimension(dimension, records));
    }
    response
}

impl AggregatesResponse {
    pub fn set(&mut self, dimension: Dimension, items: Vec<AggregateItem>) {
        match dimension {
            Dimension::Country => self.countries = items,
            Dimension::SectorPrimary => self.sectors_primary = items,
            Dimension::SectorSecondary => self.sectors_secondary = items,
            Dimension::OrganizationType => self.organization_types = items,
            Dimension::Stage => self.stages = items,
            Dimension::OutcomeStatus => self.outcome_statuses = items,
        }
    }

    pub fn get(&self, dimension: Dimension) -> &[AggregateItem] {
        match dimension {
            Dimension::Country => &self.countries,
            Dimension::SectorPrimary => &self.sectors_primary,
            Dimension::SectorSecondary => &self.sectors_secondary,
            Dimension::OrganizationType => &self.organization_types,
            Dimension::Stage => &self.stages,
            Dimension::OutcomeStatus => &self.outcome_statuses,
        }
    }
}
