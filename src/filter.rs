//! Predicate builder.
//!
//! Query parameters arrive as an open string map. They are converted once, at
//! the boundary, into a closed [`FilterCriteria`] plus [`Pagination`]. Keys that
//! are not recognized are dropped here and never reach a store. The same
//! criteria drive listing and aggregation.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::{Organization, OrganizationStatus};

/// Inclusive latitude/longitude rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub min_lng: f64,
    pub max_lat: f64,
    pub max_lng: f64,
}

impl BoundingBox {
    /// Parse `minLat,minLng,maxLat,maxLng` as finite numbers. Anything else yields `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let parts: Vec<&str> = raw.split(',').collect();
        if parts.len() != 4 {
            return None;
        }
        let mut coords = [0f64; 4];
        for (slot, part) in coords.iter_mut().zip(&parts) {
            *slot = part
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())?;
        }
        Some(Self {
            min_lat: coords[0],
            min_lng: coords[1],
            max_lat: coords[2],
            max_lng: coords[3],
        })
    }

    pub fn contains(&self, lat: f64, lng: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat && lng >= self.min_lng && lng <= self.max_lng
    }
}

/// Conjunction of optional conditions. `None`/`false` means "no constraint".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterCriteria {
    /// Raw status string. Unknown values match nothing.
    pub status: Option<String>,
    pub country: Option<String>,
    pub sector_primary: Option<String>,
    pub sector_secondary: Option<String>,
    pub organization_type: Option<String>,
    pub stage: Option<String>,
    pub outcome_status: Option<String>,
    /// Case-insensitive substring over name, city, region, country, description.
    pub q: Option<String>,
    pub only_mappable: bool,
    pub bbox: Option<BoundingBox>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pagination {
    /// Never negative.
    pub limit: Option<i64>,
    /// Only meaningful together with `limit`. Never negative.
    pub offset: Option<i64>,
}

impl Pagination {
    /// Apply offset/limit to an already ordered sequence.
    pub fn apply<T>(&self, items: Vec<T>) -> Vec<T> {
        let Some(limit) = self.limit else {
            return items;
        };
        let offset = usize::try_from(self.offset.unwrap_or(0)).unwrap_or(usize::MAX);
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        items.into_iter().skip(offset).take(limit).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrganizationQuery {
    pub criteria: FilterCriteria,
    pub page: Pagination,
}

impl OrganizationQuery {
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        Self {
            criteria: FilterCriteria::from_params(params),
            page: Pagination::from_params(params),
        }
    }

    /// Same query with status pinned, whatever the caller asked for.
    pub fn with_status(mut self, status: OrganizationStatus) -> Self {
        self.criteria.status = Some(status.to_string());
        self
    }
}

fn non_empty(params: &HashMap<String, String>, key: &str) -> Option<String> {
    params.get(key).filter(|v| !v.is_empty()).cloned()
}

impl FilterCriteria {
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        Self {
            status: non_empty(params, "status"),
            country: non_empty(params, "country"),
            sector_primary: non_empty(params, "sectorPrimary"),
            sector_secondary: non_empty(params, "sectorSecondary"),
            organization_type: non_empty(params, "organizationType"),
            stage: non_empty(params, "stage"),
            outcome_status: non_empty(params, "outcomeStatus"),
            q: non_empty(params, "q"),
            only_mappable: params.get("onlyMappable").map(String::as_str) == Some("true"),
            bbox: params
                .get("bbox")
                .filter(|v| !v.is_empty())
                .and_then(|v| BoundingBox::parse(v)),
        }
    }

    /// Column-name/value pairs for the exact-match conditions, in a fixed order.
    pub fn exact_matches(&self) -> Vec<(&'static str, &str)> {
        [
            ("status", &self.status),
            ("country", &self.country),
            ("sector_primary", &self.sector_primary),
            ("sector_secondary", &self.sector_secondary),
            ("organization_type", &self.organization_type),
            ("stage", &self.stage),
            ("outcome_status", &self.outcome_status),
        ]
        .into_iter()
        .filter_map(|(column, value)| value.as_deref().map(|v| (column, v)))
        .collect()
    }

    /// Evaluate the predicate against one record.
    pub fn matches(&self, org: &Organization) -> bool {
        if let Some(status) = &self.status {
            if org.status.as_ref() != status {
                return false;
            }
        }
        if !eq(&self.country, &org.country)
            || !eq(&self.sector_primary, &org.sector_primary)
            || !eq(&self.organization_type, &org.organization_type)
            || !eq(&self.outcome_status, &org.outcome_status)
            || !eq_opt(&self.sector_secondary, &org.sector_secondary)
            || !eq_opt(&self.stage, &org.stage)
        {
            return false;
        }

        if let Some(q) = &self.q {
            let needle = q.to_lowercase();
            let hit = [
                Some(org.name.as_str()),
                Some(org.city.as_str()),
                Some(org.region.as_str()),
                Some(org.country.as_str()),
                org.description.as_deref(),
            ]
            .into_iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }

        if self.only_mappable && !org.is_mappable() {
            return false;
        }

        if let Some(bbox) = &self.bbox {
            match (org.lat, org.lng) {
                (Some(lat), Some(lng)) if bbox.contains(lat, lng) => {}
                _ => return false,
            }
        }

        true
    }
}

fn eq(wanted: &Option<String>, actual: &str) -> bool {
    wanted.as_deref().map_or(true, |w| w == actual)
}

fn eq_opt(wanted: &Option<String>, actual: &Option<String>) -> bool {
    wanted
        .as_deref()
        .map_or(true, |w| actual.as_deref() == Some(w))
}

impl Pagination {
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let limit = non_negative(params, "limit");
        let offset = limit.and(non_negative(params, "offset"));
        Self { limit, offset }
    }
}

/// An integer in `0..=i64::MAX`; anything else is dropped.
fn non_negative(params: &HashMap<String, String>, key: &str) -> Option<i64> {
    params
        .get(key)
        .and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|n| *n >= 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn org(id: &str, country: &str, status: OrganizationStatus) -> Organization {
        Organization {
            id: id.into(),
            name: format!("Org {}", id),
            organization_type: "NGO".into(),
            sector_primary: "HealthTech".into(),
            outcome_status: "Active".into(),
            country: country.into(),
            region: "Metropolitana".into(),
            city: "Santiago".into(),
            status,
            ..Default::default()
        }
    }

    fn corpus() -> Vec<Organization> {
        let mut a = org("a", "Chile", OrganizationStatus::Published);
        a.description = Some("Digital HEALTH records".into());
        a.lat = Some(-33.45);
        a.lng = Some(-70.66);
        let mut b = org("b", "Chile", OrganizationStatus::Draft);
        b.description = Some("health clinic network".into());
        let mut c = org("c", "Peru", OrganizationStatus::Published);
        c.description = Some("health".into());
        c.stage = Some("Seed".into());
        let mut d = org("d", "Chile", OrganizationStatus::Published);
        d.description = Some("water sensors".into());
        d.sector_secondary = Some("IoT".into());
        vec![a, b, c, d]
    }

    fn ids(criteria: &FilterCriteria) -> Vec<String> {
        corpus()
            .into_iter()
            .filter(|o| criteria.matches(o))
            .map(|o| o.id)
            .collect()
    }

    #[test]
    fn conjunction_of_status_country_and_q() {
        let c = FilterCriteria::from_params(&params(&[
            ("status", "PUBLISHED"),
            ("country", "Chile"),
            ("q", "health"),
        ]));
        assert_eq!(ids(&c), vec!["a"]);
    }

    #[test]
    fn q_searches_every_text_field_case_insensitively() {
        let c = FilterCriteria::from_params(&params(&[("q", "SANTIAGO")]));
        assert_eq!(ids(&c).len(), 4);
        let c = FilterCriteria::from_params(&params(&[("q", "metropolitana")]));
        assert_eq!(ids(&c).len(), 4);
        let c = FilterCriteria::from_params(&params(&[("q", "org c")]));
        assert_eq!(ids(&c), vec!["c"]);
    }

    #[test]
    fn optional_dimensions_require_presence() {
        let c = FilterCriteria::from_params(&params(&[("stage", "Seed")]));
        assert_eq!(ids(&c), vec!["c"]);
        let c = FilterCriteria::from_params(&params(&[("sectorSecondary", "IoT")]));
        assert_eq!(ids(&c), vec!["d"]);
    }

    #[test]
    fn empty_values_are_no_constraint() {
        let c = FilterCriteria::from_params(&params(&[("country", ""), ("status", "")]));
        assert_eq!(c, FilterCriteria::default());
    }

    #[test]
    fn unknown_status_matches_nothing() {
        let c = FilterCriteria::from_params(&params(&[("status", "DELETED")]));
        assert!(ids(&c).is_empty());
    }

    #[test]
    fn only_mappable_needs_both_coordinates() {
        let c = FilterCriteria::from_params(&params(&[("onlyMappable", "true")]));
        assert_eq!(ids(&c), vec!["a"]);
        let c = FilterCriteria::from_params(&params(&[("onlyMappable", "yes")]));
        assert!(!c.only_mappable);
    }

    #[test]
    fn bbox_is_inclusive() {
        let c = FilterCriteria::from_params(&params(&[("bbox", "-33.45,-70.66,-33.0,-70.0")]));
        assert_eq!(ids(&c), vec!["a"]);
        let c = FilterCriteria::from_params(&params(&[("bbox", "-40,-80,-34,-60")]));
        assert!(ids(&c).is_empty());
    }

    #[test]
    fn malformed_bbox_is_ignored() {
        for raw in ["1,2,3", "1,2,3,4,5", "a,b,c,d", "", "1,,3,4"] {
            let c = FilterCriteria::from_params(&params(&[("bbox", raw)]));
            assert_eq!(c.bbox, None, "{:?}", raw);
        }
    }

    #[test]
    fn non_finite_bbox_is_ignored() {
        for raw in ["nan,-80,-30,-60", "-40,-inf,-30,-60", "-40,-80,inf,-60", "-40,-80,-30,NaN"] {
            let c = FilterCriteria::from_params(&params(&[("bbox", raw)]));
            assert_eq!(c.bbox, None, "{:?}", raw);
        }
    }

    #[test]
    fn out_of_range_pagination_is_ignored() {
        let p = Pagination::from_params(&params(&[
            ("limit", "9223372036854775808"),
            ("offset", "2"),
        ]));
        assert_eq!(p, Pagination::default());

        let p = Pagination::from_params(&params(&[
            ("limit", "5"),
            ("offset", "18446744073709551615"),
        ]));
        assert_eq!(p, Pagination { limit: Some(5), offset: None });

        let p = Pagination::from_params(&params(&[("limit", "-1"), ("offset", "0")]));
        assert_eq!(p, Pagination::default());

        let p = Pagination::from_params(&params(&[("limit", "9223372036854775807")]));
        assert_eq!(p.limit, Some(i64::MAX));
        assert_eq!(p.apply(vec![1, 2, 3]), vec![1, 2, 3]);
    }

    #[test]
    fn pagination_parsing() {
        let p = Pagination::from_params(&params(&[("limit", "10"), ("offset", "20")]));
        assert_eq!(p, Pagination { limit: Some(10), offset: Some(20) });

        // Offset alone does nothing.
        let p = Pagination::from_params(&params(&[("offset", "20")]));
        assert_eq!(p, Pagination::default());

        let p = Pagination::from_params(&params(&[("limit", "ten"), ("offset", "2")]));
        assert_eq!(p, Pagination::default());

        let p = Pagination::from_params(&params(&[("limit", "5"), ("offset", "x")]));
        assert_eq!(p, Pagination { limit: Some(5), offset: None });
    }

    #[test]
    fn pagination_apply() {
        let items: Vec<u32> = (0..10).collect();
        let p = Pagination { limit: Some(3), offset: Some(8) };
        assert_eq!(p.apply(items.clone()), vec![8, 9]);
        assert_eq!(Pagination::default().apply(items.clone()).len(), 10);
    }

    #[test]
    fn with_status_overrides_supplied_value() {
        let q = OrganizationQuery::from_params(&params(&[("status", "DRAFT")]))
            .with_status(OrganizationStatus::Published);
        assert_eq!(q.criteria.status.as_deref(), Some("PUBLISHED"));
    }

    #[test]
    fn exact_matches_lists_set_columns() {
        let c = FilterCriteria::from_params(&params(&[("country", "Chile"), ("stage", "Seed")]));
        assert_eq!(c.exact_matches(), vec![("country", "Chile"), ("stage", "Seed")]);
    }

    proptest! {
        #[test]
        fn unrecognized_keys_never_change_result(
            key in "[a-z]{1,12}",
            value in ".{0,16}",
        ) {
            let known = [
                "status", "country", "sectorprimary", "sectorsecondary",
                "organizationtype", "stage", "outcomestatus", "q",
                "onlymappable", "bbox", "limit", "offset",
            ];
            prop_assume!(!known.contains(&key.as_str()));

            let base = params(&[("status", "PUBLISHED"), ("country", "Chile"), ("q", "health")]);
            let mut extended = base.clone();
            extended.insert(key, value);

            prop_assert_eq!(
                OrganizationQuery::from_params(&base),
                OrganizationQuery::from_params(&extended)
            );
        }
    }
}
