use serde::{Deserialize, Serialize};

/// A dimension value and how many organizations carry it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateItem {
    pub value: String,
    pub count: i64,
}

/// Value distributions for every facet shown on the public map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatesResponse {
    pub countries: Vec<AggregateItem>,
    pub sectors_primary: Vec<AggregateItem>,
    pub sectors_secondary: Vec<AggregateItem>,
    pub organization_types: Vec<AggregateItem>,
    pub stages: Vec<AggregateItem>,
    pub outcome_statuses: Vec<AggregateItem>,
}
