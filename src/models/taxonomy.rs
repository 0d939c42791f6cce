use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One controlled-vocabulary entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Taxonomy {
    pub id: i64,
    pub category: String,
    pub value: String,
    pub label: String,
    pub sort_order: i32,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// Category name → entries of that category.
pub type GroupedTaxonomies = BTreeMap<String, Vec<Taxonomy>>;

/// Group entries by category, each group ordered by sort order then label.
pub fn group_by_category(items: impl IntoIterator<Item = Taxonomy>) -> GroupedTaxonomies {
    let mut grouped = GroupedTaxonomies::new();
    for item in items {
        grouped.entry(item.category.clone()).or_default().push(item);
    }
    for entries in grouped.values_mut() {
        entries.sort_by(|a, b| {
            a.sort_order
                .cmp(&b.sort_order)
                .then_with(|| a.label.cmp(&b.label))
        });
    }
    grouped
}

/// Category names the validation engine checks against.
pub mod category {
    pub const ORGANIZATION_TYPE: &str = "organizationType";
    pub const SECTOR_PRIMARY: &str = "sectorPrimary";
    pub const SECTOR_SECONDARY: &str = "sectorSecondary";
    pub const STAGE: &str = "stage";
    pub const OUTCOME_STATUS: &str = "outcomeStatus";
    pub const TECHNOLOGY: &str = "technology";
    pub const IMPACT_AREA: &str = "impactArea";
    pub const BADGE: &str = "badge";
}
