//! Postgres implementations of the store, taxonomy and audit ports.
//!
//! Each adapter is a newtype wrapping PgPool. All SQL is runtime-checked
//! (sqlx::query, not sqlx::query!) to avoid compile-time DB requirement.

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use strum::IntoEnumIterator;
use tracing::debug;

use crate::aggregates::Dimension;
use crate::audit::{AuditEvent, AuditSink};
use crate::error::{RegistryError, Result};
use crate::filter::{FilterCriteria, OrganizationQuery};
use crate::models::{AggregateItem, AggregatesResponse, Organization, OrganizationStatus, Taxonomy};
use crate::store::row::{OrganizationRow, ORGANIZATION_COLUMNS};
use crate::store::OrganizationStore;
use crate::taxonomy::TaxonomyStore;

/// Escape `%`, `_` and `\` so the value matches literally inside ILIKE.
pub fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Append ` AND ...` conditions for `criteria` to a query ending in `WHERE 1=1`.
pub fn push_criteria(qb: &mut QueryBuilder<'_, Postgres>, criteria: &FilterCriteria) {
    for (column, value) in criteria.exact_matches() {
        qb.push(" AND ").push(column).push(" = ");
        qb.push_bind(value.to_string());
    }

    if let Some(q) = &criteria.q {
        let pattern = format!("%{}%", escape_like(q));
        qb.push(" AND (");
        for (i, column) in ["name", "city", "region", "country", "description"]
            .iter()
            .enumerate()
        {
            if i > 0 {
                qb.push(" OR ");
            }
            qb.push(*column).push(" ILIKE ");
            qb.push_bind(pattern.clone());
        }
        qb.push(")");
    }

    if criteria.only_mappable {
        qb.push(" AND lat IS NOT NULL AND lng IS NOT NULL");
    }

    if let Some(bbox) = &criteria.bbox {
        qb.push(" AND lat >= ").push_bind(bbox.min_lat);
        qb.push(" AND lng >= ").push_bind(bbox.min_lng);
        qb.push(" AND lat <= ").push_bind(bbox.max_lat);
        qb.push(" AND lng <= ").push_bind(bbox.max_lng);
    }
}

/// One dimension's `GROUP BY` under `criteria`. Ties are broken on byte order
/// (`COLLATE "C"`), matching `aggregates::sort_items`.
pub fn dimension_query(
    dimension: Dimension,
    criteria: &FilterCriteria,
) -> QueryBuilder<'static, Postgres> {
    let column = dimension.column();
    let mut qb = QueryBuilder::<Postgres>::new(format!(
        "SELECT {column} AS value, COUNT(*) AS count FROM organizations WHERE 1=1"
    ));
    push_criteria(&mut qb, criteria);
    if dimension.skips_empty() {
        qb.push(format!(" AND {column} IS NOT NULL AND {column} <> ''"));
    }
    qb.push(format!(
        " GROUP BY {column} ORDER BY count DESC, {column} COLLATE \"C\" ASC"
    ));
    qb
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

// ── PgOrganizationStore ───────────────────────────────────────

pub struct PgOrganizationStore {
    pool: PgPool,
}

impl PgOrganizationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_one(
        &self,
        id: &str,
        status: Option<OrganizationStatus>,
    ) -> Result<Option<Organization>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM organizations WHERE id = ",
            ORGANIZATION_COLUMNS
        ));
        qb.push_bind(id.to_string());
        if let Some(status) = status {
            qb.push(" AND status = ").push_bind(status.to_string());
        }
        let row = qb
            .build_query_as::<OrganizationRow>()
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch organization")?;
        Ok(row.map(Organization::try_from).transpose()?)
    }

    async fn fetch_dimension(
        &self,
        dimension: Dimension,
        criteria: &FilterCriteria,
    ) -> Result<Vec<AggregateItem>> {
        let column = dimension.column();
        let rows = dimension_query(dimension, criteria)
            .build_query_as::<(Option<String>, i64)>()
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("Failed to aggregate {}", column))?;
        Ok(rows
            .into_iter()
            .map(|(value, count)| AggregateItem {
                value: value.unwrap_or_default(),
                count,
            })
            .collect())
    }

    fn expect_row(affected: u64, id: &str) -> Result<()> {
        if affected == 0 {
            Err(RegistryError::not_found(id))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl OrganizationStore for PgOrganizationStore {
    async fn create(&self, org: &Organization) -> Result<()> {
        let row = OrganizationRow::try_from(org)?;
        let result = sqlx::query(
            r#"
            INSERT INTO organizations (
                id, name, organization_type, sector_primary, sector_secondary,
                stage, outcome_status, country, region, city,
                lat, lng, website, notes, status, created_at, updated_at,
                description, year_founded, logo_url, linkedin_url, contact_email,
                contact_phone, instagram_url, tags_json, technology_json,
                impact_area_json, badge_json
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                $11, $12, $13, $14, $15, $16, $17, $18, $19, $20,
                $21, $22, $23, $24, $25, $26, $27, $28
            )
            "#,
        )
        .bind(&row.id)
        .bind(&row.name)
        .bind(&row.organization_type)
        .bind(&row.sector_primary)
        .bind(&row.sector_secondary)
        .bind(&row.stage)
        .bind(&row.outcome_status)
        .bind(&row.country)
        .bind(&row.region)
        .bind(&row.city)
        .bind(row.lat)
        .bind(row.lng)
        .bind(&row.website)
        .bind(&row.notes)
        .bind(&row.status)
        .bind(row.created_at)
        .bind(row.updated_at)
        .bind(&row.description)
        .bind(row.year_founded)
        .bind(&row.logo_url)
        .bind(&row.linkedin_url)
        .bind(&row.contact_email)
        .bind(&row.contact_phone)
        .bind(&row.instagram_url)
        .bind(&row.tags_json)
        .bind(&row.technology_json)
        .bind(&row.impact_area_json)
        .bind(&row.badge_json)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(RegistryError::AlreadyExists(row.id)),
            Err(e) => Err(anyhow!(e).context("Failed to insert organization").into()),
        }
    }

    async fn update(&self, org: &Organization) -> Result<()> {
        let row = OrganizationRow::try_from(org)?;
        let result = sqlx::query(
            r#"
            UPDATE organizations SET
                name = $2, organization_type = $3, sector_primary = $4,
                sector_secondary = $5, stage = $6, outcome_status = $7,
                country = $8, region = $9, city = $10, lat = $11, lng = $12,
                website = $13, notes = $14, description = $15, year_founded = $16,
                logo_url = $17, linkedin_url = $18, contact_email = $19,
                contact_phone = $20, instagram_url = $21, tags_json = $22,
                technology_json = $23, impact_area_json = $24, badge_json = $25,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(&row.id)
        .bind(&row.name)
        .bind(&row.organization_type)
        .bind(&row.sector_primary)
        .bind(&row.sector_secondary)
        .bind(&row.stage)
        .bind(&row.outcome_status)
        .bind(&row.country)
        .bind(&row.region)
        .bind(&row.city)
        .bind(row.lat)
        .bind(row.lng)
        .bind(&row.website)
        .bind(&row.notes)
        .bind(&row.description)
        .bind(row.year_founded)
        .bind(&row.logo_url)
        .bind(&row.linkedin_url)
        .bind(&row.contact_email)
        .bind(&row.contact_phone)
        .bind(&row.instagram_url)
        .bind(&row.tags_json)
        .bind(&row.technology_json)
        .bind(&row.impact_area_json)
        .bind(&row.badge_json)
        .execute(&self.pool)
        .await
        .context("Failed to update organization")?;
        Self::expect_row(result.rows_affected(), &row.id)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Organization>> {
        self.find_one(id, None).await
    }

    async fn find_published_by_id(&self, id: &str) -> Result<Option<Organization>> {
        self.find_one(id, Some(OrganizationStatus::Published)).await
    }

    async fn find_filtered(&self, query: &OrganizationQuery) -> Result<Vec<Organization>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM organizations WHERE 1=1",
            ORGANIZATION_COLUMNS
        ));
        push_criteria(&mut qb, &query.criteria);
        qb.push(" ORDER BY updated_at DESC");
        if let Some(limit) = query.page.limit {
            qb.push(" LIMIT ").push_bind(limit);
            if let Some(offset) = query.page.offset {
                qb.push(" OFFSET ").push_bind(offset);
            }
        }
        debug!(sql = qb.sql(), "organization query");

        let rows = qb
            .build_query_as::<OrganizationRow>()
            .fetch_all(&self.pool)
            .await
            .context("Failed to list organizations")?;
        rows.into_iter()
            .map(|row| Organization::try_from(row).map_err(RegistryError::from))
            .collect()
    }

    async fn aggregate(&self, criteria: &FilterCriteria) -> Result<AggregatesResponse> {
        let mut response = AggregatesResponse::default();
        for dimension in Dimension::iter() {
            let items = self.fetch_dimension(dimension, criteria).await?;
            response.set(dimension, items);
        }
        Ok(response)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM organizations WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete organization")?;
        Self::expect_row(result.rows_affected(), id)
    }

    async fn update_status(&self, id: &str, status: OrganizationStatus) -> Result<()> {
        let result =
            sqlx::query("UPDATE organizations SET status = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(status.as_ref())
                .execute(&self.pool)
                .await
                .context("Failed to update organization status")?;
        Self::expect_row(result.rows_affected(), id)
    }

    async fn update_coordinates(&self, id: &str, lat: f64, lng: f64) -> Result<()> {
        let result = sqlx::query(
            "UPDATE organizations SET lat = $2, lng = $3, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(lat)
        .bind(lng)
        .execute(&self.pool)
        .await
        .context("Failed to update organization coordinates")?;
        Self::expect_row(result.rows_affected(), id)
    }
}

// ── PgTaxonomyStore ───────────────────────────────────────────

pub struct PgTaxonomyStore {
    pool: PgPool,
}

impl PgTaxonomyStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

type TaxonomyTuple = (i64, String, String, String, i32, bool);

fn taxonomy_from(row: TaxonomyTuple) -> Taxonomy {
    let (id, category, value, label, sort_order, is_active) = row;
    Taxonomy {
        id,
        category,
        value,
        label,
        sort_order,
        is_active,
    }
}

#[async_trait]
impl TaxonomyStore for PgTaxonomyStore {
    async fn find_all_active(&self) -> anyhow::Result<Vec<Taxonomy>> {
        let rows = sqlx::query_as::<_, TaxonomyTuple>(
            r#"
            SELECT id, category, value, COALESCE(label, value), sort_order, is_active
            FROM taxonomies
            WHERE is_active = true
            ORDER BY category, sort_order, label
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to load taxonomies")?;
        Ok(rows.into_iter().map(taxonomy_from).collect())
    }
}

// ── PgAuditSink ───────────────────────────────────────────────

pub struct PgAuditSink {
    pool: PgPool,
}

impl PgAuditSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditSink for PgAuditSink {
    async fn record(&self, event: &AuditEvent) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_logs
                (entity_type, entity_id, action, from_status, to_status, performed_by, performed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&event.entity_type)
        .bind(&event.entity_id)
        .bind(event.action.as_ref())
        .bind(&event.from_status)
        .bind(&event.to_status)
        .bind(&event.performed_by)
        .bind(event.performed_at)
        .execute(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::BoundingBox;

    #[test]
    fn like_escaping() {
        assert_eq!(escape_like("100%_a\\b"), "100\\%\\_a\\\\b");
        assert_eq!(escape_like("health"), "health");
    }

    #[test]
    fn criteria_render_bound_conditions() {
        let criteria = FilterCriteria {
            status: Some("PUBLISHED".into()),
            country: Some("Chile".into()),
            q: Some("agua".into()),
            only_mappable: true,
            bbox: Some(BoundingBox {
                min_lat: -40.0,
                min_lng: -75.0,
                max_lat: -30.0,
                max_lng: -70.0,
            }),
            ..Default::default()
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT id FROM organizations WHERE 1=1");
        push_criteria(&mut qb, &criteria);
        let sql = qb.sql();

        assert!(sql.contains("AND status = $1"));
        assert!(sql.contains("AND country = $2"));
        assert!(sql.contains(
            "(name ILIKE $3 OR city ILIKE $4 OR region ILIKE $5 \
             OR country ILIKE $6 OR description ILIKE $7)"
        ));
        assert!(sql.contains("lat IS NOT NULL AND lng IS NOT NULL"));
        assert!(sql.contains("AND lat >= $8 AND lng >= $9 AND lat <= $10 AND lng <= $11"));
    }

    #[test]
    fn dimension_ties_break_on_byte_order() {
        let qb = dimension_query(Dimension::Stage, &FilterCriteria::default());
        let sql = qb.sql();
        assert!(sql.contains("AND stage IS NOT NULL AND stage <> ''"));
        assert!(sql.ends_with("GROUP BY stage ORDER BY count DESC, stage COLLATE \"C\" ASC"));
    }

    #[test]
    fn empty_criteria_add_nothing() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT id FROM organizations WHERE 1=1");
        push_criteria(&mut qb, &FilterCriteria::default());
        assert_eq!(qb.sql(), "SELECT id FROM organizations WHERE 1=1");
    }
}
