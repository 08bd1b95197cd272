//! Database query functions for the `catalog_plans` table.

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{CatalogPlan, CatalogStatus};

/// Fields required to insert a catalog plan.
#[derive(Debug, Clone)]
pub struct NewCatalogPlan<'a> {
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub discipline: &'a str,
    pub duration_weeks: i32,
    pub tags: &'a [String],
    pub status: CatalogStatus,
    pub shape: &'a str,
    pub body: &'a serde_json::Value,
}

/// Insert a new catalog plan. Returns the stored row with server-generated
/// defaults (id, timestamps).
pub async fn insert_catalog_plan(pool: &PgPool, new: &NewCatalogPlan<'_>) -> Result<CatalogPlan> {
    let plan = sqlx::query_as::<_, CatalogPlan>(
        "INSERT INTO catalog_plans \
             (name, description, discipline, duration_weeks, tags, status, shape, body) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         RETURNING *",
    )
    .bind(new.name)
    .bind(new.description)
    .bind(new.discipline)
    .bind(new.duration_weeks)
    .bind(new.tags)
    .bind(new.status)
    .bind(new.shape)
    .bind(new.body)
    .fetch_one(pool)
    .await
    .with_context(|| format!("failed to insert catalog plan {:?}", new.name))?;

    Ok(plan)
}

/// Fetch a catalog plan by its ID.
pub async fn get_catalog_plan(pool: &PgPool, id: Uuid) -> Result<Option<CatalogPlan>> {
    let plan = sqlx::query_as::<_, CatalogPlan>("SELECT * FROM catalog_plans WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch catalog plan")?;

    Ok(plan)
}

/// List catalog plans, newest first, optionally restricted to one status.
pub async fn list_catalog_plans(
    pool: &PgPool,
    status: Option<CatalogStatus>,
) -> Result<Vec<CatalogPlan>> {
    let plans = match status {
        Some(status) => {
            sqlx::query_as::<_, CatalogPlan>(
                "SELECT * FROM catalog_plans WHERE status = $1 ORDER BY created_at DESC",
            )
            .bind(status)
            .fetch_all(pool)
            .await
        }
        None => {
            sqlx::query_as::<_, CatalogPlan>("SELECT * FROM catalog_plans ORDER BY created_at DESC")
                .fetch_all(pool)
                .await
        }
    }
    .context("failed to list catalog plans")?;

    Ok(plans)
}

/// Update the status of a catalog plan, bumping `updated_at`.
///
/// Returns the updated row. Fails if the plan does not exist.
pub async fn update_catalog_status(
    pool: &PgPool,
    id: Uuid,
    status: CatalogStatus,
) -> Result<CatalogPlan> {
    let plan = sqlx::query_as::<_, CatalogPlan>(
        "UPDATE catalog_plans SET status = $1, updated_at = now() WHERE id = $2 RETURNING *",
    )
    .bind(status)
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("failed to update catalog plan status")?;

    match plan {
        Some(p) => Ok(p),
        None => anyhow::bail!("catalog plan {id} not found"),
    }
}

/// Number of catalog plans in each status, in lifecycle order.
///
/// Statuses with no plans are reported as zero.
pub async fn count_by_status(pool: &PgPool) -> Result<Vec<(CatalogStatus, i64)>> {
    let rows: Vec<(CatalogStatus, i64)> =
        sqlx::query_as("SELECT status, COUNT(*) FROM catalog_plans GROUP BY status")
            .fetch_all(pool)
            .await
            .context("failed to count catalog plans by status")?;

    Ok(CatalogStatus::ALL
        .into_iter()
        .map(|status| {
            let count = rows
                .iter()
                .find(|(s, _)| *s == status)
                .map_or(0, |(_, n)| *n);
            (status, count)
        })
        .collect())
}
