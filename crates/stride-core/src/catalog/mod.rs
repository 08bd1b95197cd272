//! Catalog service layer.
//!
//! Derives catalog metadata from a compiled plan and hands both to the
//! catalog store.

use anyhow::{Context, Result};
use sqlx::PgPool;
use tracing::info;

use stride_db::models::{CatalogPlan, CatalogStatus};
use stride_db::queries::catalog::{self as catalog_queries, NewCatalogPlan};

use crate::plan::{CatalogDiscipline, CompiledPlan};

/// Metadata stored alongside a finished plan.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogMetadata {
    pub name: String,
    pub description: Option<String>,
    pub discipline: CatalogDiscipline,
    pub duration_weeks: u32,
    pub tags: Vec<String>,
    pub status: CatalogStatus,
}

impl CatalogMetadata {
    /// Derive metadata from a compiled plan.
    ///
    /// Tags are trimmed, lowercased, deduplicated and sorted; blank tags are
    /// dropped.
    pub fn from_compiled(plan: &CompiledPlan, tags: &[String], status: CatalogStatus) -> Self {
        let mut tags: Vec<String> = tags
            .iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        tags.sort();
        tags.dedup();

        Self {
            name: plan.name().to_string(),
            description: plan.description().map(str::to_owned),
            discipline: plan.discipline(),
            duration_weeks: plan.duration_weeks(),
            tags,
            status,
        }
    }
}

/// Persist a compiled plan in the catalog.
pub async fn publish_plan(
    pool: &PgPool,
    plan: &CompiledPlan,
    tags: &[String],
    status: CatalogStatus,
) -> Result<CatalogPlan> {
    let meta = CatalogMetadata::from_compiled(plan, tags, status);
    let body = serde_json::to_value(plan).context("failed to serialize compiled plan")?;
    let discipline = meta.discipline.to_string();
    let duration_weeks =
        i32::try_from(meta.duration_weeks).context("duration_weeks does not fit the catalog")?;

    let stored = catalog_queries::insert_catalog_plan(
        pool,
        &NewCatalogPlan {
            name: &meta.name,
            description: meta.description.as_deref(),
            discipline: &discipline,
            duration_weeks,
            tags: &meta.tags,
            status: meta.status,
            shape: plan.shape(),
            body: &body,
        },
    )
    .await?;

    info!(id = %stored.id, name = %stored.name, status = %stored.status, "plan stored in catalog");
    Ok(stored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::macros::MacroTable;
    use crate::plan::{StrictSchemaValidator, compile_plan};
    use serde_json::json;

    #[test]
    fn metadata_from_sessions_plan() {
        let raw = json!({
            "name": "Gran fondo",
            "description": "Long rides",
            "duration_weeks": 3,
            "sessions_by_week": {"1": [{"day": "Saturday", "discipline": "ride", "duration": 240}]}
        });
        let compiled = compile_plan(&raw, &StrictSchemaValidator::new(), MacroTable::builtin())
            .unwrap()
            .plan;
        let tags = vec![" Endurance ".to_string(), "endurance".into(), "".into(), "ride".into()];
        let meta = CatalogMetadata::from_compiled(&compiled, &tags, CatalogStatus::Published);
        assert_eq!(
            meta,
            CatalogMetadata {
                name: "Gran fondo".into(),
                description: Some("Long rides".into()),
                discipline: CatalogDiscipline::Ride,
                duration_weeks: 3,
                tags: vec!["endurance".into(), "ride".into()],
                status: CatalogStatus::Published,
            }
        );
    }

    #[test]
    fn metadata_from_blueprint() {
        let raw = json!({
            "name": "Tri",
            "min_weeks": 10,
            "max_weeks": 20,
            "phase_blueprint": {"order": ["base", "build"]}
        });
        let compiled = compile_plan(&raw, &StrictSchemaValidator::new(), MacroTable::builtin())
            .unwrap()
            .plan;
        let meta = CatalogMetadata::from_compiled(&compiled, &[], CatalogStatus::Draft);
        assert_eq!(meta.discipline, CatalogDiscipline::Triathlon);
        assert_eq!(meta.duration_weeks, 20);
        assert!(meta.tags.is_empty());
    }
}
