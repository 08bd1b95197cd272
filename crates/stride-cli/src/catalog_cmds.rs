//! CLI handlers for `stride catalog` subcommands.
//!
//! Implements:
//! - `stride catalog publish <file>`         -- compile and store a plan
//! - `stride catalog list [--status S]`      -- list stored plans
//! - `stride catalog show <id>`              -- show one plan and its body
//! - `stride catalog set-status <id> <S>`    -- change a plan's status

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use stride_core::catalog::publish_plan;
use stride_db::models::{CatalogPlan, CatalogStatus};
use stride_db::queries::catalog as catalog_queries;

use crate::CatalogCommands;
use crate::config::StrideConfig;
use crate::plan_cmds::compile_file;

/// Dispatch a `CatalogCommands` variant to the appropriate handler.
pub async fn run_catalog_command(
    command: CatalogCommands,
    pool: &PgPool,
    config: &StrideConfig,
) -> Result<()> {
    match command {
        CatalogCommands::Publish {
            file,
            format,
            tags,
            status,
        } => {
            let compiled = compile_file(config, &file, format)?;
            let stored = publish_plan(pool, &compiled.plan, &tags, status).await?;
            println!("Plan stored in catalog.");
            println!();
            print_details(&stored);
            Ok(())
        }
        CatalogCommands::List { status } => cmd_list(pool, status).await,
        CatalogCommands::Show { id } => cmd_show(pool, &id).await,
        CatalogCommands::SetStatus { id, status } => {
            let id = parse_id(&id)?;
            let plan = catalog_queries::update_catalog_status(pool, id, status).await?;
            println!("Catalog plan {} is now {}.", plan.id, plan.status);
            Ok(())
        }
    }
}

fn parse_id(id: &str) -> Result<Uuid> {
    id.parse()
        .with_context(|| format!("invalid catalog plan ID: {id:?}"))
}

fn print_details(plan: &CatalogPlan) {
    println!("  ID:          {}", plan.id);
    println!("  Name:        {}", plan.name);
    if let Some(desc) = &plan.description {
        println!("  Description: {desc}");
    }
    println!("  Discipline:  {}", plan.discipline);
    println!("  Weeks:       {}", plan.duration_weeks);
    println!("  Shape:       {}", plan.shape);
    println!("  Status:      {}", plan.status);
    if !plan.tags.is_empty() {
        println!("  Tags:        {}", plan.tags.join(", "));
    }
    println!(
        "  Created:     {}",
        plan.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!(
        "  Updated:     {}",
        plan.updated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
}

async fn cmd_list(pool: &PgPool, status: Option<CatalogStatus>) -> Result<()> {
    let plans = catalog_queries::list_catalog_plans(pool, status).await?;

    if plans.is_empty() {
        println!("No catalog plans found. Use `stride catalog publish <file>` to add one.");
        return Ok(());
    }

    let id_w = 36;
    let name_w = plans.iter().map(|p| p.name.len()).max().unwrap_or(4).max(4);
    let disc_w = 10;
    let status_w = 9;

    println!(
        "{:<id_w$}  {:<name_w$}  {:<disc_w$}  {:<status_w$}  {:>5}  CREATED",
        "ID", "NAME", "DISCIPLINE", "STATUS", "WEEKS",
    );
    for plan in &plans {
        println!(
            "{:<id_w$}  {:<name_w$}  {:<disc_w$}  {:<status_w$}  {:>5}  {}",
            plan.id,
            plan.name,
            plan.discipline,
            plan.status,
            plan.duration_weeks,
            plan.created_at.format("%Y-%m-%d %H:%M"),
        );
    }

    Ok(())
}

async fn cmd_show(pool: &PgPool, id: &str) -> Result<()> {
    let id = parse_id(id)?;
    let plan = catalog_queries::get_catalog_plan(pool, id)
        .await?
        .with_context(|| format!("catalog plan {id} not found"))?;

    println!("Catalog plan: {}", plan.name);
    print_details(&plan);
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(&plan.body).context("failed to render plan body")?
    );
    Ok(())
}
