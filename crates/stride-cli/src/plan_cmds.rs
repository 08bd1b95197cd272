//! CLI handlers for `stride plan` subcommands.
//!
//! Implements:
//! - `stride plan compile <file>` -- compile and print normalized JSON
//! - `stride plan check <file>`   -- compile and print a summary
//! - `stride plan remap <file>`   -- compile, then relocate long sessions

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use stride_core::macros::MacroTable;
use stride_core::plan::{
    Compiled, CompiledPlan, PlanFormat, RemapPreferences, StrictSchemaValidator, Weekday,
    compile_plan, parse_plan_source,
};

use crate::PlanCommands;
use crate::config::StrideConfig;

// -----------------------------------------------------------------------
// Public entry point
// -----------------------------------------------------------------------

/// Dispatch a `PlanCommands` variant to the appropriate handler.
pub fn run_plan_command(command: PlanCommands, config: &StrideConfig) -> Result<()> {
    match command {
        PlanCommands::Compile {
            file,
            format,
            output,
        } => cmd_compile(config, &file, format, output.as_deref()),
        PlanCommands::Check { file, format } => cmd_check(config, &file, format),
        PlanCommands::Remap {
            file,
            format,
            long_run_day,
            long_ride_day,
            no_strength,
            output,
        } => {
            let prefs = merge_preferences(&config.remap, long_run_day, long_ride_day, no_strength);
            cmd_remap(config, &file, format, &prefs, output.as_deref())
        }
    }
}

// -----------------------------------------------------------------------
// Shared helpers
// -----------------------------------------------------------------------

/// Read plan source text from a path, or from stdin when `file` is `-`.
///
/// Returns the text and the format implied by the file extension, if any.
fn read_source(file: &str) -> Result<(String, Option<PlanFormat>)> {
    if file == "-" {
        let mut content = String::new();
        std::io::stdin()
            .read_to_string(&mut content)
            .context("failed to read plan from stdin")?;
        return Ok((content, None));
    }

    let content = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read plan file: {file}"))?;
    Ok((content, PlanFormat::from_path(Path::new(file))))
}

/// Acquire and compile a plan.
pub(crate) fn compile_file(
    config: &StrideConfig,
    file: &str,
    format: Option<PlanFormat>,
) -> Result<Compiled> {
    let (content, detected) = read_source(file)?;
    let raw = parse_plan_source(&content, format.or(detected))
        .with_context(|| format!("failed to parse plan: {file}"))?;

    let validator = StrictSchemaValidator::new().require_steps(config.require_steps);
    let compiled = compile_plan(&raw, &validator, MacroTable::builtin())
        .with_context(|| format!("plan rejected: {file}"))?;
    info!(file, misses = compiled.misses.len(), "plan compiled");
    Ok(compiled)
}

/// CLI flags win over config-file preferences.
fn merge_preferences(
    base: &RemapPreferences,
    long_run_day: Option<Weekday>,
    long_ride_day: Option<Weekday>,
    no_strength: bool,
) -> RemapPreferences {
    RemapPreferences {
        long_run_day: long_run_day.or(base.long_run_day),
        long_ride_day: long_ride_day.or(base.long_ride_day),
        include_strength: base.include_strength && !no_strength,
    }
}

fn write_json<T: Serialize>(value: &T, output: Option<&str>) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("failed to serialize plan")?;
    match output {
        Some(path) => {
            std::fs::write(path, format!("{json}\n"))
                .with_context(|| format!("failed to write to {path}"))?;
            eprintln!("Plan written to {path}");
        }
        None => println!("{json}"),
    }
    Ok(())
}

// -----------------------------------------------------------------------
// stride plan compile
// -----------------------------------------------------------------------

fn cmd_compile(
    config: &StrideConfig,
    file: &str,
    format: Option<PlanFormat>,
    output: Option<&str>,
) -> Result<()> {
    let compiled = compile_file(config, file, format)?;
    write_json(&compiled.plan, output)
}

// -----------------------------------------------------------------------
// stride plan check
// -----------------------------------------------------------------------

fn cmd_check(config: &StrideConfig, file: &str, format: Option<PlanFormat>) -> Result<()> {
    let compiled = compile_file(config, file, format)?;
    print!("{}", summarize(&compiled));
    Ok(())
}

/// Human-readable summary of a compiled plan.
fn summarize(compiled: &Compiled) -> String {
    let plan = &compiled.plan;
    let mut out = String::new();
    out.push_str(&format!("Plan: {}\n", plan.name()));
    out.push_str(&format!("  Shape:       {}\n", plan.shape()));
    out.push_str(&format!("  Discipline:  {}\n", plan.discipline()));
    out.push_str(&format!("  Weeks:       {}\n", plan.duration_weeks()));

    match plan {
        CompiledPlan::Sessions(p) => {
            out.push_str(&format!("  Sessions:    {}\n", p.sessions().count()));
            let mut weeks: Vec<(&String, usize)> = p
                .sessions_by_week
                .iter()
                .map(|(week, sessions)| (week, sessions.len()))
                .collect();
            weeks.sort_by_key(|(week, _)| week.parse::<u32>().unwrap_or(u32::MAX));
            for (week, count) in weeks {
                out.push_str(&format!("    week {week:>3}: {count} session(s)\n"));
            }
        }
        CompiledPlan::Blueprint(b) => {
            out.push_str(&format!(
                "  Range:       {}-{} weeks\n",
                b.min_weeks, b.max_weeks
            ));
            out.push_str(&format!(
                "  Phases:      {}\n",
                b.phase_order.join(" > ")
            ));
        }
    }

    if !compiled.misses.is_empty() {
        out.push_str(&format!("\nExpansion misses ({}):\n", compiled.misses.len()));
        for miss in &compiled.misses {
            out.push_str(&format!("  - {miss}\n"));
        }
    }
    out
}

// -----------------------------------------------------------------------
// stride plan remap
// -----------------------------------------------------------------------

fn cmd_remap(
    config: &StrideConfig,
    file: &str,
    format: Option<PlanFormat>,
    prefs: &RemapPreferences,
    output: Option<&str>,
) -> Result<()> {
    let compiled = compile_file(config, file, format)?;
    let remapped = compiled.plan.remap(prefs);
    write_json(&remapped, output)
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------
