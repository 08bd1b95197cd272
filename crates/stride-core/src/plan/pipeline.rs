//! The compile pipeline.
//!
//! ```text
//! raw ─ classify ─┬─ blueprint ──────────────────────────────── CompiledPlan::Blueprint
//!                 └─ sessions ─ preprocess ─ validate ─ reattach
//!                               ─ consistency check ─ infer discipline ─ CompiledPlan::Sessions
//! ```
//!
//! Only the validator and the consistency check can reject a plan.

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::macros::MacroTable;

use super::format::{BlueprintPlan, CompiledPlan};
use super::ingest::{self, PlanShape};
use super::preprocess::{self, ExpansionMiss};
use super::reattach::{self, ConsistencyError};
use super::schema::{SchemaErrors, SchemaValidator};

/// Reasons a plan is rejected outright.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("{0}")]
    Structural(#[from] SchemaErrors),

    #[error(transparent)]
    Consistency(#[from] ConsistencyError),
}

/// An accepted plan plus the non-fatal expansion misses found on the way.
#[derive(Debug, Clone)]
pub struct Compiled {
    pub plan: CompiledPlan,
    pub misses: Vec<ExpansionMiss>,
}

/// Compile an authored plan tree into a normalized [`CompiledPlan`].
///
/// `raw` is never mutated; every stage works on its own copy.
pub fn compile_plan<V>(
    raw: &Value,
    validator: &V,
    macros: &MacroTable,
) -> Result<Compiled, CompileError>
where
    V: SchemaValidator + ?Sized,
{
    match ingest::classify(raw) {
        PlanShape::Blueprint { min_weeks, max_weeks } => {
            debug!(min_weeks, max_weeks, "blueprint plan, skipping schema validation");
            let authored = raw.as_object().cloned().unwrap_or_default();
            let plan = BlueprintPlan::from_authored(&authored, min_weeks, max_weeks);
            info!(name = %plan.name, "blueprint plan accepted");
            Ok(Compiled {
                plan: CompiledPlan::Blueprint(plan),
                misses: Vec::new(),
            })
        }
        PlanShape::Sessions => {
            let prepared = preprocess::preprocess(raw, macros);
            let validated = validator.validate(&prepared.plan)?;
            let mut plan = reattach::reattach(raw, validated);
            reattach::check_consistency(&plan)?;
            plan.discipline = Some(reattach::infer_discipline(&plan));
            info!(
                name = %plan.name,
                weeks = plan.duration_weeks,
                misses = prepared.misses.len(),
                "plan accepted"
            );
            Ok(Compiled {
                plan: CompiledPlan::Sessions(plan),
                misses: prepared.misses,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::plan::format::{CatalogDiscipline, Discipline, Plan, Weekday};
    use crate::dsl::DslError;
    use crate::plan::preprocess::MissReason;
    use crate::plan::schema::StrictSchemaValidator;
    use serde_json::json;

    /// Counts calls and delegates to the strict validator.
    #[derive(Default)]
    struct CountingValidator {
        calls: Cell<usize>,
    }

    impl SchemaValidator for CountingValidator {
        fn validate(&self, plan: &Value) -> Result<Plan, SchemaErrors> {
            self.calls.set(self.calls.get() + 1);
            StrictSchemaValidator::new().validate(plan)
        }
    }

    fn compile(raw: &Value) -> Result<Compiled, CompileError> {
        compile_plan(raw, &StrictSchemaValidator::new(), MacroTable::builtin())
    }

    fn sessions(compiled: Compiled) -> Plan {
        match compiled.plan {
            CompiledPlan::Sessions(p) => p,
            CompiledPlan::Blueprint(_) => panic!("expected a sessions plan"),
        }
    }

    #[test]
    fn compiles_authored_plan_end_to_end() {
        let raw = json!({
            "name": "Sprint tri base",
            "duration_weeks": 2,
            "min_weeks": 2,
            "max_weeks": 4,
            "ui_text": {"optional_header": "Stay easy."},
            "export_hints": {"pace_tolerance_easy": 0.05, "colour": "red"},
            "sessions_by_week": {
                "1": [
                    {"day": "Monday", "type": "Swim", "main": "8x50 drill", "extra": "200 pull"},
                    {"day": "Wednesday", "discipline": "run", "macro": "@RUN_TEMPO", "duration": 50},
                    {"day": "Saturday", "discipline": "bike", "duration": 120}
                ],
                "2": [
                    {"day": "Tuesday", "discipline": "swim", "macro": "@SWIM_TECH_1200_DEFAULT"}
                ]
            }
        });
        let snapshot = raw.clone();
        let plan = sessions(compile(&raw).unwrap());
        assert_eq!(raw, snapshot);

        let swim = &plan.sessions_by_week["1"][0];
        assert_eq!(swim.discipline, Discipline::Swim);
        assert_eq!(
            swim.steps_preset,
            ["swim_wu_300_easy", "swim_drill_8x50", "swim_pull_200", "swim_cd_200_easy"]
        );
        assert_eq!(swim.main.as_deref(), Some("8x50 drill"));
        assert_eq!(swim.extra.as_deref(), Some("200 pull"));
        assert_eq!(plan.sessions_by_week["1"][2].discipline, Discipline::Ride);
        assert_eq!(plan.sessions_by_week["2"][0].steps_preset.len(), 6);

        assert_eq!(plan.min_weeks, Some(2));
        assert_eq!(plan.max_weeks, Some(4));
        assert_eq!(plan.ui_text, Some(json!({"optional_header": "Stay easy."})));
        assert_eq!(plan.notes_by_week["2"], ["Stay easy."]);
        let hints = plan.export_hints.expect("hints survive");
        assert_eq!(hints.pace_tolerance_easy, Some(0.05));
        assert_eq!(plan.discipline, Some(CatalogDiscipline::Hybrid));
    }

    #[test]
    fn unknown_macro_does_not_block_the_plan() {
        let raw = json!({
            "name": "P",
            "duration_weeks": 1,
            "sessions_by_week": {"1": [
                {"day": "Monday", "discipline": "run", "macro": "@DOES_NOT_EXIST", "steps_preset": []}
            ]}
        });
        let compiled = compile(&raw).unwrap();
        assert_eq!(compiled.misses.len(), 1);
        let plan = sessions(compiled);
        assert!(plan.sessions_by_week["1"][0].steps_preset.is_empty());
    }

    #[test]
    fn structural_errors_are_surfaced_verbatim() {
        let raw = json!({
            "name": "P",
            "duration_weeks": 1,
            "sessions_by_week": {"1": [{"day": "Noday", "discipline": "run"}]}
        });
        let err = compile(&raw).unwrap_err();
        assert!(matches!(err, CompileError::Structural(_)), "got: {err}");
        assert!(err.to_string().contains("Noday"), "got: {err}");
    }

    #[test]
    fn consistency_error_cites_both_numbers() {
        let raw = json!({
            "name": "P",
            "duration_weeks": 4,
            "sessions_by_week": {"1": [], "5": [{"day": "Monday", "discipline": "run"}]}
        });
        let err = compile(&raw).unwrap_err();
        match &err {
            CompileError::Consistency(c) => {
                assert_eq!((c.duration_weeks, c.max_week), (4, 5));
            }
            other => panic!("expected Consistency, got: {other}"),
        }
        let msg = err.to_string();
        assert!(msg.contains('4') && msg.contains('5'), "got: {msg}");
    }

    #[test]
    fn blueprint_bypasses_validator() {
        let raw = json!({
            "name": "Olympic tri",
            "min_weeks": 8,
            "max_weeks": 16,
            "phase_blueprint": {"order": ["base", "build", "peak", "taper"]}
        });
        let validator = CountingValidator::default();
        let compiled = compile_plan(&raw, &validator, MacroTable::builtin()).unwrap();
        assert_eq!(validator.calls.get(), 0);
        match compiled.plan {
            CompiledPlan::Blueprint(b) => {
                assert_eq!(b.duration_weeks, 16);
                assert_eq!(b.discipline, CatalogDiscipline::Triathlon);
                assert_eq!(b.phase_order.len(), 4);
            }
            CompiledPlan::Sessions(_) => panic!("expected blueprint"),
        }
    }

    #[test]
    fn blueprint_keeps_authored_duration() {
        let raw = json!({
            "min_weeks": 8,
            "max_weeks": 16,
            "duration_weeks": 12,
            "phase_blueprint": {"order": ["base"]}
        });
        let compiled = compile(&raw).unwrap();
        assert_eq!(compiled.plan.duration_weeks(), 12);
        assert_eq!(compiled.plan.shape(), "blueprint");
    }

    #[test]
    fn loosely_typed_blueprint_is_accepted() {
        let raw = json!({
            "description": {"en": "Build to 70.3"},
            "min_weeks": 8,
            "max_weeks": 16,
            "duration_weeks": 12.0,
            "phase_blueprint": {"order": ["base", "build"]}
        });
        let compiled = compile(&raw).unwrap();
        assert_eq!(compiled.plan.duration_weeks(), 12);
        assert_eq!(compiled.plan.description(), None);
        let body = serde_json::to_value(&compiled.plan).unwrap();
        assert_eq!(body["description"], raw["description"]);

        let mut odd = raw.clone();
        odd["duration_weeks"] = json!("sixteen");
        let compiled = compile(&odd).unwrap();
        assert_eq!(compiled.plan.duration_weeks(), 16);
        assert_eq!(serde_json::to_value(&compiled.plan).unwrap()["duration_weeks"], json!("sixteen"));
    }

    #[test]
    fn fractional_durations_and_repeated_tags() {
        let raw = json!({
            "name": "P",
            "duration_weeks": 1,
            "sessions_by_week": {"1": [
                {"day": "Tuesday", "discipline": "run", "duration": 37.5, "tags": ["long_run", "long_run"]},
                {"day": "Thursday", "discipline": "run", "duration": 0.5}
            ]}
        });
        let plan = sessions(compile(&raw).unwrap());
        let week = &plan.sessions_by_week["1"];
        assert_eq!(week[0].duration, Some(37.5));
        assert_eq!(week[0].tags, ["long_run"]);
        assert_eq!(week[1].duration, Some(0.5));

        let mut bad = raw.clone();
        bad["sessions_by_week"]["1"][1]["duration"] = json!(-5.0);
        assert!(matches!(compile(&bad), Err(CompileError::Structural(_))));
    }

    #[test]
    fn swim_cue_misses_survive_cloning() {
        let raw = json!({
            "name": "P",
            "duration_weeks": 1,
            "sessions_by_week": {"1": [{"day": "Monday", "discipline": "swim", "main": "3x60 drill"}]}
        });
        let compiled = compile(&raw).unwrap();
        let copy = compiled.clone();
        assert_eq!(copy.misses, compiled.misses);
        assert!(matches!(
            copy.misses[0].reason,
            MissReason::Dsl(DslError::BadDistance { .. })
        ));
    }

    #[test]
    fn sessions_plan_invokes_validator_once() {
        let raw = json!({
            "name": "P",
            "duration_weeks": 1,
            "sessions_by_week": {"1": [{"day": "sat", "discipline": "ride", "duration": 90}]}
        });
        let validator = CountingValidator::default();
        let compiled = compile_plan(&raw, &validator, MacroTable::builtin()).unwrap();
        assert_eq!(validator.calls.get(), 1);
        assert_eq!(compiled.plan.discipline(), CatalogDiscipline::Ride);
        let plan = sessions(compiled);
        assert_eq!(plan.sessions_by_week["1"][0].day, Weekday::Saturday);
    }
}
