//! Strict schema validation of preprocessed plans.
//!
//! The validator is a seam: anything implementing [`SchemaValidator`] can
//! accept or reject a preprocessed plan tree. [`StrictSchemaValidator`] is
//! the bundled implementation; it rejects unknown keys at every level and
//! collects every structural problem it finds rather than stopping at the
//! first.

use std::fmt;

use serde_json::Value;

use super::format::Plan;

/// The list of problems found by a validator, surfaced verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaErrors(pub Vec<String>);

impl SchemaErrors {
    pub fn single(message: impl Into<String>) -> Self {
        Self(vec![message.into()])
    }

    pub fn messages(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for SchemaErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("; "))
    }
}

impl std::error::Error for SchemaErrors {}

/// Accepts a preprocessed plan tree and returns a typed plan, or rejects it.
pub trait SchemaValidator {
    fn validate(&self, plan: &Value) -> Result<Plan, SchemaErrors>;
}

/// The bundled strict validator.
#[derive(Debug, Clone, Copy, Default)]
pub struct StrictSchemaValidator {
    /// Reject sessions whose `steps_preset` is empty.
    pub require_steps: bool,
}

impl StrictSchemaValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require every session to carry at least one step.
    pub fn require_steps(mut self, require: bool) -> Self {
        self.require_steps = require;
        self
    }
}

impl SchemaValidator for StrictSchemaValidator {
    fn validate(&self, value: &Value) -> Result<Plan, SchemaErrors> {
        let plan: Plan = serde_json::from_value(value.clone())
            .map_err(|e| SchemaErrors::single(format!("schema violation: {e}")))?;

        let mut errors = Vec::new();

        if plan.name.trim().is_empty() {
            errors.push("name must not be empty".to_string());
        }
        if plan.duration_weeks == 0 {
            errors.push("duration_weeks must be at least 1".to_string());
        }

        for (week, sessions) in &plan.sessions_by_week {
            if !is_week_key(week) {
                errors.push(format!(
                    "sessions_by_week key {week:?} is not a positive week number"
                ));
            }
            for (index, session) in sessions.iter().enumerate() {
                let at = format!("week {week} session {}", index + 1);
                if let Some(minutes) = session.duration {
                    if !minutes.is_finite() || minutes <= 0.0 {
                        errors.push(format!("{at}: duration must be positive"));
                    }
                }
                if self.require_steps && session.steps_preset.is_empty() {
                    errors.push(format!("{at}: steps_preset must not be empty"));
                }
                if session.steps_preset.iter().any(|s| s.trim().is_empty()) {
                    errors.push(format!("{at}: steps_preset contains a blank step"));
                }
            }
        }

        for week in plan.notes_by_week.keys() {
            if !is_week_key(week) {
                errors.push(format!(
                    "notes_by_week key {week:?} is not a positive week number"
                ));
            }
        }

        if errors.is_empty() {
            Ok(plan)
        } else {
            Err(SchemaErrors(errors))
        }
    }
}

fn is_week_key(key: &str) -> bool {
    key.parse::<u32>().is_ok_and(|n| n > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn minimal() -> Value {
        json!({
            "name": "Base",
            "duration_weeks": 2,
            "sessions_by_week": {
                "1": [{"day": "Monday", "discipline": "run", "duration": 40, "steps_preset": ["a"]}],
                "2": [{"day": "Saturday", "discipline": "ride", "duration": 120}]
            }
        })
    }

    #[test]
    fn accepts_minimal_plan() {
        let plan = StrictSchemaValidator::new().validate(&minimal()).unwrap();
        assert_eq!(plan.duration_weeks, 2);
        assert_eq!(plan.sessions_by_week["2"][0].steps_preset, Vec::<String>::new());
    }

    #[test]
    fn rejects_unknown_plan_key() {
        let mut v = minimal();
        v["defaults"] = json!({});
        let err = StrictSchemaValidator::new().validate(&v).unwrap_err();
        assert!(err.to_string().contains("defaults"), "got: {err}");
    }

    #[test]
    fn rejects_unknown_session_key() {
        let mut v = minimal();
        v["sessions_by_week"]["1"][0]["macro"] = json!("@RUN_TEMPO");
        let err = StrictSchemaValidator::new().validate(&v).unwrap_err();
        assert!(err.to_string().contains("macro"), "got: {err}");
    }

    #[test]
    fn rejects_unknown_export_hint() {
        let mut v = minimal();
        v["export_hints"] = json!({"pace_tolerance_easy": 0.1, "nope": 1});
        assert!(StrictSchemaValidator::new().validate(&v).is_err());
    }

    #[test]
    fn rejects_bad_day_and_discipline() {
        let mut v = minimal();
        v["sessions_by_week"]["1"][0]["day"] = json!("Funday");
        assert!(StrictSchemaValidator::new().validate(&v).is_err());

        let mut v = minimal();
        v["sessions_by_week"]["1"][0]["discipline"] = json!("yoga");
        assert!(StrictSchemaValidator::new().validate(&v).is_err());
    }

    #[test]
    fn collects_semantic_errors() {
        let mut v = minimal();
        v["name"] = json!(" ");
        v["duration_weeks"] = json!(0);
        v["sessions_by_week"]["week3"] = json!([]);
        v["sessions_by_week"]["1"][0]["duration"] = json!(0);
        let err = StrictSchemaValidator::new().validate(&v).unwrap_err();
        assert_eq!(err.messages().len(), 4, "got: {err}");
    }

    #[test]
    fn require_steps_rejects_empty_presets() {
        let err = StrictSchemaValidator::new()
            .require_steps(true)
            .validate(&minimal())
            .unwrap_err();
        assert_eq!(
            err.messages(),
            ["week 2 session 1: steps_preset must not be empty"]
        );
    }

    #[test]
    fn rejects_non_numeric_notes_week() {
        let mut v = minimal();
        v["notes_by_week"] = json!({"intro": ["hello"]});
        let err = StrictSchemaValidator::new().validate(&v).unwrap_err();
        assert!(err.to_string().contains("notes_by_week"), "got: {err}");
    }
}
