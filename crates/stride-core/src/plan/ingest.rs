//! Plan acquisition and shape classification.
//!
//! Authored plans arrive as JSON or TOML text (pasted, piped, or read from a
//! file). They are parsed into a plain [`serde_json::Value`] tree so the
//! preprocessor can rewrite arbitrary authoring shapes, then classified once
//! as either blueprint-shaped or sessions-shaped.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde_json::Value;
use thiserror::Error;

/// Errors raised while turning source text into an in-memory plan tree.
#[derive(Debug, Error)]
pub enum AcquisitionError {
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("plan must be a JSON object or TOML table at the top level")]
    NotAnObject,
}

/// Source text format of an authored plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanFormat {
    Json,
    Toml,
}

impl PlanFormat {
    /// Guess the format from a file extension (`.json` / `.toml`).
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "toml" => Some(Self::Toml),
            _ => None,
        }
    }

    /// Guess the format from the content: a leading `{` means JSON.
    pub fn sniff(content: &str) -> Self {
        if content.trim_start().starts_with('{') {
            Self::Json
        } else {
            Self::Toml
        }
    }
}

impl fmt::Display for PlanFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Json => "json",
            Self::Toml => "toml",
        })
    }
}

impl FromStr for PlanFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "toml" => Ok(Self::Toml),
            other => Err(format!("invalid plan format {other:?} (expected json or toml)")),
        }
    }
}

/// Parse plan source text into a JSON tree.
///
/// When `format` is `None` the format is sniffed from the content.
pub fn parse_plan_source(
    content: &str,
    format: Option<PlanFormat>,
) -> Result<Value, AcquisitionError> {
    let format = format.unwrap_or_else(|| PlanFormat::sniff(content));
    let value: Value = match format {
        PlanFormat::Json => serde_json::from_str(content)?,
        PlanFormat::Toml => toml::from_str(content)?,
    };
    if !value.is_object() {
        return Err(AcquisitionError::NotAnObject);
    }
    Ok(value)
}

// ---------------------------------------------------------------------------
// Shape classification
// ---------------------------------------------------------------------------

/// The two accepted plan shapes, decided once at ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanShape {
    /// Concrete per-week sessions; goes through preprocess + validation.
    Sessions,
    /// Week-count window plus phase ordering; bypasses validation.
    Blueprint { min_weeks: u32, max_weeks: u32 },
}

/// Classify a raw plan.
///
/// Blueprint-shaped iff there is no `sessions_by_week`, `min_weeks` and
/// `max_weeks` are non-negative whole numbers, and `phase_blueprint.order` is a
/// non-empty list. Everything else is treated as sessions-shaped.
pub fn classify(raw: &Value) -> PlanShape {
    if raw.get("sessions_by_week").is_some() {
        return PlanShape::Sessions;
    }
    let weeks = (week_count(raw.get("min_weeks")), week_count(raw.get("max_weeks")));
    let has_phases = raw
        .get("phase_blueprint")
        .and_then(|p| p.get("order"))
        .and_then(Value::as_array)
        .is_some_and(|order| !order.is_empty());

    match weeks {
        (Some(min_weeks), Some(max_weeks)) if has_phases => PlanShape::Blueprint {
            min_weeks,
            max_weeks,
        },
        _ => PlanShape::Sessions,
    }
}

/// Read a week count: a non-negative whole number (`12` or `12.0`) that
/// fits in `u32`.
pub(crate) fn week_count(value: Option<&Value>) -> Option<u32> {
    let value = value?;
    let n = match value.as_u64() {
        Some(n) => n,
        None => {
            let f = value.as_f64()?;
            if f.fract() != 0.0 || !(0.0..=u32::MAX as f64).contains(&f) {
                return None;
            }
            f as u64
        }
    };
    u32::try_from(n).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_json_and_toml() {
        let json_plan = parse_plan_source(r#"{"name": "A", "duration_weeks": 1}"#, None).unwrap();
        assert_eq!(json_plan["name"], json!("A"));

        let toml_plan = parse_plan_source(
            r#"
name = "B"
duration_weeks = 2

[[sessions_by_week."1"]]
day = "Monday"
discipline = "run"
duration = 45
"#,
            None,
        )
        .unwrap();
        assert_eq!(toml_plan["duration_weeks"], json!(2));
        assert_eq!(toml_plan["sessions_by_week"]["1"][0]["duration"], json!(45));
    }

    #[test]
    fn explicit_format_overrides_sniffing() {
        let err = parse_plan_source("{\"name\": 1}", Some(PlanFormat::Toml)).unwrap_err();
        assert!(matches!(err, AcquisitionError::Toml(_)), "got: {err}");
    }

    #[test]
    fn rejects_non_object_root() {
        let err = parse_plan_source("[1, 2]", Some(PlanFormat::Json)).unwrap_err();
        assert!(matches!(err, AcquisitionError::NotAnObject), "got: {err}");
    }

    #[test]
    fn rejects_malformed_json() {
        let err = parse_plan_source("{ nope", None).unwrap_err();
        assert!(matches!(err, AcquisitionError::Json(_)), "got: {err}");
    }

    #[test]
    fn format_from_path() {
        assert_eq!(PlanFormat::from_path(Path::new("a/plan.JSON")), Some(PlanFormat::Json));
        assert_eq!(PlanFormat::from_path(Path::new("plan.toml")), Some(PlanFormat::Toml));
        assert_eq!(PlanFormat::from_path(Path::new("plan.txt")), None);
        assert_eq!(PlanFormat::from_path(Path::new("plan")), None);
    }

    #[test]
    fn classifies_blueprint() {
        let raw = json!({
            "min_weeks": 8,
            "max_weeks": 16,
            "phase_blueprint": {"order": ["base", "build", "peak"]}
        });
        assert_eq!(
            classify(&raw),
            PlanShape::Blueprint {
                min_weeks: 8,
                max_weeks: 16
            }
        );
    }

    #[test]
    fn sessions_presence_wins_over_blueprint_fields() {
        let raw = json!({
            "sessions_by_week": {},
            "min_weeks": 8,
            "max_weeks": 16,
            "phase_blueprint": {"order": ["base"]}
        });
        assert_eq!(classify(&raw), PlanShape::Sessions);
    }

    #[test]
    fn incomplete_blueprints_are_sessions_shaped() {
        let cases = [
            json!({"min_weeks": 8, "max_weeks": 16}),
            json!({"min_weeks": 8, "max_weeks": 16, "phase_blueprint": {"order": []}}),
            json!({"min_weeks": "8", "max_weeks": 16, "phase_blueprint": {"order": ["a"]}}),
            json!({"max_weeks": 16, "phase_blueprint": {"order": ["a"]}}),
        ];
        for raw in &cases {
            assert_eq!(classify(raw), PlanShape::Sessions, "{raw}");
        }
    }
}
