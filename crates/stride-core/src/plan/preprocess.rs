//! Authoring-to-schema rewrite.
//!
//! Walks `sessions_by_week`, expands macros and swim cues into
//! `steps_preset`, strips authoring-only fields, filters `export_hints` to
//! the allow-list, and injects the optional weekly notes header. The input
//! is never mutated and nothing here rejects a plan: expansion failures are
//! collected as [`ExpansionMiss`] warnings.

use std::fmt;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::dsl::{self, DefaultsTable, DslError, SwimCues};
use crate::macros::{self, MacroTable};
use crate::plan::format::{Discipline, ExportHints};

/// Plan-level keys the schema does not know about.
const PLAN_AUTHORING_KEYS: [&str; 4] = ["defaults", "min_weeks", "max_weeks", "ui_text"];

/// Swim-only authoring keys removed after expansion.
const SWIM_AUTHORING_KEYS: [&str; 4] = ["main", "extra", "override_wu", "override_cd"];

/// Why a session's steps could not be expanded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissReason {
    UnknownMacro(String),
    Dsl(DslError),
}

/// A non-fatal expansion failure for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpansionMiss {
    pub week: String,
    pub index: usize,
    pub reason: MissReason,
}

impl fmt::Display for ExpansionMiss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "week {} session {}: ", self.week, self.index + 1)?;
        match &self.reason {
            MissReason::UnknownMacro(token) => write!(f, "unknown macro {token:?}"),
            MissReason::Dsl(e) => write!(f, "swim cues not expanded: {e}"),
        }
    }
}

/// Result of preprocessing: the schema-ready tree plus any expansion misses.
#[derive(Debug, Clone)]
pub struct Preprocessed {
    pub plan: Value,
    pub misses: Vec<ExpansionMiss>,
}

/// Rewrite an authored plan into its schema-ready form.
pub fn preprocess(raw: &Value, macros: &MacroTable) -> Preprocessed {
    let mut plan = raw.clone();
    let mut misses = Vec::new();

    let Some(root) = plan.as_object_mut() else {
        return Preprocessed { plan, misses };
    };

    let defaults = DefaultsTable::from_plan_value(root.get("defaults"));

    if let Some(weeks) = root.get_mut("sessions_by_week").and_then(Value::as_object_mut) {
        for (week, sessions) in weeks.iter_mut() {
            let Some(sessions) = sessions.as_array_mut() else {
                continue;
            };
            for (index, session) in sessions.iter_mut().enumerate() {
                let Some(session) = session.as_object_mut() else {
                    continue;
                };
                if let Err(reason) = preprocess_session(session, &defaults, macros) {
                    let miss = ExpansionMiss {
                        week: week.clone(),
                        index,
                        reason,
                    };
                    warn!(%miss, "step expansion skipped");
                    misses.push(miss);
                }
            }
        }
    }

    filter_export_hints(root);
    inject_weekly_header(root);

    for key in PLAN_AUTHORING_KEYS {
        root.remove(key);
    }

    Preprocessed { plan, misses }
}

/// Normalize one session in place.
///
/// Returns `Err` only to report a best-effort expansion miss; the session
/// has still been fully rewritten.
fn preprocess_session(
    session: &mut Map<String, Value>,
    defaults: &DefaultsTable,
    macros: &MacroTable,
) -> Result<(), MissReason> {
    let discipline = resolve_discipline(session);
    let is_swim = discipline == Some(Discipline::Swim);

    let outcome = if has_steps(session) {
        Ok(())
    } else {
        expand_steps(session, is_swim, defaults, macros)
    };

    if is_swim {
        for key in SWIM_AUTHORING_KEYS {
            session.remove(key);
        }
    }
    session.remove("macro");

    outcome
}

/// Read `discipline` (or legacy `type`), normalize it, and drop `type`.
fn resolve_discipline(session: &mut Map<String, Value>) -> Option<Discipline> {
    let legacy = session.remove("type");
    let raw = session
        .get("discipline")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .or_else(|| legacy.as_ref().and_then(Value::as_str).map(str::to_owned))?;

    match raw.parse::<Discipline>() {
        Ok(discipline) => {
            session.insert("discipline".into(), Value::String(discipline.to_string()));
            Some(discipline)
        }
        Err(_) => {
            // Leave a normalized spelling for the validator to reject.
            session.insert(
                "discipline".into(),
                Value::String(raw.trim().to_ascii_lowercase()),
            );
            None
        }
    }
}

fn has_steps(session: &Map<String, Value>) -> bool {
    session
        .get("steps_preset")
        .and_then(Value::as_array)
        .is_some_and(|steps| !steps.is_empty())
}

/// Try macro expansion, then (swim only) cue expansion.
fn expand_steps(
    session: &mut Map<String, Value>,
    is_swim: bool,
    defaults: &DefaultsTable,
    macros: &MacroTable,
) -> Result<(), MissReason> {
    let explicit = non_empty_str(session.get("macro"));
    let from_description = non_empty_str(session.get("description"))
        .filter(|d| macros::looks_like_macro(d));

    let mut miss = None;
    if let Some(token) = explicit.or(from_description) {
        match macros.expand(&token) {
            Some(steps) => {
                debug!(%token, steps = steps.len(), "expanded macro");
                set_steps(session, steps.to_vec());
                return Ok(());
            }
            None => miss = Some(MissReason::UnknownMacro(token)),
        }
    }

    if is_swim {
        let main = non_empty_str(session.get("main"));
        let extra = non_empty_str(session.get("extra"));
        let override_wu = non_empty_str(session.get("override_wu"));
        let override_cd = non_empty_str(session.get("override_cd"));
        let cues = SwimCues {
            main: main.as_deref(),
            extra: extra.as_deref(),
            override_wu: override_wu.as_deref(),
            override_cd: override_cd.as_deref(),
        };
        if cues.has_cues() {
            match dsl::expand_swim(&cues, defaults, macros) {
                Ok(steps) => {
                    debug!(steps = steps.len(), "expanded swim cues");
                    set_steps(session, steps);
                    return Ok(());
                }
                Err(e) => miss = Some(MissReason::Dsl(e)),
            }
        }
    }

    miss.map_or(Ok(()), Err)
}

fn set_steps(session: &mut Map<String, Value>, steps: Vec<String>) {
    session.insert(
        "steps_preset".into(),
        Value::Array(steps.into_iter().map(Value::String).collect()),
    );
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

/// Keep only allow-listed export hints; drop the field if none survive.
fn filter_export_hints(root: &mut Map<String, Value>) {
    let Some(hints) = root.get_mut("export_hints") else {
        return;
    };
    let survivors = match hints.as_object_mut() {
        Some(map) => {
            map.retain(|key, _| ExportHints::ALLOWED_KEYS.contains(&key.as_str()));
            map.len()
        }
        None => 0,
    };
    if survivors == 0 {
        root.remove("export_hints");
    }
}

/// Prepend `ui_text.optional_header` to every populated week's notes.
fn inject_weekly_header(root: &mut Map<String, Value>) {
    let Some(header) = non_empty_str(root.get("ui_text").and_then(|u| u.get("optional_header")))
    else {
        return;
    };
    let weeks: Vec<String> = match root.get("sessions_by_week").and_then(Value::as_object) {
        Some(weeks) => weeks.keys().cloned().collect(),
        None => return,
    };

    let notes = root
        .entry("notes_by_week")
        .or_insert_with(|| Value::Object(Map::new()));
    let Some(notes) = notes.as_object_mut() else {
        return;
    };

    for week in weeks {
        let entry = notes.entry(week).or_insert(Value::Null);
        *entry = match entry.take() {
            Value::Array(mut lines) => {
                if lines.first().and_then(Value::as_str) != Some(header.as_str()) {
                    lines.insert(0, Value::String(header.clone()));
                }
                Value::Array(lines)
            }
            Value::String(s) if s.trim().is_empty() || s == header => {
                Value::Array(vec![Value::String(header.clone())])
            }
            Value::String(s) => Value::Array(vec![Value::String(header.clone()), Value::String(s)]),
            Value::Null => Value::Array(vec![Value::String(header.clone())]),
            other => other,
        };
    }
}
