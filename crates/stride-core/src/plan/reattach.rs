//! Post-validation reattachment, consistency check, and discipline inference.
//!
//! The preprocessor strips a few authoring fields that are still useful for
//! display. Once the validator has accepted the plan they are copied back
//! from the original input: `min_weeks` / `max_weeks`, `ui_text`, and the
//! swim `main` / `extra` cues.

use std::collections::BTreeSet;

use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use super::format::{CatalogDiscipline, Discipline, Plan, Weekday};
use super::ingest::week_count;

/// The plan's length does not cover all populated weeks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("duration_weeks is {duration_weeks} but sessions_by_week reaches week {max_week}")]
pub struct ConsistencyError {
    pub duration_weeks: u32,
    pub max_week: u32,
}

/// Copy display-only fields from `original` onto a validated plan.
pub fn reattach(original: &Value, mut plan: Plan) -> Plan {
    if let Some(min) = week_count(original.get("min_weeks")) {
        plan.min_weeks = Some(min);
    }
    if let Some(max) = week_count(original.get("max_weeks")) {
        plan.max_weeks = Some(max);
    }
    if let Some(ui_text) = original.get("ui_text") {
        plan.ui_text = Some(ui_text.clone());
    }

    let Some(original_weeks) = original.get("sessions_by_week").and_then(Value::as_object) else {
        return plan;
    };

    for (week, sessions) in plan.sessions_by_week.iter_mut() {
        let Some(authored) = original_weeks.get(week).and_then(Value::as_array) else {
            continue;
        };
        for (index, session) in sessions.iter_mut().enumerate() {
            let Some(source) = authored.get(index) else {
                continue;
            };
            let main = source.get("main").and_then(Value::as_str);
            let extra = source.get("extra").and_then(Value::as_str);
            if main.is_none() && extra.is_none() {
                continue;
            }
            if !same_swim_session(source, session.day, session.discipline) {
                warn!(
                    week = %week,
                    index,
                    "swim cues not restored: validated session does not match the authored one"
                );
                continue;
            }
            session.main = main.map(str::to_owned);
            session.extra = extra.map(str::to_owned);
        }
    }

    plan
}

/// Identity check between an authored session and its validated counterpart:
/// both must be swim sessions on the same day.
fn same_swim_session(source: &Value, day: Weekday, discipline: Discipline) -> bool {
    if discipline != Discipline::Swim {
        return false;
    }
    let authored_discipline = source
        .get("discipline")
        .or_else(|| source.get("type"))
        .and_then(Value::as_str)
        .and_then(|d| d.parse::<Discipline>().ok());
    let authored_day = source
        .get("day")
        .and_then(Value::as_str)
        .and_then(|d| d.parse::<Weekday>().ok());
    authored_discipline == Some(Discipline::Swim) && authored_day == Some(day)
}

/// Ensure `duration_weeks` covers the highest populated week.
pub fn check_consistency(plan: &Plan) -> Result<(), ConsistencyError> {
    match plan.max_week() {
        Some(max_week) if max_week > plan.duration_weeks => Err(ConsistencyError {
            duration_weeks: plan.duration_weeks,
            max_week,
        }),
        _ => Ok(()),
    }
}

/// Best-effort catalog discipline derived from the sessions a plan contains.
pub fn infer_discipline(plan: &Plan) -> CatalogDiscipline {
    let present: BTreeSet<Discipline> = plan.sessions().map(|s| s.discipline).collect();
    let only = |d: Discipline| present.len() == 1 && present.contains(&d);

    if [Discipline::Run, Discipline::Ride, Discipline::Swim]
        .iter()
        .all(|d| present.contains(d))
    {
        CatalogDiscipline::Hybrid
    } else if only(Discipline::Ride) {
        CatalogDiscipline::Ride
    } else if only(Discipline::Swim) {
        CatalogDiscipline::Swim
    } else if only(Discipline::Strength) {
        CatalogDiscipline::Strength
    } else {
        CatalogDiscipline::Run
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::format::Session;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn plan_with(weeks: &[(&str, Vec<Session>)], duration_weeks: u32) -> Plan {
        Plan {
            name: "P".into(),
            description: None,
            duration_weeks,
            sessions_by_week: weeks
                .iter()
                .map(|(k, v)| ((*k).to_string(), v.clone()))
                .collect::<BTreeMap<_, _>>(),
            notes_by_week: BTreeMap::new(),
            export_hints: None,
            discipline: None,
            min_weeks: None,
            max_weeks: None,
            ui_text: None,
        }
    }

    fn swim(day: Weekday) -> Session {
        Session::new(day, Discipline::Swim)
    }

    #[test]
    fn restores_plan_level_fields() {
        let original = json!({
            "min_weeks": 8,
            "max_weeks": 12,
            "ui_text": {"optional_header": "H", "intro": ["a", "b"]}
        });
        let plan = reattach(&original, plan_with(&[], 12));
        assert_eq!(plan.min_weeks, Some(8));
        assert_eq!(plan.max_weeks, Some(12));
        assert_eq!(plan.ui_text, Some(original["ui_text"].clone()));
    }

    #[test]
    fn ignores_non_numeric_window() {
        let original = json!({"min_weeks": "eight", "max_weeks": -1});
        let plan = reattach(&original, plan_with(&[], 4));
        assert_eq!(plan.min_weeks, None);
        assert_eq!(plan.max_weeks, None);
    }

    #[test]
    fn restores_swim_cues_by_position() {
        let original = json!({"sessions_by_week": {"1": [
            {"day": "Monday", "discipline": "run"},
            {"day": "Wednesday", "type": "Swim", "main": "8x50 drill", "extra": "200 easy"}
        ]}});
        let validated = plan_with(
            &[(
                "1",
                vec![Session::new(Weekday::Monday, Discipline::Run), swim(Weekday::Wednesday)],
            )],
            4,
        );
        let plan = reattach(&original, validated);
        let s = &plan.sessions_by_week["1"][1];
        assert_eq!(s.main.as_deref(), Some("8x50 drill"));
        assert_eq!(s.extra.as_deref(), Some("200 easy"));
        assert_eq!(plan.sessions_by_week["1"][0].main, None);
    }

    #[test]
    fn skips_cues_when_identity_does_not_match() {
        let original = json!({"sessions_by_week": {"1": [
            {"day": "Wednesday", "discipline": "swim", "main": "8x50 drill"}
        ]}});
        let moved = plan_with(&[("1", vec![swim(Weekday::Friday)])], 4);
        assert_eq!(reattach(&original, moved).sessions_by_week["1"][0].main, None);

        let not_swim = plan_with(
            &[("1", vec![Session::new(Weekday::Wednesday, Discipline::Run)])],
            4,
        );
        assert_eq!(reattach(&original, not_swim).sessions_by_week["1"][0].main, None);
    }

    #[test]
    fn consistency_rejects_short_duration() {
        let plan = plan_with(&[("1", vec![]), ("5", vec![])], 4);
        let err = check_consistency(&plan).unwrap_err();
        assert_eq!(
            err,
            ConsistencyError {
                duration_weeks: 4,
                max_week: 5
            }
        );
        let msg = err.to_string();
        assert!(msg.contains('4') && msg.contains('5'), "got: {msg}");
    }

    #[test]
    fn consistency_compares_numerically() {
        // "10" sorts before "9" as a string.
        let plan = plan_with(&[("9", vec![]), ("10", vec![])], 9);
        assert!(check_consistency(&plan).is_err());
        let plan = plan_with(&[("9", vec![]), ("10", vec![])], 10);
        assert!(check_consistency(&plan).is_ok());
    }

    #[test]
    fn infers_hybrid_when_all_three_present() {
        let plan = plan_with(
            &[(
                "1",
                vec![
                    Session::new(Weekday::Monday, Discipline::Run),
                    Session::new(Weekday::Tuesday, Discipline::Ride),
                    swim(Weekday::Wednesday),
                    Session::new(Weekday::Thursday, Discipline::Strength),
                ],
            )],
            1,
        );
        assert_eq!(infer_discipline(&plan), CatalogDiscipline::Hybrid);
    }

    #[test]
    fn infers_single_disciplines() {
        let ride = plan_with(
            &[("1", vec![Session::new(Weekday::Monday, Discipline::Ride)])],
            1,
        );
        assert_eq!(infer_discipline(&ride), CatalogDiscipline::Ride);

        let swim_only = plan_with(&[("1", vec![swim(Weekday::Monday)]), ("2", vec![swim(Weekday::Friday)])], 2);
        assert_eq!(infer_discipline(&swim_only), CatalogDiscipline::Swim);

        let strength = plan_with(
            &[("1", vec![Session::new(Weekday::Monday, Discipline::Strength)])],
            1,
        );
        assert_eq!(infer_discipline(&strength), CatalogDiscipline::Strength);
    }

    #[test]
    fn defaults_to_run() {
        let mixed = plan_with(
            &[(
                "1",
                vec![
                    Session::new(Weekday::Monday, Discipline::Ride),
                    Session::new(Weekday::Tuesday, Discipline::Strength),
                ],
            )],
            1,
        );
        assert_eq!(infer_discipline(&mixed), CatalogDiscipline::Run);
        assert_eq!(infer_discipline(&plan_with(&[], 1)), CatalogDiscipline::Run);
    }
}
