//! Preference-driven session relocation.
//!
//! For every week, the designated long run and long ride are moved to the
//! athlete's preferred days, and optional strength sessions can be dropped.
//! The input plan is never modified; a new plan is returned.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::format::{
    CompiledPlan, Discipline, Plan, Session, TAG_LONG_RIDE, TAG_LONG_RUN, TAG_MANDATORY_STRENGTH,
    Weekday,
};

/// Athlete day-of-week preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemapPreferences {
    /// Day to move each week's long run to; `None` leaves runs in place.
    #[serde(default)]
    pub long_run_day: Option<Weekday>,
    /// Day to move each week's long ride to; `None` leaves rides in place.
    #[serde(default)]
    pub long_ride_day: Option<Weekday>,
    /// When false, strength sessions not tagged `mandatory_strength` are dropped.
    #[serde(default = "default_include_strength")]
    pub include_strength: bool,
}

impl Default for RemapPreferences {
    fn default() -> Self {
        Self {
            long_run_day: None,
            long_ride_day: None,
            include_strength: true,
        }
    }
}

fn default_include_strength() -> bool {
    true
}

/// Return a copy of `plan` with long sessions moved and strength filtered.
pub fn remap(plan: &Plan, prefs: &RemapPreferences) -> Plan {
    let mut out = plan.clone();
    for (week, sessions) in out.sessions_by_week.iter_mut() {
        if let Some(day) = prefs.long_run_day {
            if let Some(i) = pick_long_session(sessions, TAG_LONG_RUN, Discipline::Run) {
                debug!(week = %week, from = %sessions[i].day, to = %day, "moving long run");
                sessions[i].day = day;
            }
        }
        if let Some(day) = prefs.long_ride_day {
            if let Some(i) = pick_long_session(sessions, TAG_LONG_RIDE, Discipline::Ride) {
                debug!(week = %week, from = %sessions[i].day, to = %day, "moving long ride");
                sessions[i].day = day;
            }
        }
        if !prefs.include_strength {
            sessions.retain(|s| {
                s.discipline != Discipline::Strength || s.has_tag(TAG_MANDATORY_STRENGTH)
            });
        }
    }
    out
}

/// Index of the week's designated long session.
///
/// A session carrying `tag` wins; otherwise the `discipline` session with the
/// greatest duration (missing duration counts as zero). Ties keep the first
/// occurrence.
fn pick_long_session(sessions: &[Session], tag: &str, discipline: Discipline) -> Option<usize> {
    if let Some(i) = sessions.iter().position(|s| s.has_tag(tag)) {
        return Some(i);
    }
    let mut best: Option<(usize, f64)> = None;
    for (i, s) in sessions.iter().enumerate() {
        if s.discipline != discipline {
            continue;
        }
        let minutes = s.duration.unwrap_or(0.0);
        if best.is_none_or(|(_, longest)| minutes > longest) {
            best = Some((i, minutes));
        }
    }
    best.map(|(i, _)| i)
}

impl CompiledPlan {
    /// Apply [`remap`] to a sessions plan; blueprints have nothing to move.
    pub fn remap(&self, prefs: &RemapPreferences) -> CompiledPlan {
        match self {
            Self::Sessions(plan) => Self::Sessions(remap(plan, prefs)),
            Self::Blueprint(_) => self.clone(),
        }
    }
}
