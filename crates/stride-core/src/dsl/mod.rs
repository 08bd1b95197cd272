//! Swim session mini-language.
//!
//! Turns the free-text `main` / `extra` cues of a swim session into an
//! ordered list of step identifiers, framed by a warm-up and cool-down taken
//! from the session overrides or from a [`DefaultsTable`].
//!
//! Cue grammar (cues separated by `,`, `;`, `+` or newlines):
//!
//! ```text
//! cue    := "@" MACRO | [reps ("x" | "×")] distance ["m"] [effort] [notes...]
//! effort := easy | steady | aerobic | drill | kick | pull | build
//!         | threshold | css | sprint | choice
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::macros::MacroTable;

/// Errors produced while expanding swim cues.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DslError {
    #[error("no cues found in main/extra")]
    NoCues,

    #[error("invalid repetition count in cue {cue:?}")]
    BadReps { cue: String },

    #[error("invalid distance in cue {cue:?} (expected a positive multiple of 25)")]
    BadDistance { cue: String },

    #[error("unknown effort {effort:?} in cue {cue:?}")]
    UnknownEffort { cue: String, effort: String },

    #[error("unknown macro {0:?} in cue list")]
    UnknownMacro(String),
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Warm-up and cool-down fallbacks used when expanding swim cues.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultsTable {
    #[serde(default)]
    pub swim: SwimDefaults,
}

/// Swim-specific defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwimDefaults {
    /// Step id prepended to every expanded swim session.
    #[serde(default, alias = "wu")]
    pub warmup: Option<String>,
    /// Step id appended to every expanded swim session.
    #[serde(default, alias = "cd")]
    pub cooldown: Option<String>,
}

impl DefaultsTable {
    /// Defaults applied when a plan supplies none.
    pub fn fallback() -> Self {
        Self {
            swim: SwimDefaults {
                warmup: Some("swim_wu_300_easy".to_string()),
                cooldown: Some("swim_cd_200_easy".to_string()),
            },
        }
    }

    /// Read a plan's authored `defaults` block, filling gaps from
    /// [`DefaultsTable::fallback`]. A malformed block yields the fallback.
    pub fn from_plan_value(value: Option<&Value>) -> Self {
        let fallback = Self::fallback();
        let Some(value) = value else {
            return fallback;
        };
        match serde_json::from_value::<DefaultsTable>(value.clone()) {
            Ok(authored) => Self {
                swim: SwimDefaults {
                    warmup: authored.swim.warmup.or(fallback.swim.warmup),
                    cooldown: authored.swim.cooldown.or(fallback.swim.cooldown),
                },
            },
            Err(e) => {
                debug!(error = %e, "ignoring malformed plan defaults");
                fallback
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Effort
// ---------------------------------------------------------------------------

/// Effort label of a swim cue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effort {
    Easy,
    Steady,
    Drill,
    Kick,
    Pull,
    Build,
    Threshold,
    Sprint,
    Choice,
}

impl fmt::Display for Effort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Easy => "easy",
            Self::Steady => "steady",
            Self::Drill => "drill",
            Self::Kick => "kick",
            Self::Pull => "pull",
            Self::Build => "build",
            Self::Threshold => "threshold",
            Self::Sprint => "sprint",
            Self::Choice => "choice",
        };
        f.write_str(s)
    }
}

impl FromStr for Effort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim_start_matches('@') {
            "easy" | "recovery" => Ok(Self::Easy),
            "steady" | "aerobic" | "endurance" => Ok(Self::Steady),
            "drill" | "drills" => Ok(Self::Drill),
            "kick" => Ok(Self::Kick),
            "pull" => Ok(Self::Pull),
            "build" => Ok(Self::Build),
            "threshold" | "css" => Ok(Self::Threshold),
            "sprint" | "fast" => Ok(Self::Sprint),
            "choice" | "im" => Ok(Self::Choice),
            other => Err(other.to_owned()),
        }
    }
}

// ---------------------------------------------------------------------------
// Expansion
// ---------------------------------------------------------------------------

/// The authoring cues of a single swim session.
#[derive(Debug, Clone, Copy, Default)]
pub struct SwimCues<'a> {
    pub main: Option<&'a str>,
    pub extra: Option<&'a str>,
    pub override_wu: Option<&'a str>,
    pub override_cd: Option<&'a str>,
}

impl SwimCues<'_> {
    /// True if there is any main or extra text to expand.
    pub fn has_cues(&self) -> bool {
        self.main.is_some() || self.extra.is_some()
    }
}

/// Expand swim cues into an ordered step list.
///
/// The result is `warm-up + main cues + extra cues + cool-down`. Session
/// overrides take precedence over `defaults`; a missing warm-up or
/// cool-down is simply omitted.
pub fn expand_swim(
    cues: &SwimCues<'_>,
    defaults: &DefaultsTable,
    macros: &MacroTable,
) -> Result<Vec<String>, DslError> {
    let mut body = Vec::new();
    for text in [cues.main, cues.extra].into_iter().flatten() {
        for cue in split_cues(text) {
            body.extend(expand_cue(cue, macros)?);
        }
    }
    if body.is_empty() {
        return Err(DslError::NoCues);
    }

    let warmup = non_blank(cues.override_wu).or(defaults.swim.warmup.as_deref());
    let cooldown = non_blank(cues.override_cd).or(defaults.swim.cooldown.as_deref());

    let mut steps = Vec::with_capacity(body.len() + 2);
    steps.extend(warmup.map(str::to_owned));
    steps.append(&mut body);
    steps.extend(cooldown.map(str::to_owned));
    Ok(steps)
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

fn split_cues(text: &str) -> impl Iterator<Item = &str> {
    text.split([',', ';', '+', '\n'])
        .map(str::trim)
        .filter(|c| !c.is_empty())
}

/// Expand one cue into one or more step ids.
fn expand_cue(cue: &str, macros: &MacroTable) -> Result<Vec<String>, DslError> {
    if cue.starts_with('@') {
        return macros
            .expand(cue)
            .map(<[String]>::to_vec)
            .ok_or_else(|| DslError::UnknownMacro(cue.to_owned()));
    }

    let lowered = cue.to_lowercase().replace('×', "x");
    let words: Vec<&str> = lowered.split_whitespace().collect();

    // Accept "8x50", "8 x 50" and "8x 50".
    let (shape, rest): (String, &[&str]) = match words.as_slice() {
        [reps, "x", dist, rest @ ..] => (format!("{reps}x{dist}"), rest),
        [reps, dist, rest @ ..]
            if reps.ends_with('x')
                && dist.strip_suffix('m').unwrap_or(dist).parse::<u32>().is_ok() =>
        {
            (format!("{reps}{dist}"), rest)
        }
        [shape, rest @ ..] => ((*shape).to_owned(), rest),
        [] => return Err(DslError::NoCues),
    };

    let (reps, distance) = match shape.split_once('x') {
        Some((reps, dist)) => {
            let reps = reps
                .parse::<u32>()
                .ok()
                .filter(|r| *r > 0)
                .ok_or_else(|| DslError::BadReps {
                    cue: cue.to_owned(),
                })?;
            (Some(reps), parse_distance(dist, cue)?)
        }
        None => (None, parse_distance(&shape, cue)?),
    };

    let effort = match rest.first() {
        Some(word) => word.parse::<Effort>().map_err(|effort| DslError::UnknownEffort {
            cue: cue.to_owned(),
            effort,
        })?,
        None => Effort::Steady,
    };

    let id = match reps {
        Some(reps) => format!("swim_{effort}_{reps}x{distance}"),
        None => format!("swim_{effort}_{distance}"),
    };
    Ok(vec![id])
}

fn parse_distance(raw: &str, cue: &str) -> Result<u32, DslError> {
    raw.strip_suffix('m')
        .unwrap_or(raw)
        .parse::<u32>()
        .ok()
        .filter(|d| *d > 0 && d % 25 == 0)
        .ok_or_else(|| DslError::BadDistance {
            cue: cue.to_owned(),
        })
}
