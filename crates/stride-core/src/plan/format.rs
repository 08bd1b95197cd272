//! Typed representation of validated training plans.
//!
//! [`Plan`] is the strict, schema-checked shape of a sessions-based plan.
//! Authoring-only fields (`macro`, swim cues, `defaults`, ...) have no place
//! here: the strict deserializer rejects them, and the few that survive for
//! display (`main`/`extra`, `min_weeks`/`max_weeks`, `ui_text`) are marked
//! `skip_deserializing` so only the reattacher can set them.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use super::ingest::week_count;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Day of the week a session is scheduled on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    /// All weekdays, Monday first.
    pub const ALL: [Weekday; 7] = [
        Self::Monday,
        Self::Tuesday,
        Self::Wednesday,
        Self::Thursday,
        Self::Friday,
        Self::Saturday,
        Self::Sunday,
    ];
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Monday => "Monday",
            Self::Tuesday => "Tuesday",
            Self::Wednesday => "Wednesday",
            Self::Thursday => "Thursday",
            Self::Friday => "Friday",
            Self::Saturday => "Saturday",
            Self::Sunday => "Sunday",
        };
        f.write_str(s)
    }
}

impl FromStr for Weekday {
    type Err = WeekdayParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "monday" | "mon" => Ok(Self::Monday),
            "tuesday" | "tue" => Ok(Self::Tuesday),
            "wednesday" | "wed" => Ok(Self::Wednesday),
            "thursday" | "thu" => Ok(Self::Thursday),
            "friday" | "fri" => Ok(Self::Friday),
            "saturday" | "sat" => Ok(Self::Saturday),
            "sunday" | "sun" => Ok(Self::Sunday),
            _ => Err(WeekdayParseError(s.to_owned())),
        }
    }
}

impl TryFrom<String> for Weekday {
    type Error = WeekdayParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Weekday> for String {
    fn from(day: Weekday) -> Self {
        day.to_string()
    }
}

/// Error returned when parsing an invalid [`Weekday`] string.
#[derive(Debug, Clone)]
pub struct WeekdayParseError(pub String);

impl fmt::Display for WeekdayParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid weekday: {:?}", self.0)
    }
}

impl std::error::Error for WeekdayParseError {}

// ---------------------------------------------------------------------------

/// Discipline of a single session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Discipline {
    Run,
    Ride,
    Swim,
    Strength,
    Brick,
    Other,
}

impl fmt::Display for Discipline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Run => "run",
            Self::Ride => "ride",
            Self::Swim => "swim",
            Self::Strength => "strength",
            Self::Brick => "brick",
            Self::Other => "other",
        };
        f.write_str(s)
    }
}

impl FromStr for Discipline {
    type Err = DisciplineParseError;

    /// Case-insensitive; accepts common aliases (`bike`, `cycling`, ...).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "run" | "running" => Ok(Self::Run),
            "ride" | "bike" | "cycling" | "cycle" | "bike_ride" => Ok(Self::Ride),
            "swim" | "swimming" => Ok(Self::Swim),
            "strength" => Ok(Self::Strength),
            "brick" => Ok(Self::Brick),
            "other" => Ok(Self::Other),
            _ => Err(DisciplineParseError(s.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`Discipline`] string.
#[derive(Debug, Clone)]
pub struct DisciplineParseError(pub String);

impl fmt::Display for DisciplineParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid discipline {:?} (expected run, ride, swim, strength, brick, or other)",
            self.0
        )
    }
}

impl std::error::Error for DisciplineParseError {}

// ---------------------------------------------------------------------------

/// Catalog-level discipline tag attached to a finished plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogDiscipline {
    Run,
    Ride,
    Swim,
    Strength,
    Hybrid,
    Triathlon,
}

impl fmt::Display for CatalogDiscipline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Run => "run",
            Self::Ride => "ride",
            Self::Swim => "swim",
            Self::Strength => "strength",
            Self::Hybrid => "hybrid",
            Self::Triathlon => "triathlon",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Session tags
// ---------------------------------------------------------------------------

/// Tag marking the week's designated long run.
pub const TAG_LONG_RUN: &str = "long_run";
/// Tag marking the week's designated long ride.
pub const TAG_LONG_RIDE: &str = "long_ride";
/// Tag keeping a strength session even when strength is filtered out.
pub const TAG_MANDATORY_STRENGTH: &str = "mandatory_strength";

// ---------------------------------------------------------------------------
// Sessions-shaped plan
// ---------------------------------------------------------------------------

/// A single scheduled training session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Session {
    pub day: Weekday,
    pub discipline: Discipline,
    /// Planned duration in minutes; fractional minutes are allowed.
    #[serde(
        default,
        serialize_with = "serialize_minutes",
        skip_serializing_if = "Option::is_none"
    )]
    pub duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Fully expanded, ordered step identifiers.
    #[serde(default)]
    pub steps_preset: Vec<String>,
    /// Tag set in first-seen order; duplicates are dropped on input.
    #[serde(
        default,
        deserialize_with = "deserialize_tag_set",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub tags: Vec<String>,
    /// Swim main-set cue, restored after validation for display only.
    #[serde(default, skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub main: Option<String>,
    /// Swim extra-set cue, restored after validation for display only.
    #[serde(default, skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub extra: Option<String>,
}

impl Session {
    /// Create a session with no duration, description, steps, or tags.
    pub fn new(day: Weekday, discipline: Discipline) -> Self {
        Self {
            day,
            discipline,
            duration: None,
            description: None,
            steps_preset: Vec::new(),
            tags: Vec::new(),
            main: None,
            extra: None,
        }
    }

    /// Set the duration in minutes.
    pub fn duration(mut self, minutes: impl Into<f64>) -> Self {
        self.duration = Some(minutes.into());
        self
    }

    /// Add a tag; a tag already present is not repeated.
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        let tag = tag.into();
        if !self.has_tag(&tag) {
            self.tags.push(tag);
        }
        self
    }

    /// True if the session carries `tag`.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Whole minutes are written as integers so `45` round-trips as `45`.
fn serialize_minutes<S: Serializer>(minutes: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
    match *minutes {
        Some(m) if m.fract() == 0.0 && (0.0..=u32::MAX as f64).contains(&m) => {
            serializer.serialize_u32(m as u32)
        }
        Some(m) => serializer.serialize_f64(m),
        None => serializer.serialize_none(),
    }
}

fn deserialize_tag_set<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    let raw = Vec::<String>::deserialize(deserializer)?;
    let mut tags: Vec<String> = Vec::with_capacity(raw.len());
    for tag in raw {
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    Ok(tags)
}

/// Tolerances forwarded to downstream exporters. Only these four keys exist.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExportHints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pace_tolerance_quality: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pace_tolerance_easy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power_tolerance_ss_thr: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power_tolerance_vo2: Option<f64>,
}

impl ExportHints {
    /// The allow-listed keys, in declaration order.
    pub const ALLOWED_KEYS: [&'static str; 4] = [
        "pace_tolerance_quality",
        "pace_tolerance_easy",
        "power_tolerance_ss_thr",
        "power_tolerance_vo2",
    ];
}

/// A validated sessions-shaped plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Plan {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub duration_weeks: u32,
    /// Week key (`"1"`, `"2"`, ...) to the week's sessions, in authored order.
    pub sessions_by_week: BTreeMap<String, Vec<Session>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub notes_by_week: BTreeMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_hints: Option<ExportHints>,
    /// Catalog tag, set by discipline inference after validation.
    #[serde(default, skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub discipline: Option<CatalogDiscipline>,
    #[serde(default, skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub min_weeks: Option<u32>,
    #[serde(default, skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub max_weeks: Option<u32>,
    /// Authoring free text, restored verbatim and never schema-checked.
    #[serde(default, skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub ui_text: Option<Value>,
}

impl Plan {
    /// Highest week key that parses as a number, if any.
    pub fn max_week(&self) -> Option<u32> {
        max_numeric_week(self.sessions_by_week.keys().map(String::as_str))
    }

    /// Iterate over every session in week-key order.
    pub fn sessions(&self) -> impl Iterator<Item = &Session> {
        self.sessions_by_week.values().flatten()
    }
}

/// Highest key in `keys` that parses as a week number.
pub(crate) fn max_numeric_week<'a>(keys: impl Iterator<Item = &'a str>) -> Option<u32> {
    keys.filter_map(|k| k.trim().parse::<u32>().ok()).max()
}

// ---------------------------------------------------------------------------
// Blueprint-shaped plan
// ---------------------------------------------------------------------------

/// A plan describing an acceptable week-count window and a phase order
/// instead of concrete per-week sessions.
///
/// The authored object is carried through as-is: only `duration_weeks`
/// (when missing) and `discipline` are written into it. The typed fields
/// are read from it leniently and never cause a rejection.
#[derive(Debug, Clone, PartialEq)]
pub struct BlueprintPlan {
    /// Authored `name` when it is a string, else empty.
    pub name: String,
    /// Authored `description` when it is a string.
    pub description: Option<String>,
    pub duration_weeks: u32,
    pub min_weeks: u32,
    pub max_weeks: u32,
    /// String entries of `phase_blueprint.order`.
    pub phase_order: Vec<String>,
    pub discipline: CatalogDiscipline,
    body: Map<String, Value>,
}

impl BlueprintPlan {
    /// Build a blueprint from its authored object and classified window.
    ///
    /// A missing or null `duration_weeks` becomes `max_weeks`; an authored
    /// value that is not a week count stays in the body untouched and
    /// `max_weeks` is reported instead.
    pub fn from_authored(authored: &Map<String, Value>, min_weeks: u32, max_weeks: u32) -> Self {
        let mut body = authored.clone();
        if body.get("duration_weeks").is_none_or(Value::is_null) {
            body.insert("duration_weeks".into(), Value::from(max_weeks));
        }
        let discipline = CatalogDiscipline::Triathlon;
        body.insert("discipline".into(), Value::String(discipline.to_string()));

        let text = |key: &str| body.get(key).and_then(Value::as_str).map(str::to_owned);
        let phase_order = body
            .get("phase_blueprint")
            .and_then(|p| p.get("order"))
            .and_then(Value::as_array)
            .map(|order| order.iter().filter_map(Value::as_str).map(str::to_owned).collect())
            .unwrap_or_default();

        Self {
            name: text("name").unwrap_or_default(),
            description: text("description"),
            duration_weeks: week_count(body.get("duration_weeks")).unwrap_or(max_weeks),
            min_weeks,
            max_weeks,
            phase_order,
            discipline,
            body,
        }
    }

    /// The stored object: authored keys plus the filled-in fields.
    pub fn body(&self) -> &Map<String, Value> {
        &self.body
    }
}

impl Serialize for BlueprintPlan {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.body.serialize(serializer)
    }
}

// ---------------------------------------------------------------------------
// Compiled plan
// ---------------------------------------------------------------------------

/// Output of the compile pipeline: exactly one of the two plan shapes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CompiledPlan {
    Sessions(Plan),
    Blueprint(BlueprintPlan),
}

impl CompiledPlan {
    pub fn name(&self) -> &str {
        match self {
            Self::Sessions(p) => &p.name,
            Self::Blueprint(b) => &b.name,
        }
    }

    pub fn description(&self) -> Option<&str> {
        match self {
            Self::Sessions(p) => p.description.as_deref(),
            Self::Blueprint(b) => b.description.as_deref(),
        }
    }

    pub fn duration_weeks(&self) -> u32 {
        match self {
            Self::Sessions(p) => p.duration_weeks,
            Self::Blueprint(b) => b.duration_weeks,
        }
    }

    /// Catalog discipline tag; sessions plans default to `run` if inference
    /// never ran.
    pub fn discipline(&self) -> CatalogDiscipline {
        match self {
            Self::Sessions(p) => p.discipline.unwrap_or(CatalogDiscipline::Run),
            Self::Blueprint(b) => b.discipline,
        }
    }

    /// `"sessions"` or `"blueprint"`.
    pub fn shape(&self) -> &'static str {
        match self {
            Self::Sessions(_) => "sessions",
            Self::Blueprint(_) => "blueprint",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn weekday_parses_case_insensitively() {
        assert_eq!("saturday".parse::<Weekday>().unwrap(), Weekday::Saturday);
        assert_eq!("SUN".parse::<Weekday>().unwrap(), Weekday::Sunday);
        assert_eq!(" Monday ".parse::<Weekday>().unwrap(), Weekday::Monday);
        assert!("Someday".parse::<Weekday>().is_err());
    }

    #[test]
    fn weekday_serializes_capitalized() {
        let v = serde_json::to_value(Weekday::Thursday).unwrap();
        assert_eq!(v, json!("Thursday"));
        let back: Weekday = serde_json::from_value(json!("thursday")).unwrap();
        assert_eq!(back, Weekday::Thursday);
    }

    #[test]
    fn discipline_aliases() {
        for alias in ["bike", "Cycling", "RIDE", "cycle"] {
            assert_eq!(alias.parse::<Discipline>().unwrap(), Discipline::Ride);
        }
        assert_eq!("Running".parse::<Discipline>().unwrap(), Discipline::Run);
        assert!("yoga".parse::<Discipline>().is_err());
    }

    #[test]
    fn session_rejects_authoring_fields() {
        for field in ["macro", "main", "extra", "override_wu", "override_cd", "type"] {
            let v = json!({"day": "Monday", "discipline": "swim", field: "x"});
            assert!(
                serde_json::from_value::<Session>(v).is_err(),
                "{field} should be rejected"
            );
        }
    }

    #[test]
    fn session_serializes_display_cues() {
        let mut s = Session::new(Weekday::Monday, Discipline::Swim);
        s.main = Some("8x50 drill".into());
        let v = serde_json::to_value(&s).unwrap();
        assert_eq!(v["main"], json!("8x50 drill"));
        assert!(v.get("extra").is_none());
    }

    #[test]
    fn max_week_ignores_non_numeric_keys() {
        let keys = ["1", "10", "taper", "2"];
        assert_eq!(max_numeric_week(keys.into_iter()), Some(10));
        assert_eq!(max_numeric_week(["x"].into_iter()), None);
    }

    #[test]
    fn blueprint_keeps_unknown_keys() {
        let v = json!({
            "name": "Tri base",
            "duration_weeks": 16,
            "min_weeks": 8,
            "max_weeks": 16,
            "phase_blueprint": {"order": ["base", "build"], "taper_weeks": 2},
            "audience": "age-group"
        });
        let b = BlueprintPlan::from_authored(v.as_object().unwrap(), 8, 16);
        assert_eq!(b.phase_order, ["base", "build"]);
        let out = serde_json::to_value(&b).unwrap();
        assert_eq!(out["phase_blueprint"]["taper_weeks"], json!(2));
        assert_eq!(out["audience"], json!("age-group"));
        assert_eq!(out["discipline"], json!("triathlon"));
    }

    #[test]
    fn blueprint_fields_are_read_leniently() {
        let v = json!({
            "description": {"en": "Sprint build"},
            "duration_weeks": 12.0,
            "phase_blueprint": {"order": ["base", 2, "peak"]}
        });
        let b = BlueprintPlan::from_authored(v.as_object().unwrap(), 8, 16);
        assert_eq!(b.name, "");
        assert_eq!(b.description, None);
        assert_eq!(b.duration_weeks, 12);
        assert_eq!(b.phase_order, ["base", "peak"]);
        let out = serde_json::to_value(&b).unwrap();
        assert_eq!(out["description"], json!({"en": "Sprint build"}));
        assert_eq!(out["duration_weeks"], json!(12.0));
    }

    #[test]
    fn untyped_blueprint_duration_is_carried_through() {
        let v = json!({"duration_weeks": "sixteen", "phase_blueprint": {"order": ["base"]}});
        let b = BlueprintPlan::from_authored(v.as_object().unwrap(), 8, 16);
        assert_eq!(b.duration_weeks, 16);
        assert_eq!(b.body()["duration_weeks"], json!("sixteen"));
    }

    #[test]
    fn fractional_duration_is_accepted_and_whole_minutes_stay_integers() {
        let v = json!({"day": "Monday", "discipline": "run", "duration": 37.5});
        let s: Session = serde_json::from_value(v).unwrap();
        assert_eq!(s.duration, Some(37.5));
        assert_eq!(serde_json::to_value(&s).unwrap()["duration"], json!(37.5));

        let whole = Session::new(Weekday::Monday, Discipline::Run).duration(45);
        assert_eq!(serde_json::to_value(&whole).unwrap()["duration"], json!(45));
    }

    #[test]
    fn tags_are_deduplicated_in_first_seen_order() {
        let v = json!({
            "day": "Sunday",
            "discipline": "run",
            "tags": ["long_run", "key", "long_run", "key"]
        });
        let s: Session = serde_json::from_value(v).unwrap();
        assert_eq!(s.tags, ["long_run", "key"]);

        let built = Session::new(Weekday::Sunday, Discipline::Run).tag("a").tag("a");
        assert_eq!(built.tags, ["a"]);
    }
}
