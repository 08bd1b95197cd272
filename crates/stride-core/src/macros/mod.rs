//! Session macro table.
//!
//! Provides the built-in library of session macros: alias tokens such as
//! `@SWIM_TECH_1200_DEFAULT` that expand to a fixed, ordered list of step
//! identifiers. The macros are defined in `macros.toml` and embedded in the
//! binary at compile time.

use std::sync::LazyLock;

use serde::Deserialize;

/// A single macro definition from the embedded library.
#[derive(Debug, Clone, Deserialize)]
pub struct MacroDefinition {
    /// Canonical macro name, without the leading `@` (e.g. `SWIM_TECH_1200_DEFAULT`).
    pub name: String,
    /// Discipline the macro was written for (e.g. `swim`, `run`).
    pub discipline: String,
    /// Human-readable description of the session.
    pub description: String,
    /// Alternative names that resolve to the same steps.
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Ordered step identifiers the macro expands to.
    pub steps: Vec<String>,
}

/// A lookup table of macro definitions.
#[derive(Debug, Clone, Deserialize)]
pub struct MacroTable {
    #[serde(rename = "macros")]
    entries: Vec<MacroDefinition>,
}

/// The embedded macro library TOML.
static MACROS_TOML: &str = include_str!("macros.toml");

static BUILTIN: LazyLock<MacroTable> = LazyLock::new(|| {
    MacroTable::from_toml(MACROS_TOML).expect("embedded macros.toml is invalid")
});

impl MacroTable {
    /// The built-in macro table.
    ///
    /// # Panics
    ///
    /// Panics on first use if the embedded TOML is malformed. This is a
    /// compile-time invariant -- if the binary was built, the TOML is valid.
    pub fn builtin() -> &'static MacroTable {
        &BUILTIN
    }

    /// Parse a macro table from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// All definitions, in the order they were declared.
    pub fn entries(&self) -> &[MacroDefinition] {
        &self.entries
    }

    /// Find the definition bound to `token` by name or alias.
    pub fn lookup(&self, token: &str) -> Option<&MacroDefinition> {
        let wanted = normalize_token(token);
        if wanted.is_empty() {
            return None;
        }
        self.entries.iter().find(|m| {
            normalize_token(&m.name) == wanted
                || m.aliases.iter().any(|a| normalize_token(a) == wanted)
        })
    }

    /// Expand `token` into its step list, or `None` if the alias is unknown.
    pub fn expand(&self, token: &str) -> Option<&[String]> {
        self.lookup(token).map(|m| m.steps.as_slice())
    }
}

/// Normalize a macro token: trim, drop one leading `@`, uppercase.
pub fn normalize_token(token: &str) -> String {
    let trimmed = token.trim();
    let bare = trimmed.strip_prefix('@').unwrap_or(trimmed);
    bare.trim().to_ascii_uppercase()
}

/// Returns true if free text looks like a macro reference (leading `@`).
pub fn looks_like_macro(text: &str) -> bool {
    text.trim_start().starts_with('@')
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
