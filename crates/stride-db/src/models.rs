use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Publication status of a catalog plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CatalogStatus {
    Draft,
    Published,
    Archived,
}

impl CatalogStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [Self; 3] = [Self::Draft, Self::Published, Self::Archived];
}

impl fmt::Display for CatalogStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Draft => "draft",
            Self::Published => "published",
            Self::Archived => "archived",
        };
        f.pad(s)
    }
}

impl FromStr for CatalogStatus {
    type Err = CatalogStatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "published" => Ok(Self::Published),
            "archived" => Ok(Self::Archived),
            other => Err(CatalogStatusParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`CatalogStatus`] string.
#[derive(Debug, Clone)]
pub struct CatalogStatusParseError(pub String);

impl fmt::Display for CatalogStatusParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid catalog status: {:?} (expected draft, published, or archived)",
            self.0
        )
    }
}

impl std::error::Error for CatalogStatusParseError {}

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A finished plan stored in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CatalogPlan {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    /// Catalog discipline tag (`run`, `ride`, `swim`, `strength`, `hybrid`, `triathlon`).
    pub discipline: String,
    pub duration_weeks: i32,
    pub tags: Vec<String>,
    pub status: CatalogStatus,
    /// `sessions` or `blueprint`.
    pub shape: String,
    /// The compiled plan as JSON.
    pub body: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
