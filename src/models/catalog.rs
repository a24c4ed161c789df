use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Calendar season used for seasonal recommendation slices
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Spring,
    Summer,
    Fall,
    Winter,
}

impl Season {
    /// Maps a calendar month (1-12) to a season
    ///
    /// March-May is spring, June-August is summer, September-November is
    /// fall, everything else is winter.
    pub fn from_month(month: u32) -> Self {
        match month {
            3..=5 => Season::Spring,
            6..=8 => Season::Summer,
            9..=11 => Season::Fall,
            _ => Season::Winter,
        }
    }

    /// Season for the current calendar month (UTC)
    pub fn current() -> Self {
        Self::from_month(Utc::now().month())
    }

    /// Lowercase label as stored in catalog documents
    pub fn as_str(&self) -> &'static str {
        match self {
            Season::Spring => "spring",
            Season::Summer => "summer",
            Season::Fall => "fall",
            Season::Winter => "winter",
        }
    }
}

impl std::fmt::Display for Season {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Catalog document for a single perfume as stored in the search index
///
/// This is the shape returned by the scored-search port's `get` and used to
/// seed similar-perfume queries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogSnapshot {
    pub id: Uuid,
    pub name: String,
    pub brand: String,
    #[serde(default)]
    pub notes: Vec<String>,
    #[serde(default)]
    pub accords: Vec<String>,
    #[serde(default)]
    pub concentration: Option<String>,
    #[serde(default = "default_approved")]
    pub approved: bool,
}

fn default_approved() -> bool {
    true
}
