use std::collections::HashMap;
use std::fmt::Display;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Community vote categories
///
/// Each category accepts a fixed, closed set of values; anything outside the
/// set is rejected at write time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum VoteCategory {
    Longevity,
    Sillage,
    Gender,
    PriceValue,
}

impl VoteCategory {
    /// The closed set of values this category accepts
    pub fn allowed_values(&self) -> &'static [&'static str] {
        match self {
            VoteCategory::Longevity => {
                &["very_weak", "weak", "moderate", "long_lasting", "eternal"]
            }
            VoteCategory::Sillage => &["intimate", "moderate", "strong", "enormous"],
            VoteCategory::Gender => &["female", "more_female", "unisex", "more_male", "male"],
            VoteCategory::PriceValue => {
                &["way_overpriced", "overpriced", "fair", "good_value", "great_value"]
            }
        }
    }

    pub fn is_allowed(&self, value: &str) -> bool {
        self.allowed_values().contains(&value)
    }

    pub fn all() -> &'static [VoteCategory] {
        &[
            VoteCategory::Longevity,
            VoteCategory::Sillage,
            VoteCategory::Gender,
            VoteCategory::PriceValue,
        ]
    }
}

impl std::str::FromStr for VoteCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "longevity" => Ok(VoteCategory::Longevity),
            "sillage" => Ok(VoteCategory::Sillage),
            "gender" => Ok(VoteCategory::Gender),
            "price_value" => Ok(VoteCategory::PriceValue),
            other => Err(format!("unknown vote category '{}'", other)),
        }
    }
}

impl Display for VoteCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            VoteCategory::Longevity => "longevity",
            VoteCategory::Sillage => "sillage",
            VoteCategory::Gender => "gender",
            VoteCategory::PriceValue => "price_value",
        };
        write!(f, "{}", label)
    }
}

/// A member's active vote on one (perfume, category) pair
///
/// A member holds at most one active vote per pair; a new vote overwrites
/// the previous one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Vote {
    pub id: Uuid,
    pub member_id: Uuid,
    pub perfume_id: Uuid,
    pub category: VoteCategory,
    pub value: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Vote {
    pub fn new(member_id: Uuid, perfume_id: Uuid, category: VoteCategory, value: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            member_id,
            perfume_id,
            category,
            value,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Per-category vote tally for one perfume
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VoteAggregate {
    pub perfume_id: Uuid,
    pub category: VoteCategory,
    /// Allowed value -> count; unset values are implicitly zero
    pub counts: HashMap<String, u64>,
    pub last_updated: DateTime<Utc>,
}

impl VoteAggregate {
    pub fn new(perfume_id: Uuid, category: VoteCategory) -> Self {
        Self {
            perfume_id,
            category,
            counts: HashMap::new(),
            last_updated: Utc::now(),
        }
    }

    pub fn record(&mut self, value: &str) {
        *self.counts.entry(value.to_string()).or_insert(0) += 1;
    }

    /// Number of active votes in this category
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }
}

/// Cached per-perfume snapshot of all category tallies
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VoteSummary {
    pub perfume_id: Uuid,
    pub by_category: HashMap<VoteCategory, VoteAggregate>,
    pub last_updated: DateTime<Utc>,
}

impl VoteSummary {
    /// Builds a summary by tallying raw votes
    pub fn from_votes(perfume_id: Uuid, votes: &[Vote]) -> Self {
        let mut by_category: HashMap<VoteCategory, VoteAggregate> = HashMap::new();
        for vote in votes {
            by_category
                .entry(vote.category)
                .or_insert_with(|| VoteAggregate::new(perfume_id, vote.category))
                .record(&vote.value);
        }

        Self {
            perfume_id,
            by_category,
            last_updated: Utc::now(),
        }
    }

    pub fn is_stale(&self, max_age: Duration) -> bool {
        Utc::now() - self.last_updated > max_age
    }
}
