use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A member's inferred taste profile
///
/// Derived wholesale from the member's positive reviews; never updated
/// incrementally. The preference lists are ranked by descending occurrence
/// count with an alphabetical tie-break, capped at 10 attributes / 5 brands.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemberPreferenceProfile {
    pub member_id: Uuid,
    pub preferred_notes: Vec<String>,
    pub preferred_accords: Vec<String>,
    pub preferred_brands: Vec<String>,
    /// Every perfume the member has reviewed, positive or not
    pub reviewed_perfume_ids: HashSet<Uuid>,
    pub computed_at: DateTime<Utc>,
}

impl MemberPreferenceProfile {
    /// Empty profile for a member with no positive reviews (or no reviews)
    pub fn empty(member_id: Uuid) -> Self {
        Self {
            member_id,
            preferred_notes: Vec::new(),
            preferred_accords: Vec::new(),
            preferred_brands: Vec::new(),
            reviewed_perfume_ids: HashSet::new(),
            computed_at: Utc::now(),
        }
    }

    /// True when the profile carries no preference signal at all
    pub fn has_no_signal(&self) -> bool {
        self.preferred_notes.is_empty()
            && self.preferred_accords.is_empty()
            && self.preferred_brands.is_empty()
    }

    /// True when the profile was computed longer than `max_age` ago
    pub fn is_stale(&self, max_age: Duration) -> bool {
        Utc::now() - self.computed_at > max_age
    }
}
