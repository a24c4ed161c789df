use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A member's review of a perfume
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Review {
    pub id: Uuid,
    pub member_id: Uuid,
    pub perfume_id: Uuid,
    /// Rating on a 1.0-5.0 scale
    pub rating: f32,
    pub created_at: DateTime<Utc>,
}

impl Review {
    pub fn new(member_id: Uuid, perfume_id: Uuid, rating: f32) -> Self {
        Self {
            id: Uuid::new_v4(),
            member_id,
            perfume_id,
            rating,
            created_at: Utc::now(),
        }
    }
}
