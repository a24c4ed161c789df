use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ranked search hit before blending
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredCandidate {
    pub perfume_id: Uuid,
    /// Engine-assigned relevance score, descending within a result page
    pub score: f32,
    /// Matched note/accord names, kept for observability
    #[serde(default)]
    pub matched_terms: Vec<String>,
}

impl ScoredCandidate {
    pub fn new(perfume_id: Uuid, score: f32) -> Self {
        Self {
            perfume_id,
            score,
            matched_terms: Vec::new(),
        }
    }
}

/// One entry of a blended recommendation list
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecommendedPerfume {
    pub perfume_id: Uuid,
    pub score: f32,
    /// Whether the requesting member has liked/favorited this perfume
    pub liked_by_member: bool,
}

/// Final blended, deduplicated recommendation list
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct RecommendationResult {
    pub items: Vec<RecommendedPerfume>,
}

impl RecommendationResult {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn perfume_ids(&self) -> Vec<Uuid> {
        self.items.iter().map(|item| item.perfume_id).collect()
    }
}
