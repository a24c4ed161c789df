use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One option's slider position on the fragrance-type matrix question
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatrixScore {
    /// Fragrance family label, e.g. "floral" or "woody"
    pub option: String,
    /// Slider position on a 0-100 scale
    pub score: f32,
}

/// A past perfume rated on the survey's rating slider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RatedPerfume {
    pub perfume_id: Uuid,
    /// Rating on a 1.0-5.0 scale
    pub rating: f32,
}

/// A typed answer to one survey question
///
/// The `question_key` selects the per-question weight and, for choice
/// questions, the catalog field the selected options match against.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SurveyAnswer {
    /// Single- or multiple-choice question
    Choice {
        question_key: String,
        selected: Vec<String>,
    },
    /// Matrix-slider question ("how much of each fragrance type do you want")
    Matrix {
        question_key: String,
        scores: Vec<MatrixScore>,
    },
    /// Rating slider over perfumes the member has worn before
    PerfumeRatings {
        question_key: String,
        ratings: Vec<RatedPerfume>,
    },
}

impl SurveyAnswer {
    pub fn question_key(&self) -> &str {
        match self {
            SurveyAnswer::Choice { question_key, .. } => question_key,
            SurveyAnswer::Matrix { question_key, .. } => question_key,
            SurveyAnswer::PerfumeRatings { question_key, .. } => question_key,
        }
    }
}
