use std::sync::Arc;

use crate::services::{PreferenceCache, RecommendationService, SurveyService, VoteService};

/// Shared application state
///
/// Services are wired once at startup by the composition root and shared
/// across handlers.
#[derive(Clone)]
pub struct AppState {
    pub recommendations: Arc<RecommendationService>,
    pub votes: Arc<VoteService>,
    pub survey: Arc<SurveyService>,
    pub profiles: Arc<PreferenceCache>,
}

impl AppState {
    pub fn new(
        recommendations: Arc<RecommendationService>,
        votes: Arc<VoteService>,
        survey: Arc<SurveyService>,
        profiles: Arc<PreferenceCache>,
    ) -> Self {
        Self {
            recommendations,
            votes,
            survey,
            profiles,
        }
    }
}
