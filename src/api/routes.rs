use axum::{
    routing::{delete, get, post, put},
    Router,
};

use super::handlers;
use super::AppState;

/// Creates the main API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        // Recommendations
        .route(
            "/members/:member_id/recommendations",
            get(handlers::get_personalized_recommendations),
        )
        .route(
            "/members/:member_id/recommendations/hybrid",
            get(handlers::get_hybrid_recommendations),
        )
        .route(
            "/perfumes/:perfume_id/similar",
            get(handlers::get_similar_perfumes),
        )
        .route(
            "/recommendations/brands/:brand",
            get(handlers::get_recommendations_by_brand),
        )
        .route(
            "/recommendations/notes/:note",
            get(handlers::get_recommendations_by_note),
        )
        .route(
            "/recommendations/survey",
            post(handlers::get_recommendations_by_survey),
        )
        .route(
            "/recommendations/clicks",
            post(handlers::record_recommendation_click),
        )
        // Votes
        .route(
            "/perfumes/:perfume_id/votes",
            get(handlers::get_vote_statistics),
        )
        .route("/perfumes/:perfume_id/votes", post(handlers::create_vote))
        .route("/perfumes/:perfume_id/votes", put(handlers::update_vote))
        .route("/perfumes/:perfume_id/votes", delete(handlers::delete_vote))
        .with_state(state)
}
