use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{
    RecommendationResult, SurveyAnswer, Vote, VoteAggregate, VoteCategory,
};

use super::AppState;

const DEFAULT_LIMIT: usize = 10;
const MAX_LIMIT: usize = 100;

// Request/Response types

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub limit: Option<usize>,
    pub member_id: Option<Uuid>,
}

impl ListParams {
    fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT)
    }
}

#[derive(Debug, Deserialize)]
pub struct SurveyRequest {
    pub answers: Vec<SurveyAnswer>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct ClickRequest {
    pub member_id: Uuid,
    pub perfume_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    pub member_id: Uuid,
    pub category: VoteCategory,
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteVoteParams {
    pub member_id: Uuid,
    pub category: VoteCategory,
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> StatusCode {
    StatusCode::OK
}

/// Personalized recommendations for a member
pub async fn get_personalized_recommendations(
    State(state): State<AppState>,
    Path(member_id): Path<Uuid>,
    Query(params): Query<ListParams>,
) -> AppResult<Json<RecommendationResult>> {
    let result = state
        .recommendations
        .personalized(member_id, params.limit())
        .await?;
    Ok(Json(result))
}

/// Hybrid (preference + popularity + season) recommendations
pub async fn get_hybrid_recommendations(
    State(state): State<AppState>,
    Path(member_id): Path<Uuid>,
    Query(params): Query<ListParams>,
) -> AppResult<Json<RecommendationResult>> {
    let result = state
        .recommendations
        .hybrid(member_id, params.limit())
        .await?;
    Ok(Json(result))
}

/// Perfumes similar to the given one
pub async fn get_similar_perfumes(
    State(state): State<AppState>,
    Path(perfume_id): Path<Uuid>,
    Query(params): Query<ListParams>,
) -> AppResult<Json<RecommendationResult>> {
    let result = state
        .recommendations
        .similar(params.member_id, perfume_id, params.limit())
        .await?;
    Ok(Json(result))
}

/// Top perfumes of a brand
pub async fn get_recommendations_by_brand(
    State(state): State<AppState>,
    Path(brand): Path<String>,
    Query(params): Query<ListParams>,
) -> AppResult<Json<RecommendationResult>> {
    let result = state
        .recommendations
        .by_brand(params.member_id, &brand, params.limit())
        .await?;
    Ok(Json(result))
}

/// Top perfumes carrying a note
pub async fn get_recommendations_by_note(
    State(state): State<AppState>,
    Path(note): Path<String>,
    Query(params): Query<ListParams>,
) -> AppResult<Json<RecommendationResult>> {
    let result = state
        .recommendations
        .by_note(params.member_id, &note, params.limit())
        .await?;
    Ok(Json(result))
}

/// One-shot recommendations from a survey
pub async fn get_recommendations_by_survey(
    State(state): State<AppState>,
    Json(request): Json<SurveyRequest>,
) -> AppResult<Json<RecommendationResult>> {
    let limit = request.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
    let result = state.survey.recommend(&request.answers, limit).await?;
    Ok(Json(result))
}

/// Records a click on a recommended perfume
pub async fn record_recommendation_click(
    State(state): State<AppState>,
    Json(request): Json<ClickRequest>,
) -> StatusCode {
    state
        .recommendations
        .record_click(request.member_id, request.perfume_id);
    StatusCode::ACCEPTED
}

/// Per-category vote tallies for a perfume
pub async fn get_vote_statistics(
    State(state): State<AppState>,
    Path(perfume_id): Path<Uuid>,
) -> AppResult<Json<HashMap<VoteCategory, VoteAggregate>>> {
    let aggregates = state.votes.get_aggregates(perfume_id).await?;
    Ok(Json(aggregates))
}

/// Creates or overwrites a member's vote
pub async fn create_vote(
    State(state): State<AppState>,
    Path(perfume_id): Path<Uuid>,
    Json(request): Json<VoteRequest>,
) -> AppResult<(StatusCode, Json<Vote>)> {
    let vote = state
        .votes
        .record_vote(request.member_id, perfume_id, request.category, &request.value)
        .await?;
    Ok((StatusCode::CREATED, Json(vote)))
}

/// Overwrites a member's vote; same upsert semantics as creation
pub async fn update_vote(
    State(state): State<AppState>,
    Path(perfume_id): Path<Uuid>,
    Json(request): Json<VoteRequest>,
) -> AppResult<Json<Vote>> {
    let vote = state
        .votes
        .record_vote(request.member_id, perfume_id, request.category, &request.value)
        .await?;
    Ok(Json(vote))
}

/// Removes a member's vote
pub async fn delete_vote(
    State(state): State<AppState>,
    Path(perfume_id): Path<Uuid>,
    Query(params): Query<DeleteVoteParams>,
) -> AppResult<StatusCode> {
    state
        .votes
        .delete_vote(params.member_id, perfume_id, params.category)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
