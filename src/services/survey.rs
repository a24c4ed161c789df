use std::sync::Arc;

use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{RatedPerfume, RecommendationResult, RecommendedPerfume, SurveyAnswer},
    ports::{CatalogReadPort, ScoredSearchPort},
    search::{fields, BoolQuery, QueryClause},
};

/// Matrix options scoring at or below this contribute nothing
pub const MATRIX_SCORE_THRESHOLD: f32 = 50.0;

/// Rating at or above which a past perfume boosts its attributes
const LIKED_RATING_MIN: f32 = 4.0;

/// Rating at or below which a past perfume's attributes are deprioritized
const DISLIKED_RATING_MAX: f32 = 2.0;

/// Extra factor on note boosts from liked past perfumes
const LIKED_NOTE_FACTOR: f32 = 1.5;

/// Brand factor on boosts from liked past perfumes
const LIKED_BRAND_FACTOR: f32 = 0.5;

/// Shared low boost for disliked notes and accords
///
/// Disliked attributes stay in the query as weak should-clauses instead of
/// exclusions; inside an OR-combined query this can only add score mass,
/// never subtract it. Kept as-is pending a product decision on negative
/// boosting.
const DISLIKED_BOOST: f32 = 0.35;

/// Fixed per-question weights
///
/// The fragrance-type matrix dominates, past ratings come second. Unknown
/// question keys contribute nothing.
fn question_weight(question_key: &str) -> Option<f32> {
    match question_key {
        "fragrance_types" => Some(2.0),
        "perfume_ratings" => Some(1.8),
        "gender" => Some(1.5),
        "season" => Some(1.0),
        "occasion" => Some(0.8),
        "intensity" => Some(0.7),
        "age_group" => Some(0.5),
        _ => None,
    }
}

/// Catalog field a choice question's options match against
fn choice_field(question_key: &str) -> Option<&'static str> {
    match question_key {
        "gender" => Some(fields::GENDER),
        "season" => Some(fields::SEASONS),
        "occasion" => Some(fields::OCCASIONS),
        "intensity" => Some(fields::INTENSITY),
        "age_group" => Some(fields::AGE_GROUP),
        _ => None,
    }
}

/// Keyword expansion for matrix fragrance families
fn family_keywords(option: &str) -> &'static [&'static str] {
    match option.to_lowercase().as_str() {
        "floral" => &["floral", "flower", "rose", "jasmine", "lily"],
        "woody" => &["woody", "wood", "sandalwood", "cedar", "vetiver"],
        "citrus" => &["citrus", "bergamot", "lemon", "orange", "grapefruit"],
        "sweet" => &["sweet", "vanilla", "caramel", "honey", "gourmand"],
        "fresh" => &["fresh", "aquatic", "marine", "green", "ozonic"],
        "spicy" => &["spicy", "oriental", "amber", "cinnamon", "incense"],
        "musky" => &["musk", "musky", "powdery", "soft"],
        "fruity" => &["fruity", "peach", "apple", "berry", "pear"],
        _ => &[],
    }
}

/// One-shot survey recommendations
///
/// Translates typed survey answers into a single weighted boolean query
/// against the approved catalog and runs it through the scored-search port.
pub struct SurveyService {
    catalog: Arc<dyn CatalogReadPort>,
    search: Arc<dyn ScoredSearchPort>,
}

impl SurveyService {
    pub fn new(catalog: Arc<dyn CatalogReadPort>, search: Arc<dyn ScoredSearchPort>) -> Self {
        Self { catalog, search }
    }

    /// Builds the weighted query for a set of survey answers
    ///
    /// Unknown question keys and unmapped options are skipped silently;
    /// they produce no clause and no error.
    pub async fn build_query(&self, answers: &[SurveyAnswer]) -> AppResult<BoolQuery> {
        let mut query = BoolQuery::new()
            .minimum_should_match(1)
            .filter(QueryClause::term(fields::APPROVED, "true", 1.0));

        for answer in answers {
            let Some(weight) = question_weight(answer.question_key()) else {
                tracing::debug!(
                    question_key = answer.question_key(),
                    "Unknown survey question, skipping"
                );
                continue;
            };

            match answer {
                SurveyAnswer::Choice {
                    question_key,
                    selected,
                } => apply_choice(&mut query, question_key, selected, weight),
                SurveyAnswer::Matrix { scores, .. } => apply_matrix(&mut query, scores, weight),
                SurveyAnswer::PerfumeRatings { ratings, .. } => {
                    self.apply_ratings(&mut query, ratings, weight).await;
                }
            }
        }

        Ok(query)
    }

    /// Runs a survey through the catalog and returns the ranked result
    ///
    /// Search failures propagate; there is no fallback list for surveys.
    pub async fn recommend(
        &self,
        answers: &[SurveyAnswer],
        limit: usize,
    ) -> AppResult<RecommendationResult> {
        let query = self.build_query(answers).await?;

        if !query.has_should_clauses() {
            tracing::debug!("Survey produced no scoring clauses, returning empty result");
            return Ok(RecommendationResult::default());
        }

        let candidates = self.search.search(&query, limit).await?;

        Ok(RecommendationResult {
            items: candidates
                .into_iter()
                .map(|c| RecommendedPerfume {
                    perfume_id: c.perfume_id,
                    score: c.score,
                    liked_by_member: false,
                })
                .collect(),
        })
    }

    /// Clauses from the past-ratings slider
    ///
    /// Liked perfumes (rating >= 4.0) boost their notes, accords, and brand
    /// scaled by the rating; disliked ones (rating <= 2.0) pool their notes
    /// and accords into weak should-clauses. A rated perfume missing from
    /// the catalog is skipped.
    async fn apply_ratings(&self, query: &mut BoolQuery, ratings: &[RatedPerfume], weight: f32) {
        let mut disliked_notes: Vec<String> = Vec::new();
        let mut disliked_accords: Vec<String> = Vec::new();

        for rated in ratings {
            if rated.rating >= LIKED_RATING_MIN {
                let rating_factor = rated.rating / 5.0;
                match self.perfume_attributes(rated.perfume_id).await {
                    Ok((notes, accords, brand)) => {
                        for note in notes {
                            query.should.push(QueryClause::term(
                                fields::NOTES,
                                note,
                                weight * rating_factor * LIKED_NOTE_FACTOR,
                            ));
                        }
                        for accord in accords {
                            query.should.push(QueryClause::term(
                                fields::ACCORDS,
                                accord,
                                weight * rating_factor,
                            ));
                        }
                        if let Some(brand) = brand {
                            query.should.push(QueryClause::term(
                                fields::BRAND,
                                brand,
                                weight * rating_factor * LIKED_BRAND_FACTOR,
                            ));
                        }
                    }
                    Err(e) => {
                        tracing::warn!(
                            perfume_id = %rated.perfume_id,
                            error = %e,
                            "Skipping rated perfume, attributes unavailable"
                        );
                    }
                }
            } else if rated.rating <= DISLIKED_RATING_MAX {
                match self.perfume_attributes(rated.perfume_id).await {
                    Ok((notes, accords, _)) => {
                        disliked_notes.extend(notes);
                        disliked_accords.extend(accords);
                    }
                    Err(e) => {
                        tracing::warn!(
                            perfume_id = %rated.perfume_id,
                            error = %e,
                            "Skipping rated perfume, attributes unavailable"
                        );
                    }
                }
            }
        }

        if !disliked_notes.is_empty() {
            query
                .should
                .push(QueryClause::terms(fields::NOTES, disliked_notes, DISLIKED_BOOST));
        }
        if !disliked_accords.is_empty() {
            query.should.push(QueryClause::terms(
                fields::ACCORDS,
                disliked_accords,
                DISLIKED_BOOST,
            ));
        }
    }

    async fn perfume_attributes(
        &self,
        perfume_id: Uuid,
    ) -> AppResult<(Vec<String>, Vec<String>, Option<String>)> {
        let notes = self.catalog.notes(perfume_id).await?;
        let accords = self.catalog.accords(perfume_id).await?;
        let brand = self.catalog.brand(perfume_id).await?;
        Ok((notes, accords, brand))
    }
}

/// Clauses from a single- or multiple-choice answer
fn apply_choice(query: &mut BoolQuery, question_key: &str, selected: &[String], weight: f32) {
    let Some(field) = choice_field(question_key) else {
        tracing::debug!(question_key = question_key, "Choice question has no field mapping");
        return;
    };

    for option in selected {
        query
            .should
            .push(QueryClause::term(field, option.clone(), weight));
    }
}

/// Clauses from the fragrance-type matrix
///
/// Only options above the midpoint contribute; the boost scales linearly
/// from 0 at the midpoint to the full question weight at 100.
fn apply_matrix(query: &mut BoolQuery, scores: &[crate::models::MatrixScore], weight: f32) {
    for entry in scores {
        if entry.score <= MATRIX_SCORE_THRESHOLD {
            continue;
        }

        let normalized = (entry.score - MATRIX_SCORE_THRESHOLD) / MATRIX_SCORE_THRESHOLD;
        let boost = weight * normalized;
        let keywords = family_keywords(&entry.option);

        if keywords.is_empty() {
            tracing::debug!(option = %entry.option, "Unmapped fragrance family, skipping");
            continue;
        }

        for keyword in keywords {
            query.should.push(QueryClause::multi_match(
                &[fields::NOTES, fields::ACCORDS, fields::DESCRIPTION],
                *keyword,
                boost,
            ));
        }
    }
}
