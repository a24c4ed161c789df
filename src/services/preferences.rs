use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::MemberPreferenceProfile,
    ports::{CatalogReadPort, ReviewReadPort},
};

/// Minimum rating for a review to count as a positive preference signal
pub const POSITIVE_RATING_THRESHOLD: f32 = 4.0;

/// Cap on preferred notes and accords
pub const MAX_PREFERRED_ATTRIBUTES: usize = 10;

/// Cap on preferred brands
pub const MAX_PREFERRED_BRANDS: usize = 5;

/// Derives a member's taste profile from their positive reviews
///
/// Profiles are recomputed wholesale on every call; there is no incremental
/// update path.
pub struct PreferenceAnalysisService {
    reviews: Arc<dyn ReviewReadPort>,
    catalog: Arc<dyn CatalogReadPort>,
}

impl PreferenceAnalysisService {
    pub fn new(reviews: Arc<dyn ReviewReadPort>, catalog: Arc<dyn CatalogReadPort>) -> Self {
        Self { reviews, catalog }
    }

    /// Computes the member's full preference profile
    ///
    /// Tallies note, accord, and brand occurrences across the member's
    /// positively-rated perfumes and keeps the most frequent, ranked by
    /// (count desc, name asc). A member with no reviews gets an empty
    /// profile, not an error.
    pub async fn compute_profile(&self, member_id: Uuid) -> AppResult<MemberPreferenceProfile> {
        let all_reviews = self.reviews.reviews_by_member(member_id).await?;
        let reviewed_perfume_ids: HashSet<Uuid> =
            all_reviews.iter().map(|r| r.perfume_id).collect();

        let positive = self
            .reviews
            .positive_reviews(member_id, POSITIVE_RATING_THRESHOLD)
            .await?;

        if positive.is_empty() {
            tracing::debug!(member_id = %member_id, "No positive reviews, profile is empty");
            return Ok(MemberPreferenceProfile {
                reviewed_perfume_ids,
                ..MemberPreferenceProfile::empty(member_id)
            });
        }

        let mut note_counts: HashMap<String, u32> = HashMap::new();
        let mut accord_counts: HashMap<String, u32> = HashMap::new();
        let mut brand_counts: HashMap<String, u32> = HashMap::new();

        for review in &positive {
            for note in self.catalog.notes(review.perfume_id).await? {
                *note_counts.entry(note).or_insert(0) += 1;
            }
            for accord in self.catalog.accords(review.perfume_id).await? {
                *accord_counts.entry(accord).or_insert(0) += 1;
            }
            if let Some(brand) = self.catalog.brand(review.perfume_id).await? {
                *brand_counts.entry(brand).or_insert(0) += 1;
            }
        }

        let profile = MemberPreferenceProfile {
            member_id,
            preferred_notes: rank_top(note_counts, MAX_PREFERRED_ATTRIBUTES),
            preferred_accords: rank_top(accord_counts, MAX_PREFERRED_ATTRIBUTES),
            preferred_brands: rank_top(brand_counts, MAX_PREFERRED_BRANDS),
            reviewed_perfume_ids,
            computed_at: Utc::now(),
        };

        tracing::debug!(
            member_id = %member_id,
            positive_reviews = positive.len(),
            notes = profile.preferred_notes.len(),
            accords = profile.preferred_accords.len(),
            brands = profile.preferred_brands.len(),
            "Preference profile computed"
        );

        Ok(profile)
    }
}

/// Ranks tallied attributes by (count desc, name asc) and caps the result
///
/// The alphabetical tie-break keeps the ranking stable across runs; map
/// iteration order must never leak into the profile.
fn rank_top(counts: HashMap<String, u32>, cap: usize) -> Vec<String> {
    let mut entries: Vec<(String, u32)> = counts.into_iter().collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries.into_iter().take(cap).map(|(name, _)| name).collect()
}
