use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    events::DomainEvent,
    models::{MemberPreferenceProfile, RecommendationResult, RecommendedPerfume, Season},
    ports::{CatalogReadPort, EventBus, MemberReadPort, ScoredSearchPort},
    search::{fields, BoolQuery, QueryClause},
    services::{preference_cache::PreferenceCache, tasks::TaskPool},
};

/// Boost applied to a profile's preferred notes
pub const NOTE_BOOST: f32 = 2.0;

/// Boost applied to a profile's preferred accords
pub const ACCORD_BOOST: f32 = 1.5;

/// Boost applied to a profile's preferred brands
pub const BRAND_BOOST: f32 = 1.0;

/// Small nudges for same-brand and same-concentration similarity
const SIMILAR_BRAND_BOOST: f32 = 0.5;
const SIMILAR_CONCENTRATION_BOOST: f32 = 0.5;

/// Share of a hybrid list reserved for preference matches
pub const PREFERENCE_SHARE: f32 = 0.6;

/// Share of a hybrid list reserved for most-reviewed popularity
pub const POPULARITY_SHARE: f32 = 0.3;

/// Produces personalized, similar-item, and hybrid recommendation lists
///
/// Blends profile-driven search results with popularity and seasonal
/// sources under fixed quotas. Every returned list fires impression events
/// through the task pool; impressions never block or fail a call.
pub struct RecommendationService {
    profiles: Arc<PreferenceCache>,
    search: Arc<dyn ScoredSearchPort>,
    catalog: Arc<dyn CatalogReadPort>,
    members: Arc<dyn MemberReadPort>,
    events: Arc<dyn EventBus>,
    tasks: TaskPool,
}

impl RecommendationService {
    pub fn new(
        profiles: Arc<PreferenceCache>,
        search: Arc<dyn ScoredSearchPort>,
        catalog: Arc<dyn CatalogReadPort>,
        members: Arc<dyn MemberReadPort>,
        events: Arc<dyn EventBus>,
        tasks: TaskPool,
    ) -> Self {
        Self {
            profiles,
            search,
            catalog,
            members,
            events,
            tasks,
        }
    }

    /// Profile-driven recommendations for a member
    ///
    /// A member with no preference signal gets the most-reviewed list
    /// instead of an empty page, and a failing search engine degrades the
    /// same way rather than surfacing an error.
    pub async fn personalized(
        &self,
        member_id: Uuid,
        limit: usize,
    ) -> AppResult<RecommendationResult> {
        let profile = self.profile_with_repair(member_id).await?;

        let result = if profile.has_no_signal() {
            tracing::debug!(member_id = %member_id, "Profile has no signal, serving popular");
            self.popular(Some(member_id), limit).await?
        } else {
            let query = preference_query(&profile);
            match self.search.search(&query, limit).await {
                Ok(candidates) => {
                    let pairs: Vec<(Uuid, f32)> = candidates
                        .into_iter()
                        .map(|c| (c.perfume_id, c.score))
                        .collect();
                    self.annotate(Some(member_id), pairs).await
                }
                Err(AppError::SearchUnavailable(msg)) => {
                    tracing::warn!(
                        member_id = %member_id,
                        error = %msg,
                        "Search unavailable, degrading to popular"
                    );
                    self.popular(Some(member_id), limit).await?
                }
                Err(e) => return Err(e),
            }
        };

        self.emit_impressions(Some(member_id), &result);
        Ok(result)
    }

    /// Perfumes similar to a seed perfume
    ///
    /// Search failures propagate; callers may retry.
    pub async fn similar(
        &self,
        member_id: Option<Uuid>,
        perfume_id: Uuid,
        limit: usize,
    ) -> AppResult<RecommendationResult> {
        let seed = self.search.get(perfume_id).await?;

        let mut query = BoolQuery::new()
            .minimum_should_match(1)
            .filter(QueryClause::term(fields::APPROVED, "true", 1.0))
            .must_not(QueryClause::ids(vec![perfume_id]));

        for note in &seed.notes {
            query = query.should(QueryClause::term(fields::NOTES, note.clone(), NOTE_BOOST));
        }
        for accord in &seed.accords {
            query = query.should(QueryClause::term(
                fields::ACCORDS,
                accord.clone(),
                ACCORD_BOOST,
            ));
        }
        query = query.should(QueryClause::term(
            fields::BRAND,
            seed.brand.clone(),
            SIMILAR_BRAND_BOOST,
        ));
        if let Some(concentration) = &seed.concentration {
            query = query.should(QueryClause::term(
                fields::CONCENTRATION,
                concentration.clone(),
                SIMILAR_CONCENTRATION_BOOST,
            ));
        }

        let candidates = self.search.search(&query, limit).await?;
        let pairs: Vec<(Uuid, f32)> = candidates
            .into_iter()
            .map(|c| (c.perfume_id, c.score))
            .collect();
        let result = self.annotate(member_id, pairs).await;

        self.emit_impressions(member_id, &result);
        Ok(result)
    }

    /// Quota-blended list: preference matches, then popularity, then season
    ///
    /// Preference matches fill at most 60% of the limit, popularity 30%,
    /// the current season the remainder; duplicates keep their first slot
    /// and leftover capacity backfills from further popular perfumes.
    /// Search failures propagate.
    pub async fn hybrid(&self, member_id: Uuid, limit: usize) -> AppResult<RecommendationResult> {
        let profile = self.profile_with_repair(member_id).await?;

        let preference_quota = quota(limit, PREFERENCE_SHARE);
        let popularity_quota = quota(limit, POPULARITY_SHARE);

        let mut scores: HashMap<Uuid, f32> = HashMap::new();
        let preference_candidates: Vec<Uuid> = if profile.has_no_signal() {
            Vec::new()
        } else {
            let query = preference_query(&profile);
            let candidates = self.search.search(&query, limit).await?;
            candidates
                .into_iter()
                .map(|c| {
                    scores.insert(c.perfume_id, c.score);
                    c.perfume_id
                })
                .collect()
        };

        // Over-fetch popularity so the backfill phase has headroom
        let popular = self.catalog.most_reviewed(limit * 2).await?;
        let season = Season::current();
        let seasonal = self.catalog.by_season(season, limit).await?;

        let mut selected: Vec<Uuid> = Vec::with_capacity(limit);
        let mut seen: HashSet<Uuid> = HashSet::new();

        take_into(
            &mut selected,
            &mut seen,
            &preference_candidates,
            preference_quota,
            limit,
        );
        take_into(&mut selected, &mut seen, &popular, popularity_quota, limit);
        let seasonal_room = limit.saturating_sub(selected.len());
        take_into(&mut selected, &mut seen, &seasonal, seasonal_room, limit);
        let backfill_room = limit.saturating_sub(selected.len());
        take_into(&mut selected, &mut seen, &popular, backfill_room, limit);

        tracing::debug!(
            member_id = %member_id,
            season = %season,
            selected = selected.len(),
            "Hybrid recommendation blended"
        );

        let pairs: Vec<(Uuid, f32)> = selected
            .into_iter()
            .map(|id| (id, scores.get(&id).copied().unwrap_or(0.0)))
            .collect();
        let result = self.annotate(Some(member_id), pairs).await;

        self.emit_impressions(Some(member_id), &result);
        Ok(result)
    }

    /// Top perfumes of one brand
    pub async fn by_brand(
        &self,
        member_id: Option<Uuid>,
        brand: &str,
        limit: usize,
    ) -> AppResult<RecommendationResult> {
        let query = BoolQuery::new()
            .minimum_should_match(1)
            .filter(QueryClause::term(fields::APPROVED, "true", 1.0))
            .should(QueryClause::term(fields::BRAND, brand, BRAND_BOOST));

        self.search_and_annotate(member_id, query, limit).await
    }

    /// Top perfumes carrying one note
    pub async fn by_note(
        &self,
        member_id: Option<Uuid>,
        note: &str,
        limit: usize,
    ) -> AppResult<RecommendationResult> {
        let query = BoolQuery::new()
            .minimum_should_match(1)
            .filter(QueryClause::term(fields::APPROVED, "true", 1.0))
            .should(QueryClause::term(fields::NOTES, note, NOTE_BOOST));

        self.search_and_annotate(member_id, query, limit).await
    }

    /// Records that a member clicked a recommended perfume
    pub fn record_click(&self, member_id: Uuid, perfume_id: Uuid) {
        self.events.publish(DomainEvent::RecommendationClicked {
            member_id,
            perfume_id,
        });
    }

    /// Most-reviewed perfumes, the shared popularity fallback
    async fn popular(
        &self,
        member_id: Option<Uuid>,
        limit: usize,
    ) -> AppResult<RecommendationResult> {
        let ids = self.catalog.most_reviewed(limit).await?;
        let pairs: Vec<(Uuid, f32)> = ids.into_iter().map(|id| (id, 0.0)).collect();
        Ok(self.annotate(member_id, pairs).await)
    }

    async fn search_and_annotate(
        &self,
        member_id: Option<Uuid>,
        query: BoolQuery,
        limit: usize,
    ) -> AppResult<RecommendationResult> {
        let candidates = self.search.search(&query, limit).await?;
        let pairs: Vec<(Uuid, f32)> = candidates
            .into_iter()
            .map(|c| (c.perfume_id, c.score))
            .collect();
        let result = self.annotate(member_id, pairs).await;

        self.emit_impressions(member_id, &result);
        Ok(result)
    }

    /// Loads the member's profile, scheduling a background refresh if stale
    ///
    /// The stale profile is still served immediately.
    async fn profile_with_repair(&self, member_id: Uuid) -> AppResult<MemberPreferenceProfile> {
        let profile = self.profiles.get(member_id).await?;

        if profile.is_stale(PreferenceCache::staleness_window()) {
            tracing::debug!(member_id = %member_id, "Profile stale, scheduling refresh");
            let profiles = Arc::clone(&self.profiles);
            self.tasks
                .spawn("profile-refresh", async move { profiles.refresh(member_id).await });
        }

        Ok(profile)
    }

    /// Attaches liked-by-member flags
    ///
    /// A failing likes lookup downgrades to unmarked items instead of
    /// failing the list.
    async fn annotate(
        &self,
        member_id: Option<Uuid>,
        pairs: Vec<(Uuid, f32)>,
    ) -> RecommendationResult {
        let liked: HashSet<Uuid> = match member_id {
            Some(id) => match self.members.liked_perfume_ids(id).await {
                Ok(liked) => liked,
                Err(e) => {
                    tracing::warn!(
                        member_id = %id,
                        error = %e,
                        "Likes lookup failed, serving unmarked list"
                    );
                    HashSet::new()
                }
            },
            None => HashSet::new(),
        };

        RecommendationResult {
            items: pairs
                .into_iter()
                .map(|(perfume_id, score)| RecommendedPerfume {
                    perfume_id,
                    score,
                    liked_by_member: liked.contains(&perfume_id),
                })
                .collect(),
        }
    }

    /// Publishes one impression event per returned item on the task pool
    fn emit_impressions(&self, member_id: Option<Uuid>, result: &RecommendationResult) {
        if result.is_empty() {
            return;
        }

        let events = Arc::clone(&self.events);
        let ids = result.perfume_ids();
        self.tasks.spawn("recommendation-impressions", async move {
            for perfume_id in ids {
                events.publish(DomainEvent::RecommendationImpression {
                    member_id,
                    perfume_id,
                });
            }
            Ok(())
        });
    }
}

/// Builds the weighted query for a member's taste profile
///
/// Notes outweigh accords, accords outweigh brands; everything the member
/// has already reviewed is excluded.
fn preference_query(profile: &MemberPreferenceProfile) -> BoolQuery {
    let mut query = BoolQuery::new()
        .minimum_should_match(1)
        .filter(QueryClause::term(fields::APPROVED, "true", 1.0));

    for note in &profile.preferred_notes {
        query = query.should(QueryClause::term(fields::NOTES, note.clone(), NOTE_BOOST));
    }
    for accord in &profile.preferred_accords {
        query = query.should(QueryClause::term(
            fields::ACCORDS,
            accord.clone(),
            ACCORD_BOOST,
        ));
    }
    for brand in &profile.preferred_brands {
        query = query.should(QueryClause::term(fields::BRAND, brand.clone(), BRAND_BOOST));
    }

    if !profile.reviewed_perfume_ids.is_empty() {
        let mut excluded: Vec<Uuid> = profile.reviewed_perfume_ids.iter().copied().collect();
        excluded.sort();
        query = query.must_not(QueryClause::ids(excluded));
    }

    query
}

/// Number of slots a source may fill for the given share of the limit
fn quota(limit: usize, share: f32) -> usize {
    (limit as f32 * share).ceil() as usize
}

/// Appends ids from `source` until its budget or the overall limit is hit,
/// skipping anything already selected
fn take_into(
    selected: &mut Vec<Uuid>,
    seen: &mut HashSet<Uuid>,
    source: &[Uuid],
    budget: usize,
    limit: usize,
) {
    let mut taken = 0;
    for id in source {
        if taken >= budget || selected.len() >= limit {
            break;
        }
        if seen.insert(*id) {
            selected.push(*id);
            taken += 1;
        }
    }
}
