use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use parfum_api::error::{AppError, AppResult};
use parfum_api::events::{BroadcastEventBus, DomainEvent};
use parfum_api::models::{
    CatalogSnapshot, MatrixScore, MemberPreferenceProfile, RatedPerfume, Review, ScoredCandidate,
    Season, SurveyAnswer, Vote, VoteCategory, VoteSummary,
};
use parfum_api::ports::{
    AggregateStore, CatalogReadPort, EventBus, MemberReadPort, ProfileStore, ReviewReadPort,
    ScoredSearchPort, VoteReadPort, VoteWritePort,
};
use parfum_api::search::BoolQuery;
use parfum_api::services::{
    spawn_event_handlers, PreferenceAnalysisService, PreferenceCache, RecommendationService,
    SurveyService, TaskPool, VoteService,
};

// In-memory fakes

#[derive(Default)]
struct FakeReviews {
    by_member: HashMap<Uuid, Vec<Review>>,
}

#[async_trait]
impl ReviewReadPort for FakeReviews {
    async fn positive_reviews(&self, member_id: Uuid, min_rating: f32) -> AppResult<Vec<Review>> {
        Ok(self
            .by_member
            .get(&member_id)
            .map(|reviews| {
                reviews
                    .iter()
                    .filter(|r| r.rating >= min_rating)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn reviews_by_member(&self, member_id: Uuid) -> AppResult<Vec<Review>> {
        Ok(self.by_member.get(&member_id).cloned().unwrap_or_default())
    }
}

#[derive(Default)]
struct FakeCatalog {
    notes: HashMap<Uuid, Vec<String>>,
    accords: HashMap<Uuid, Vec<String>>,
    brands: HashMap<Uuid, String>,
    most_reviewed: Vec<Uuid>,
    seasonal: Vec<Uuid>,
}

#[async_trait]
impl CatalogReadPort for FakeCatalog {
    async fn notes(&self, perfume_id: Uuid) -> AppResult<Vec<String>> {
        Ok(self.notes.get(&perfume_id).cloned().unwrap_or_default())
    }

    async fn accords(&self, perfume_id: Uuid) -> AppResult<Vec<String>> {
        Ok(self.accords.get(&perfume_id).cloned().unwrap_or_default())
    }

    async fn brand(&self, perfume_id: Uuid) -> AppResult<Option<String>> {
        Ok(self.brands.get(&perfume_id).cloned())
    }

    async fn most_reviewed(&self, limit: usize) -> AppResult<Vec<Uuid>> {
        Ok(self.most_reviewed.iter().take(limit).copied().collect())
    }

    async fn by_season(&self, _season: Season, limit: usize) -> AppResult<Vec<Uuid>> {
        Ok(self.seasonal.iter().take(limit).copied().collect())
    }
}

#[derive(Default)]
struct FakeMembers {
    liked: HashSet<Uuid>,
}

#[async_trait]
impl MemberReadPort for FakeMembers {
    async fn liked_perfume_ids(&self, _member_id: Uuid) -> AppResult<HashSet<Uuid>> {
        Ok(self.liked.clone())
    }

    async fn member_ids_with_reviews(&self) -> AppResult<Vec<Uuid>> {
        Ok(vec![])
    }
}

struct FakeSearch {
    results: Vec<ScoredCandidate>,
    snapshots: HashMap<Uuid, CatalogSnapshot>,
}

#[async_trait]
impl ScoredSearchPort for FakeSearch {
    async fn search(&self, _query: &BoolQuery, limit: usize) -> AppResult<Vec<ScoredCandidate>> {
        Ok(self.results.iter().take(limit).cloned().collect())
    }

    async fn get(&self, perfume_id: Uuid) -> AppResult<CatalogSnapshot> {
        self.snapshots
            .get(&perfume_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("perfume {}", perfume_id)))
    }
}

#[derive(Default)]
struct InMemoryProfileStore {
    profiles: Mutex<HashMap<Uuid, MemberPreferenceProfile>>,
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn load(&self, member_id: Uuid) -> AppResult<Option<MemberPreferenceProfile>> {
        Ok(self.profiles.lock().unwrap().get(&member_id).cloned())
    }

    async fn save(&self, profile: &MemberPreferenceProfile) -> AppResult<()> {
        self.profiles
            .lock()
            .unwrap()
            .insert(profile.member_id, profile.clone());
        Ok(())
    }

    async fn remove(&self, member_id: Uuid) -> AppResult<()> {
        self.profiles.lock().unwrap().remove(&member_id);
        Ok(())
    }
}

#[derive(Default)]
struct InMemoryAggregateStore {
    summaries: Mutex<HashMap<Uuid, VoteSummary>>,
}

#[async_trait]
impl AggregateStore for InMemoryAggregateStore {
    async fn load(&self, perfume_id: Uuid) -> AppResult<Option<VoteSummary>> {
        Ok(self.summaries.lock().unwrap().get(&perfume_id).cloned())
    }

    async fn save(&self, summary: &VoteSummary) -> AppResult<()> {
        self.summaries
            .lock()
            .unwrap()
            .insert(summary.perfume_id, summary.clone());
        Ok(())
    }
}

/// Vote store that fails on duplicate inserts, like a unique index would
#[derive(Default)]
struct InMemoryVoteStore {
    votes: Mutex<HashMap<(Uuid, Uuid, VoteCategory), Vote>>,
}

#[async_trait]
impl VoteReadPort for InMemoryVoteStore {
    async fn find_active(
        &self,
        member_id: Uuid,
        perfume_id: Uuid,
        category: VoteCategory,
    ) -> AppResult<Option<Vote>> {
        Ok(self
            .votes
            .lock()
            .unwrap()
            .get(&(member_id, perfume_id, category))
            .cloned())
    }

    async fn votes_for_perfume(&self, perfume_id: Uuid) -> AppResult<Vec<Vote>> {
        Ok(self
            .votes
            .lock()
            .unwrap()
            .values()
            .filter(|v| v.perfume_id == perfume_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl VoteWritePort for InMemoryVoteStore {
    async fn insert(&self, vote: Vote) -> AppResult<Vote> {
        // Let concurrent writers interleave if the caller failed to
        // serialize them
        tokio::task::yield_now().await;

        let mut votes = self.votes.lock().unwrap();
        let key = (vote.member_id, vote.perfume_id, vote.category);
        if votes.contains_key(&key) {
            return Err(AppError::Conflict("duplicate vote insert".to_string()));
        }
        votes.insert(key, vote.clone());
        Ok(vote)
    }

    async fn update_value(&self, vote_id: Uuid, value: &str) -> AppResult<Vote> {
        tokio::task::yield_now().await;

        let mut votes = self.votes.lock().unwrap();
        let vote = votes
            .values_mut()
            .find(|v| v.id == vote_id)
            .ok_or_else(|| AppError::NotFound(format!("vote {}", vote_id)))?;
        vote.value = value.to_string();
        Ok(vote.clone())
    }

    async fn delete(
        &self,
        member_id: Uuid,
        perfume_id: Uuid,
        category: VoteCategory,
    ) -> AppResult<bool> {
        Ok(self
            .votes
            .lock()
            .unwrap()
            .remove(&(member_id, perfume_id, category))
            .is_some())
    }
}

struct NullEventBus;

impl EventBus for NullEventBus {
    fn publish(&self, _event: DomainEvent) {}
}

fn empty_builder() -> PreferenceAnalysisService {
    PreferenceAnalysisService::new(
        Arc::new(FakeReviews::default()),
        Arc::new(FakeCatalog::default()),
    )
}

fn ids(n: usize) -> Vec<Uuid> {
    (0..n).map(|_| Uuid::new_v4()).collect()
}

// Preference profile flow

#[tokio::test]
async fn profile_tallies_positive_reviews_with_alphabetical_tie_break() {
    let member_id = Uuid::new_v4();
    let perfumes = ids(3);

    let mut reviews = FakeReviews::default();
    reviews.by_member.insert(
        member_id,
        vec![
            Review::new(member_id, perfumes[0], 5.0),
            Review::new(member_id, perfumes[1], 3.0),
            Review::new(member_id, perfumes[2], 5.0),
        ],
    );

    let mut catalog = FakeCatalog::default();
    catalog.notes.insert(
        perfumes[0],
        vec!["amber".to_string(), "bergamot".to_string()],
    );
    catalog.notes.insert(perfumes[1], vec!["cedar".to_string()]);
    catalog.notes.insert(
        perfumes[2],
        vec!["bergamot".to_string(), "davana".to_string()],
    );

    let builder = PreferenceAnalysisService::new(Arc::new(reviews), Arc::new(catalog));
    let cache = PreferenceCache::new(Arc::new(InMemoryProfileStore::default()), builder);

    let profile = cache.get(member_id).await.unwrap();

    // bergamot counted twice; amber and davana tie, broken alphabetically
    assert_eq!(profile.preferred_notes, vec!["bergamot", "amber", "davana"]);
    // The 3.0-rated perfume is excluded from preferences but still reviewed
    assert!(!profile.preferred_notes.contains(&"cedar".to_string()));
    assert_eq!(profile.reviewed_perfume_ids.len(), 3);

    // A second read hits the cache and returns the identical profile
    let again = cache.get(member_id).await.unwrap();
    assert_eq!(again, profile);
}

#[tokio::test]
async fn review_event_invalidates_profile_and_recomputes_in_background() {
    let member_id = Uuid::new_v4();
    let perfume_id = Uuid::new_v4();

    let mut reviews = FakeReviews::default();
    reviews
        .by_member
        .insert(member_id, vec![Review::new(member_id, perfume_id, 5.0)]);
    let mut catalog = FakeCatalog::default();
    catalog.notes.insert(perfume_id, vec!["iris".to_string()]);

    let store = Arc::new(InMemoryProfileStore::default());
    let builder = PreferenceAnalysisService::new(Arc::new(reviews), Arc::new(catalog));
    let profiles = Arc::new(PreferenceCache::new(
        store.clone() as Arc<dyn ProfileStore>,
        builder,
    ));

    // Seed a stale-looking cached profile with no signal
    store
        .save(&MemberPreferenceProfile::empty(member_id))
        .await
        .unwrap();

    let bus = BroadcastEventBus::new(16);
    let (tasks, _task_handle) = TaskPool::new();
    let _handlers = spawn_event_handlers(&bus, Arc::clone(&profiles), tasks);

    tokio::time::sleep(Duration::from_millis(20)).await;
    bus.publish(DomainEvent::ReviewCreated {
        member_id,
        perfume_id,
    });
    tokio::time::sleep(Duration::from_millis(100)).await;

    // The recomputed profile carries the new review's signal
    let profile = profiles.get(member_id).await.unwrap();
    assert_eq!(profile.preferred_notes, vec!["iris"]);
}

// Vote flow

#[tokio::test]
async fn concurrent_votes_on_one_key_leave_exactly_one_active_vote() {
    let member_id = Uuid::new_v4();
    let perfume_id = Uuid::new_v4();

    let store = Arc::new(InMemoryVoteStore::default());
    let aggregates = Arc::new(InMemoryAggregateStore::default());
    let (tasks, _handle) = TaskPool::new();
    let service = Arc::new(VoteService::new(
        store.clone() as Arc<dyn VoteReadPort>,
        store.clone() as Arc<dyn VoteWritePort>,
        aggregates.clone() as Arc<dyn AggregateStore>,
        Arc::new(NullEventBus),
        tasks,
    ));

    let values = ["very_weak", "weak", "moderate", "long_lasting", "eternal"];
    let mut handles = Vec::new();
    for i in 0..8 {
        let service = Arc::clone(&service);
        let value = values[i % values.len()];
        handles.push(tokio::spawn(async move {
            service
                .record_vote(member_id, perfume_id, VoteCategory::Longevity, value)
                .await
        }));
    }

    for handle in handles {
        // No duplicate-insert conflicts: every write either inserts first
        // or overwrites under the key lock
        handle.await.unwrap().unwrap();
    }

    let votes = store.votes.lock().unwrap();
    assert_eq!(votes.len(), 1);
    drop(votes);

    // Aggregate converges to a single voter
    tokio::time::sleep(Duration::from_millis(100)).await;
    let by_category = service.get_aggregates(perfume_id).await.unwrap();
    assert_eq!(by_category[&VoteCategory::Longevity].total(), 1);
}

#[tokio::test]
async fn votes_from_distinct_members_all_count() {
    let perfume_id = Uuid::new_v4();

    let store = Arc::new(InMemoryVoteStore::default());
    let (tasks, _handle) = TaskPool::new();
    let service = Arc::new(VoteService::new(
        store.clone() as Arc<dyn VoteReadPort>,
        store.clone() as Arc<dyn VoteWritePort>,
        Arc::new(InMemoryAggregateStore::default()),
        Arc::new(NullEventBus),
        tasks,
    ));

    let mut handles = Vec::new();
    for _ in 0..5 {
        let service = Arc::clone(&service);
        handles.push(tokio::spawn(async move {
            service
                .record_vote(Uuid::new_v4(), perfume_id, VoteCategory::Sillage, "strong")
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let by_category = service.get_aggregates(perfume_id).await.unwrap();
    let aggregate = &by_category[&VoteCategory::Sillage];
    assert_eq!(aggregate.total(), 5);
    assert_eq!(aggregate.counts.get("strong"), Some(&5));
}

#[tokio::test]
async fn invalid_vote_value_is_rejected_with_no_side_effects() {
    let store = Arc::new(InMemoryVoteStore::default());
    let (tasks, _handle) = TaskPool::new();
    let service = VoteService::new(
        store.clone() as Arc<dyn VoteReadPort>,
        store.clone() as Arc<dyn VoteWritePort>,
        Arc::new(InMemoryAggregateStore::default()),
        Arc::new(NullEventBus),
        tasks,
    );

    let result = service
        .record_vote(
            Uuid::new_v4(),
            Uuid::new_v4(),
            VoteCategory::Gender,
            "androgynous",
        )
        .await;

    assert!(matches!(result, Err(AppError::InvalidValue(_))));
    assert!(store.votes.lock().unwrap().is_empty());
}

// Hybrid blending

#[tokio::test]
async fn hybrid_blend_orders_sources_and_backfills_without_duplicates() {
    let member_id = Uuid::new_v4();
    let preference = ids(2);
    let popular = ids(5);
    let seasonal = ids(1);

    let mut profile = MemberPreferenceProfile::empty(member_id);
    profile.preferred_notes = vec!["oud".to_string()];
    let store = Arc::new(InMemoryProfileStore::default());
    store.save(&profile).await.unwrap();
    let profiles = Arc::new(PreferenceCache::new(
        store as Arc<dyn ProfileStore>,
        empty_builder(),
    ));

    let search = FakeSearch {
        results: preference
            .iter()
            .enumerate()
            .map(|(i, id)| ScoredCandidate::new(*id, 5.0 - i as f32))
            .collect(),
        snapshots: HashMap::new(),
    };

    let mut catalog = FakeCatalog::default();
    catalog.most_reviewed = popular.clone();
    catalog.seasonal = seasonal.clone();

    let (tasks, _handle) = TaskPool::new();
    let service = RecommendationService::new(
        profiles,
        Arc::new(search),
        Arc::new(catalog),
        Arc::new(FakeMembers::default()),
        Arc::new(NullEventBus),
        tasks,
    );

    let result = service.hybrid(member_id, 10).await.unwrap();
    let selected = result.perfume_ids();

    // 2 preference, then 3 popular under quota, then the seasonal pick,
    // then backfill from the remaining popular perfumes
    let expected: Vec<Uuid> = preference
        .iter()
        .chain(popular[..3].iter())
        .chain(seasonal.iter())
        .chain(popular[3..].iter())
        .copied()
        .collect();
    assert_eq!(selected, expected);
    assert_eq!(selected.len(), 8);

    let unique: HashSet<Uuid> = selected.iter().copied().collect();
    assert_eq!(unique.len(), selected.len());
}

#[tokio::test]
async fn liked_perfumes_are_flagged_in_results() {
    let member_id = Uuid::new_v4();
    let liked_id = Uuid::new_v4();
    let other_id = Uuid::new_v4();

    let mut profile = MemberPreferenceProfile::empty(member_id);
    profile.preferred_notes = vec!["rose".to_string()];
    let store = Arc::new(InMemoryProfileStore::default());
    store.save(&profile).await.unwrap();
    let profiles = Arc::new(PreferenceCache::new(
        store as Arc<dyn ProfileStore>,
        empty_builder(),
    ));

    let search = FakeSearch {
        results: vec![
            ScoredCandidate::new(liked_id, 2.0),
            ScoredCandidate::new(other_id, 1.0),
        ],
        snapshots: HashMap::new(),
    };

    let mut members = FakeMembers::default();
    members.liked.insert(liked_id);

    let (tasks, _handle) = TaskPool::new();
    let service = RecommendationService::new(
        profiles,
        Arc::new(search),
        Arc::new(FakeCatalog::default()),
        Arc::new(members),
        Arc::new(NullEventBus),
        tasks,
    );

    let result = service.personalized(member_id, 10).await.unwrap();
    assert_eq!(result.len(), 2);
    assert!(result.items[0].liked_by_member);
    assert!(!result.items[1].liked_by_member);
}

// Survey flow

#[tokio::test]
async fn survey_answers_produce_ranked_recommendations() {
    let liked_perfume = Uuid::new_v4();
    let hits = ids(3);

    let mut catalog = FakeCatalog::default();
    catalog
        .notes
        .insert(liked_perfume, vec!["vanilla".to_string()]);
    catalog
        .accords
        .insert(liked_perfume, vec!["gourmand".to_string()]);
    catalog
        .brands
        .insert(liked_perfume, "Maison Test".to_string());

    let search = FakeSearch {
        results: hits
            .iter()
            .enumerate()
            .map(|(i, id)| ScoredCandidate::new(*id, 9.0 - i as f32))
            .collect(),
        snapshots: HashMap::new(),
    };

    let service = SurveyService::new(Arc::new(catalog), Arc::new(search));

    let answers = vec![
        SurveyAnswer::Choice {
            question_key: "gender".to_string(),
            selected: vec!["female".to_string()],
        },
        SurveyAnswer::Matrix {
            question_key: "fragrance_types".to_string(),
            scores: vec![MatrixScore {
                option: "floral".to_string(),
                score: 85.0,
            }],
        },
        SurveyAnswer::PerfumeRatings {
            question_key: "perfume_ratings".to_string(),
            ratings: vec![RatedPerfume {
                perfume_id: liked_perfume,
                rating: 4.5,
            }],
        },
    ];

    let result = service.recommend(&answers, 10).await.unwrap();
    assert_eq!(result.perfume_ids(), hits);
    // Scores arrive in engine rank order
    assert!(result.items[0].score > result.items[2].score);
}

#[tokio::test]
async fn survey_with_only_unknown_questions_yields_empty_result() {
    let service = SurveyService::new(
        Arc::new(FakeCatalog::default()),
        Arc::new(FakeSearch {
            results: ids(3)
                .into_iter()
                .map(|id| ScoredCandidate::new(id, 1.0))
                .collect(),
            snapshots: HashMap::new(),
        }),
    );

    let answers = vec![SurveyAnswer::Choice {
        question_key: "shoe_size".to_string(),
        selected: vec!["42".to_string()],
    }];

    let result = service.recommend(&answers, 10).await.unwrap();
    assert!(result.is_empty());
}
