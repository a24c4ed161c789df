use std::collections::HashSet;

use async_trait::async_trait;
use uuid::Uuid;

/// Consumed ports
///
/// The recommendation core talks to storage, the search engine, and the
/// event transport exclusively through these traits. Production adapters
/// live in `db` and `search`; tests substitute mocks or in-memory fakes.
use crate::{
    error::AppResult,
    events::DomainEvent,
    models::{CatalogSnapshot, MemberPreferenceProfile, Review, ScoredCandidate, Season, Vote,
             VoteCategory, VoteSummary},
    search::BoolQuery,
};

/// Read access to member reviews
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReviewReadPort: Send + Sync {
    /// Reviews by a member with rating at or above `min_rating`
    async fn positive_reviews(&self, member_id: Uuid, min_rating: f32) -> AppResult<Vec<Review>>;

    /// Every review the member has written
    async fn reviews_by_member(&self, member_id: Uuid) -> AppResult<Vec<Review>>;
}

/// Read access to catalog attributes and popularity/seasonal orderings
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogReadPort: Send + Sync {
    async fn notes(&self, perfume_id: Uuid) -> AppResult<Vec<String>>;

    async fn accords(&self, perfume_id: Uuid) -> AppResult<Vec<String>>;

    async fn brand(&self, perfume_id: Uuid) -> AppResult<Option<String>>;

    /// Perfume ids ordered by descending review count
    async fn most_reviewed(&self, limit: usize) -> AppResult<Vec<Uuid>>;

    /// Perfume ids tagged for the given season, best matches first
    async fn by_season(&self, season: Season, limit: usize) -> AppResult<Vec<Uuid>>;
}

/// Read access to member-level signals outside reviews
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MemberReadPort: Send + Sync {
    /// Perfumes the member has liked/favorited
    async fn liked_perfume_ids(&self, member_id: Uuid) -> AppResult<HashSet<Uuid>>;

    /// Every member holding at least one review, for bulk profile sweeps
    async fn member_ids_with_reviews(&self) -> AppResult<Vec<Uuid>>;
}

/// Narrow interface over the external search engine
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ScoredSearchPort: Send + Sync {
    /// Executes a weighted boolean query, returning ranked candidates
    async fn search(&self, query: &BoolQuery, limit: usize) -> AppResult<Vec<ScoredCandidate>>;

    /// Fetches one catalog document, used to seed similarity queries
    async fn get(&self, perfume_id: Uuid) -> AppResult<CatalogSnapshot>;
}

/// Read access to raw vote rows
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VoteReadPort: Send + Sync {
    async fn find_active(
        &self,
        member_id: Uuid,
        perfume_id: Uuid,
        category: VoteCategory,
    ) -> AppResult<Option<Vote>>;

    async fn votes_for_perfume(&self, perfume_id: Uuid) -> AppResult<Vec<Vote>>;
}

/// Write access to vote rows
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VoteWritePort: Send + Sync {
    async fn insert(&self, vote: Vote) -> AppResult<Vote>;

    /// Overwrites the value of an existing vote
    async fn update_value(&self, vote_id: Uuid, value: &str) -> AppResult<Vote>;

    /// Removes the active vote for the key, returning whether one existed
    async fn delete(
        &self,
        member_id: Uuid,
        perfume_id: Uuid,
        category: VoteCategory,
    ) -> AppResult<bool>;
}

/// Cache store for computed preference profiles
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn load(&self, member_id: Uuid) -> AppResult<Option<MemberPreferenceProfile>>;

    /// Write-back may complete asynchronously; readers tolerate the lag
    async fn save(&self, profile: &MemberPreferenceProfile) -> AppResult<()>;

    /// Synchronous removal; must be visible to the next `load`
    async fn remove(&self, member_id: Uuid) -> AppResult<()>;
}

/// Cache store for vote summaries
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AggregateStore: Send + Sync {
    async fn load(&self, perfume_id: Uuid) -> AppResult<Option<VoteSummary>>;

    async fn save(&self, summary: &VoteSummary) -> AppResult<()>;
}

/// Domain event publication
///
/// Publication is fire-and-forget: implementations log delivery problems
/// instead of surfacing them to callers.
#[cfg_attr(test, mockall::automock)]
pub trait EventBus: Send + Sync {
    fn publish(&self, event: DomainEvent);
}
