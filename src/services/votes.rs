use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Duration;
use tokio::sync::Mutex as AsyncMutex;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    events::DomainEvent,
    models::{Vote, VoteAggregate, VoteCategory, VoteSummary},
    ports::{AggregateStore, EventBus, VoteReadPort, VoteWritePort},
    services::tasks::TaskPool,
};

/// Cached vote summaries older than this are recomputed on read
pub const AGGREGATE_STALE_AFTER_MINUTES: i64 = 60;

type VoteKey = (Uuid, Uuid, VoteCategory);

/// Vote recording and aggregate reads
///
/// Writers for the same (member, perfume, category) key are serialized
/// through a per-key async mutex so a check-then-insert pair cannot race
/// into duplicate rows. Aggregate refresh after a write happens on the task
/// pool; the synchronous read path repairs staleness itself.
pub struct VoteService {
    votes_read: Arc<dyn VoteReadPort>,
    votes_write: Arc<dyn VoteWritePort>,
    aggregates: Arc<dyn AggregateStore>,
    events: Arc<dyn EventBus>,
    tasks: TaskPool,
    key_locks: Mutex<HashMap<VoteKey, Arc<AsyncMutex<()>>>>,
}

impl VoteService {
    pub fn new(
        votes_read: Arc<dyn VoteReadPort>,
        votes_write: Arc<dyn VoteWritePort>,
        aggregates: Arc<dyn AggregateStore>,
        events: Arc<dyn EventBus>,
        tasks: TaskPool,
    ) -> Self {
        Self {
            votes_read,
            votes_write,
            aggregates,
            events,
            tasks,
            key_locks: Mutex::new(HashMap::new()),
        }
    }

    fn lock_for(&self, key: VoteKey) -> Arc<AsyncMutex<()>> {
        let mut locks = self.key_locks.lock().expect("vote lock map poisoned");
        Arc::clone(locks.entry(key).or_default())
    }

    /// Records a member's vote, overwriting any previous vote on the key
    ///
    /// The vote itself is read-your-own-write; the aggregate refresh is
    /// eventual, dispatched to the task pool after the write lands.
    pub async fn record_vote(
        &self,
        member_id: Uuid,
        perfume_id: Uuid,
        category: VoteCategory,
        value: &str,
    ) -> AppResult<Vote> {
        if !category.is_allowed(value) {
            return Err(AppError::InvalidValue(format!(
                "category {} does not accept value '{}'",
                category, value
            )));
        }

        let key_lock = self.lock_for((member_id, perfume_id, category));
        let _guard = key_lock.lock().await;

        let existing = self
            .votes_read
            .find_active(member_id, perfume_id, category)
            .await?;

        let (vote, event) = match existing {
            Some(previous) => {
                let updated = self.votes_write.update_value(previous.id, value).await?;
                tracing::debug!(
                    member_id = %member_id,
                    perfume_id = %perfume_id,
                    category = %category,
                    "Vote overwritten"
                );
                (
                    updated,
                    DomainEvent::VoteUpdated {
                        member_id,
                        perfume_id,
                        category,
                    },
                )
            }
            None => {
                let inserted = self
                    .votes_write
                    .insert(Vote::new(member_id, perfume_id, category, value.to_string()))
                    .await?;
                tracing::debug!(
                    member_id = %member_id,
                    perfume_id = %perfume_id,
                    category = %category,
                    "Vote recorded"
                );
                (
                    inserted,
                    DomainEvent::VoteCreated {
                        member_id,
                        perfume_id,
                        category,
                    },
                )
            }
        };

        self.events.publish(event);
        self.schedule_aggregate_refresh(perfume_id);

        Ok(vote)
    }

    /// Removes the member's active vote on the key
    pub async fn delete_vote(
        &self,
        member_id: Uuid,
        perfume_id: Uuid,
        category: VoteCategory,
    ) -> AppResult<()> {
        let key_lock = self.lock_for((member_id, perfume_id, category));
        let _guard = key_lock.lock().await;

        let removed = self
            .votes_write
            .delete(member_id, perfume_id, category)
            .await?;
        if !removed {
            return Err(AppError::NotFound(format!(
                "no {} vote by member {} on perfume {}",
                category, member_id, perfume_id
            )));
        }

        self.schedule_aggregate_refresh(perfume_id);
        Ok(())
    }

    /// Returns the perfume's per-category tallies
    ///
    /// A cached summary within the staleness window is served as-is;
    /// otherwise the tallies are rebuilt from raw vote rows and the cache
    /// overwritten before returning.
    pub async fn get_aggregates(
        &self,
        perfume_id: Uuid,
    ) -> AppResult<HashMap<VoteCategory, VoteAggregate>> {
        if let Some(summary) = self.aggregates.load(perfume_id).await? {
            if !summary.is_stale(Duration::minutes(AGGREGATE_STALE_AFTER_MINUTES)) {
                return Ok(summary.by_category);
            }
            tracing::debug!(perfume_id = %perfume_id, "Vote summary stale, recomputing");
        }

        let votes = self.votes_read.votes_for_perfume(perfume_id).await?;
        let summary = VoteSummary::from_votes(perfume_id, &votes);
        self.aggregates.save(&summary).await?;

        Ok(summary.by_category)
    }

    /// Rebuilds the perfume's summary on the task pool
    fn schedule_aggregate_refresh(&self, perfume_id: Uuid) {
        let votes_read = Arc::clone(&self.votes_read);
        let aggregates = Arc::clone(&self.aggregates);

        self.tasks.spawn("vote-aggregate-refresh", async move {
            let votes = votes_read.votes_for_perfume(perfume_id).await?;
            let summary = VoteSummary::from_votes(perfume_id, &votes);
            aggregates.save(&summary).await?;
            Ok(())
        });
    }
}
