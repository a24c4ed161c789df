use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};

use crate::{
    events::{BroadcastEventBus, DomainEvent},
    services::{preference_cache::PreferenceCache, tasks::TaskPool},
};

/// Handle for stopping the event handler loop
pub struct EventHandlerHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl EventHandlerHandle {
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        tracing::info!("Event handler shutdown signal sent");
    }
}

/// Spawns the domain event listener
///
/// Review and vote lifecycle events invalidate the affected member's cached
/// profile and schedule a background recompute. Handler failures are logged
/// and never stop the loop.
pub fn spawn_event_handlers(
    bus: &BroadcastEventBus,
    profiles: Arc<PreferenceCache>,
    tasks: TaskPool,
) -> EventHandlerHandle {
    let mut rx = bus.subscribe();
    let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);

    tokio::spawn(async move {
        tracing::info!("Event handler task started");

        loop {
            tokio::select! {
                event = rx.recv() => match event {
                    Ok(event) => handle_event(event, &profiles, &tasks).await,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped = skipped, "Event handler lagging, events dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                _ = shutdown_rx.recv() => break,
            }
        }

        tracing::info!("Event handler task stopped");
    });

    EventHandlerHandle { shutdown_tx }
}

/// Invalidates the affected member's profile and schedules its recompute
async fn handle_event(event: DomainEvent, profiles: &Arc<PreferenceCache>, tasks: &TaskPool) {
    let Some(member_id) = event.invalidates_member() else {
        return;
    };

    if let Err(e) = profiles.invalidate(member_id).await {
        tracing::error!(member_id = %member_id, error = %e, "Profile invalidation failed");
    }

    let profiles = Arc::clone(profiles);
    tasks.spawn("profile-recompute", async move {
        profiles.refresh(member_id).await
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MemberPreferenceProfile;
    use crate::ports::{MockCatalogReadPort, MockProfileStore, MockReviewReadPort};
    use crate::services::preferences::PreferenceAnalysisService;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;
    use uuid::Uuid;

    fn counting_cache(
        removals: Arc<AtomicU32>,
        saves: Arc<AtomicU32>,
    ) -> Arc<PreferenceCache> {
        let mut store = MockProfileStore::new();
        store.expect_remove().returning(move |_| {
            removals.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        store.expect_save().returning(move |_| {
            saves.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        store
            .expect_load()
            .returning(|member_id| Ok(Some(MemberPreferenceProfile::empty(member_id))));

        let mut reviews = MockReviewReadPort::new();
        reviews.expect_reviews_by_member().returning(|_| Ok(vec![]));
        reviews.expect_positive_reviews().returning(|_, _| Ok(vec![]));
        let builder =
            PreferenceAnalysisService::new(Arc::new(reviews), Arc::new(MockCatalogReadPort::new()));

        Arc::new(PreferenceCache::new(Arc::new(store), builder))
    }

    #[tokio::test]
    async fn test_review_event_invalidates_and_recomputes() {
        let removals = Arc::new(AtomicU32::new(0));
        let saves = Arc::new(AtomicU32::new(0));
        let cache = counting_cache(Arc::clone(&removals), Arc::clone(&saves));

        let bus = BroadcastEventBus::new(16);
        let (tasks, _task_handle) = TaskPool::new();
        let _handler = spawn_event_handlers(&bus, cache, tasks);

        // Let the listener subscribe before publishing
        tokio::time::sleep(Duration::from_millis(20)).await;

        use crate::ports::EventBus;
        bus.publish(DomainEvent::ReviewCreated {
            member_id: Uuid::new_v4(),
            perfume_id: Uuid::new_v4(),
        });

        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(removals.load(Ordering::SeqCst), 1);
        assert_eq!(saves.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_impression_event_is_ignored() {
        let removals = Arc::new(AtomicU32::new(0));
        let saves = Arc::new(AtomicU32::new(0));
        let cache = counting_cache(Arc::clone(&removals), Arc::clone(&saves));

        let bus = BroadcastEventBus::new(16);
        let (tasks, _task_handle) = TaskPool::new();
        let _handler = spawn_event_handlers(&bus, cache, tasks);

        tokio::time::sleep(Duration::from_millis(20)).await;

        use crate::ports::EventBus;
        bus.publish(DomainEvent::RecommendationImpression {
            member_id: Some(Uuid::new_v4()),
            perfume_id: Uuid::new_v4(),
        });

        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(removals.load(Ordering::SeqCst), 0);
        assert_eq!(saves.load(Ordering::SeqCst), 0);
    }
}
