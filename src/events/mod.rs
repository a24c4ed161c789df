use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::VoteCategory;
use crate::ports::EventBus;

/// Domain events flowing through the bus
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    ReviewCreated { member_id: Uuid, perfume_id: Uuid },
    ReviewUpdated { member_id: Uuid, perfume_id: Uuid },
    ReviewDeleted { member_id: Uuid, perfume_id: Uuid },
    VoteCreated {
        member_id: Uuid,
        perfume_id: Uuid,
        category: VoteCategory,
    },
    VoteUpdated {
        member_id: Uuid,
        perfume_id: Uuid,
        category: VoteCategory,
    },
    RecommendationImpression {
        member_id: Option<Uuid>,
        perfume_id: Uuid,
    },
    RecommendationClicked { member_id: Uuid, perfume_id: Uuid },
}

impl DomainEvent {
    /// The member whose cached profile the event affects, if any
    pub fn invalidates_member(&self) -> Option<Uuid> {
        match self {
            DomainEvent::ReviewCreated { member_id, .. }
            | DomainEvent::ReviewUpdated { member_id, .. }
            | DomainEvent::ReviewDeleted { member_id, .. }
            | DomainEvent::VoteCreated { member_id, .. }
            | DomainEvent::VoteUpdated { member_id, .. } => Some(*member_id),
            DomainEvent::RecommendationImpression { .. }
            | DomainEvent::RecommendationClicked { .. } => None,
        }
    }
}

/// In-process event bus backed by a tokio broadcast channel
#[derive(Clone)]
pub struct BroadcastEventBus {
    tx: broadcast::Sender<DomainEvent>,
}

impl BroadcastEventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.tx.subscribe()
    }
}

impl EventBus for BroadcastEventBus {
    fn publish(&self, event: DomainEvent) {
        if let Err(e) = self.tx.send(event) {
            tracing::debug!(error = %e, "Event dropped, no active subscribers");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_subscriber() {
        let bus = BroadcastEventBus::new(16);
        let mut rx = bus.subscribe();

        let member_id = Uuid::new_v4();
        let perfume_id = Uuid::new_v4();
        bus.publish(DomainEvent::ReviewCreated {
            member_id,
            perfume_id,
        });

        let received = rx.recv().await.unwrap();
        assert_eq!(received.invalidates_member(), Some(member_id));
    }

    #[test]
    fn test_publish_without_subscribers_does_not_panic() {
        let bus = BroadcastEventBus::new(16);
        bus.publish(DomainEvent::RecommendationClicked {
            member_id: Uuid::new_v4(),
            perfume_id: Uuid::new_v4(),
        });
    }

    #[test]
    fn test_impression_invalidates_nobody() {
        let event = DomainEvent::RecommendationImpression {
            member_id: Some(Uuid::new_v4()),
            perfume_id: Uuid::new_v4(),
        };
        assert_eq!(event.invalidates_member(), None);
    }
}
