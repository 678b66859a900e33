//! Ownership of the single live subscription.
//!
//! The store-facing handle is wrapped in an explicit lifecycle value: a new
//! subscription can only be opened by cancelling the previous one first, and
//! every snapshot is tagged with the id of the subscription it came from, so
//! anything still in flight when a cancel happens is recognizable and
//! dropped on arrival.

use tracing::debug;

use crate::error::StoreError;
use crate::models::Conversation;
use crate::store::{ConversationStore, LiveQuery, StoreQuery};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

/// One ordered result set, tagged with its origin.
#[derive(Debug)]
pub struct Snapshot {
    pub subscription: SubscriptionId,
    pub conversations: Vec<Conversation>,
}

struct ActiveSubscription {
    id: SubscriptionId,
    query: LiveQuery,
}

/// Enforces cancel-before-replace over the store's live queries.
#[derive(Default)]
pub struct SubscriptionManager {
    next_id: u64,
    active: Option<ActiveSubscription>,
}

impl SubscriptionManager {
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Cancel the active subscription, releasing the store-side resource.
    pub fn cancel(&mut self) {
        if let Some(mut active) = self.active.take() {
            active.query.cancel();
            debug!(subscription = ?active.id, "live query cancelled");
        }
    }

    /// Cancel the active subscription and open a new one for `query`.
    /// On failure no subscription is active afterwards.
    pub async fn replace(
        &mut self,
        store: &dyn ConversationStore,
        query: StoreQuery,
    ) -> Result<SubscriptionId, StoreError> {
        self.cancel();
        let live = store.observe(query).await?;
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.active = Some(ActiveSubscription { id, query: live });
        Ok(id)
    }

    /// Next snapshot of the active subscription; `None` once the store
    /// closed the stream. Pends forever while no subscription is active,
    /// so callers guard their select arm on `is_active`.
    pub async fn recv(&mut self) -> Option<Snapshot> {
        match self.active.as_mut() {
            Some(active) => {
                let id = active.id;
                active.query.next().await.map(|conversations| Snapshot {
                    subscription: id,
                    conversations,
                })
            }
            None => std::future::pending().await,
        }
    }

    /// True when `snapshot` came from the currently active subscription.
    pub fn is_current(&self, snapshot: &Snapshot) -> bool {
        self.active.as_ref().map(|a| a.id) == Some(snapshot.subscription)
    }
}
