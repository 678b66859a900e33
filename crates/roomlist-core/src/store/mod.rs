//! Contract between the list core and the persisted conversation table.
//!
//! The engine behind the table is out of scope: anything able to run an
//! ordered query and re-deliver the matching set on every relevant commit
//! can back the core. `memory::MemoryStore` is the bundled reference
//! implementation used by the repl client and the test suite.

pub mod memory;

pub use memory::MemoryStore;

use std::cmp::Ordering;

use async_trait::async_trait;
use futures::FutureExt;
use tokio::sync::mpsc;

use crate::error::StoreError;
use crate::models::{Conversation, QueryCriteria, SortKey};

/// Row-visibility predicate of a store query.
///
/// The list only ever asks for `archived = false AND open = true`, but the
/// predicate travels explicitly so stores don't hard-code it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Predicate {
    pub archived: bool,
    pub open: bool,
}

impl Predicate {
    /// The list's base predicate: open, non-archived conversations.
    pub fn visible() -> Self {
        Self {
            archived: false,
            open: true,
        }
    }

    pub fn matches(&self, record: &Conversation) -> bool {
        record.archived == self.archived && record.open == self.open
    }
}

/// Sort clause of a store query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreSort {
    /// `updated_at` descending.
    Recency,
    /// Display name ascending; `real_names` picks the name field.
    Alphabetical { real_names: bool },
}

impl StoreSort {
    pub fn from_criteria(criteria: &QueryCriteria) -> Self {
        match criteria.sort_key {
            SortKey::Recency => StoreSort::Recency,
            SortKey::Alphabetical => StoreSort::Alphabetical {
                real_names: criteria.real_name_sort,
            },
        }
    }

    /// Total order over records: the sort key, ties broken by id ascending
    /// so snapshots of the same set always order identically.
    pub fn compare(&self, a: &Conversation, b: &Conversation) -> Ordering {
        let by_key = match self {
            StoreSort::Recency => b.updated_at.cmp(&a.updated_at),
            StoreSort::Alphabetical { real_names } => a
                .sort_name(*real_names)
                .to_lowercase()
                .cmp(&b.sort_name(*real_names).to_lowercase()),
        };
        by_key.then_with(|| a.id.cmp(&b.id))
    }
}

/// Fields a live query can restrict its change notifications to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchField {
    Favorite,
    OnHold,
    Alert,
    Unread,
}

impl WatchField {
    /// The subset that decides grouping membership.
    pub fn grouping_set() -> Vec<WatchField> {
        vec![
            WatchField::Favorite,
            WatchField::OnHold,
            WatchField::Alert,
            WatchField::Unread,
        ]
    }
}

/// Description of one live query over the conversation table.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreQuery {
    pub predicate: Predicate,
    pub sort: StoreSort,
    /// `None` observes the entire matching set.
    pub window: Option<usize>,
    /// When set, commits that touch none of these fields and leave the
    /// matching set's membership and order intact are not re-emitted.
    pub watch: Option<Vec<WatchField>>,
}

/// Local halves of the write actions, applied only after the matching
/// remote call succeeded. Each patch is one transactional update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordPatch {
    Favorite {
        id: String,
        favorite: bool,
    },
    /// `mark_unread` raises the alert flag; clearing it zeroes the counter
    /// and, with `include_threads`, the per-thread unread list too.
    ReadStatus {
        id: String,
        mark_unread: bool,
        include_threads: bool,
    },
    Hidden {
        id: String,
    },
}

/// Handle on one open live query.
///
/// Snapshots arrive in commit order. `cancel` releases the store-side
/// resource synchronously; dropping the handle does the same. A cancelled
/// handle never yields again, even for emissions already in flight.
pub struct LiveQuery {
    receiver: mpsc::UnboundedReceiver<Vec<Conversation>>,
    on_cancel: Option<Box<dyn FnOnce() + Send>>,
    cancelled: bool,
}

impl LiveQuery {
    pub fn new(
        receiver: mpsc::UnboundedReceiver<Vec<Conversation>>,
        on_cancel: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            receiver,
            on_cancel: Some(Box::new(on_cancel)),
            cancelled: false,
        }
    }

    /// Next ordered snapshot; `None` once the store closed the stream.
    pub async fn next(&mut self) -> Option<Vec<Conversation>> {
        if self.cancelled {
            return None;
        }
        self.receiver.recv().await
    }

    /// Non-blocking variant of `next` for consumers polling from their own
    /// loop: the snapshot if one is ready, `None` otherwise.
    pub fn poll_next(&mut self) -> Option<Vec<Conversation>> {
        self.next().now_or_never().flatten()
    }

    pub fn cancel(&mut self) {
        if self.cancelled {
            return;
        }
        self.cancelled = true;
        self.receiver.close();
        if let Some(release) = self.on_cancel.take() {
            release();
        }
    }
}

impl Drop for LiveQuery {
    fn drop(&mut self) {
        if let Some(release) = self.on_cancel.take() {
            release();
        }
    }
}

/// The persisted conversation table as the list core consumes it.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Open a live query. The initial snapshot is delivered through the
    /// returned handle like every later one, in commit order.
    async fn observe(&self, query: StoreQuery) -> Result<LiveQuery, StoreError>;

    /// Apply one local update inside a transactional scope.
    fn apply(&self, patch: RecordPatch) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ConversationKind;

    fn record(id: &str, updated_at: u64, name: &str) -> Conversation {
        Conversation {
            name: name.to_string(),
            ..Conversation::new(id, ConversationKind::PublicChannel, updated_at)
        }
    }

    #[test]
    fn test_recency_sorts_newest_first_with_id_ties() {
        let sort = StoreSort::Recency;
        let mut rows = vec![
            record("b", 5, "beta"),
            record("a", 5, "alpha"),
            record("c", 9, "gamma"),
        ];
        rows.sort_by(|x, y| sort.compare(x, y));
        let ids: Vec<&str> = rows.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_alphabetical_uses_selected_name_field() {
        let mut with_fname = record("x", 1, "zzz");
        with_fname.fname = Some("Aaron".to_string());
        let plain = record("y", 1, "mid");

        let username_sort = StoreSort::Alphabetical { real_names: false };
        assert_eq!(
            username_sort.compare(&with_fname, &plain),
            Ordering::Greater
        );

        let real_name_sort = StoreSort::Alphabetical { real_names: true };
        assert_eq!(real_name_sort.compare(&with_fname, &plain), Ordering::Less);
    }

    #[test]
    fn test_visible_predicate() {
        let predicate = Predicate::visible();
        let visible = record("a", 1, "a");
        assert!(predicate.matches(&visible));

        let hidden = Conversation {
            open: false,
            ..record("b", 1, "b")
        };
        assert!(!predicate.matches(&hidden));

        let archived = Conversation {
            archived: true,
            ..record("c", 1, "c")
        };
        assert!(!predicate.matches(&archived));
    }

    #[tokio::test]
    async fn test_cancelled_live_query_never_yields_buffered_snapshots() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut query = LiveQuery::new(rx, || {});
        tx.send(vec![record("a", 1, "a")]).unwrap();
        query.cancel();
        assert!(query.next().await.is_none());
    }
}
