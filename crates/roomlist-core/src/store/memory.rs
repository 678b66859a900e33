//! In-memory reference store.
//!
//! Backs the repl client and the test suite. Implements the live-query
//! contract over a plain table guarded by a lock: every commit re-runs the
//! open queries and re-emits the ordered matching set to the subscribers
//! the commit is relevant for. Not a storage engine: no indexes, no
//! persistence, single process.

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::StoreError;
use crate::models::Conversation;
use crate::store::{ConversationStore, LiveQuery, RecordPatch, StoreQuery, WatchField};

#[derive(Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Table>>,
    observe_calls: AtomicU64,
}

#[derive(Default)]
struct Table {
    rows: Vec<Conversation>,
    subscribers: Vec<Subscriber>,
    next_subscriber: u64,
}

struct Subscriber {
    id: u64,
    query: StoreQuery,
    tx: mpsc::UnboundedSender<Vec<Conversation>>,
    /// Ids of the last emitted snapshot, in order; used to detect
    /// membership/order changes for field-scoped subscribers.
    last_ids: Vec<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<Conversation>) -> Self {
        let store = Self::new();
        {
            let mut table = store.inner.write();
            table.rows = records;
        }
        store
    }

    /// Insert or replace a record by id, as one committed transaction.
    pub fn upsert(&self, record: Conversation) {
        let mut table = self.inner.write();
        match table.rows.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record,
            None => table.rows.push(record),
        }
        Self::notify(&mut table, None);
    }

    pub fn remove(&self, id: &str) {
        let mut table = self.inner.write();
        table.rows.retain(|r| r.id != id);
        Self::notify(&mut table, None);
    }

    /// Bump a record's activity timestamp.
    pub fn touch(&self, id: &str, updated_at: u64) -> Result<(), StoreError> {
        let mut table = self.inner.write();
        let record = table
            .rows
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| StoreError::UnknownConversation(id.to_string()))?;
        record.updated_at = updated_at;
        Self::notify(&mut table, None);
        Ok(())
    }

    /// Current table contents, unordered.
    pub fn records(&self) -> Vec<Conversation> {
        self.inner.read().rows.clone()
    }

    /// Number of `observe` calls served so far.
    pub fn observe_count(&self) -> u64 {
        self.observe_calls.load(AtomicOrdering::SeqCst)
    }

    /// Number of live queries currently open.
    pub fn subscriber_count(&self) -> usize {
        self.inner.read().subscribers.len()
    }

    fn run_query(rows: &[Conversation], query: &StoreQuery) -> Vec<Conversation> {
        let mut matching: Vec<Conversation> = rows
            .iter()
            .filter(|r| query.predicate.matches(r))
            .cloned()
            .collect();
        matching.sort_by(|a, b| query.sort.compare(a, b));
        if let Some(window) = query.window {
            matching.truncate(window);
        }
        matching
    }

    /// Re-run every open query after a commit and emit where relevant.
    ///
    /// `changed_fields` names the fields a patch touched; `None` marks a
    /// structural commit (insert/remove/touch/hide). A field-scoped
    /// subscriber is skipped when the commit touched none of its watched
    /// fields and left its matching set's membership and order intact.
    fn notify(table: &mut Table, changed_fields: Option<&[WatchField]>) {
        let Table {
            rows, subscribers, ..
        } = table;
        subscribers.retain_mut(|subscriber| {
            let result = Self::run_query(rows, &subscriber.query);
            let ids: Vec<String> = result.iter().map(|r| r.id.clone()).collect();
            let shape_changed = ids != subscriber.last_ids;
            let emit = match (&subscriber.query.watch, changed_fields) {
                (None, _) => true,
                (Some(_), None) => shape_changed,
                (Some(watch), Some(fields)) => {
                    shape_changed || fields.iter().any(|f| watch.contains(f))
                }
            };
            if !emit {
                return true;
            }
            subscriber.last_ids = ids;
            if subscriber.tx.send(result).is_err() {
                debug!(subscriber = subscriber.id, "dropping closed live query");
                return false;
            }
            true
        });
    }
}

#[async_trait]
impl ConversationStore for MemoryStore {
    async fn observe(&self, query: StoreQuery) -> Result<LiveQuery, StoreError> {
        self.observe_calls.fetch_add(1, AtomicOrdering::SeqCst);
        let mut table = self.inner.write();
        table.next_subscriber += 1;
        let id = table.next_subscriber;

        let (tx, rx) = mpsc::unbounded_channel();
        let initial = Self::run_query(&table.rows, &query);
        let last_ids = initial.iter().map(|r| r.id.clone()).collect();
        // The receiver is still in hand, the send cannot fail
        let _ = tx.send(initial);
        table.subscribers.push(Subscriber {
            id,
            query,
            tx,
            last_ids,
        });
        debug!(subscriber = id, "live query opened");

        let inner = self.inner.clone();
        Ok(LiveQuery::new(rx, move || {
            let mut table = inner.write();
            table.subscribers.retain(|s| s.id != id);
        }))
    }

    fn apply(&self, patch: RecordPatch) -> Result<(), StoreError> {
        let mut table = self.inner.write();
        let changed: &[WatchField] = match &patch {
            RecordPatch::Favorite { .. } => &[WatchField::Favorite],
            RecordPatch::ReadStatus { .. } => &[WatchField::Unread, WatchField::Alert],
            RecordPatch::Hidden { .. } => &[],
        };
        let id = match &patch {
            RecordPatch::Favorite { id, .. }
            | RecordPatch::ReadStatus { id, .. }
            | RecordPatch::Hidden { id } => id.clone(),
        };
        let record = table
            .rows
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| StoreError::UnknownConversation(id.clone()))?;
        match patch {
            RecordPatch::Favorite { favorite, .. } => record.favorite = favorite,
            RecordPatch::ReadStatus {
                mark_unread,
                include_threads,
                ..
            } => {
                if mark_unread {
                    record.alert = true;
                } else {
                    record.unread = 0;
                    record.alert = false;
                    if include_threads {
                        record.thread_unread.clear();
                    }
                }
            }
            RecordPatch::Hidden { .. } => record.open = false,
        }
        Self::notify(&mut table, Some(changed));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ConversationKind;
    use crate::store::{Predicate, StoreSort};
    use futures::FutureExt;

    fn record(id: &str, updated_at: u64) -> Conversation {
        Conversation::new(id, ConversationKind::PublicChannel, updated_at)
    }

    fn flat_query(window: Option<usize>) -> StoreQuery {
        StoreQuery {
            predicate: Predicate::visible(),
            sort: StoreSort::Recency,
            window,
            watch: None,
        }
    }

    fn grouping_query() -> StoreQuery {
        StoreQuery {
            predicate: Predicate::visible(),
            sort: StoreSort::Recency,
            window: None,
            watch: Some(WatchField::grouping_set()),
        }
    }

    #[tokio::test]
    async fn test_initial_snapshot_is_sorted_and_windowed() {
        let store = MemoryStore::with_records((0..45).map(|i| record(&format!("r{i:02}"), i)).collect());
        let mut query = store.observe(flat_query(Some(20))).await.unwrap();
        let snapshot = query.next().await.unwrap();
        assert_eq!(snapshot.len(), 20);
        // recency: newest first
        assert_eq!(snapshot[0].id, "r44");
        assert_eq!(snapshot[19].id, "r25");
    }

    #[tokio::test]
    async fn test_commit_reemits_to_flat_subscriber() {
        let store = MemoryStore::with_records(vec![record("a", 1)]);
        let mut query = store.observe(flat_query(Some(10))).await.unwrap();
        assert_eq!(query.next().await.unwrap().len(), 1);

        store.upsert(record("b", 2));
        let snapshot = query.next().await.unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].id, "b");
    }

    #[tokio::test]
    async fn test_field_scoped_subscriber_skips_unrelated_commits() {
        let store = MemoryStore::with_records(vec![record("a", 2), record("b", 1)]);
        let mut query = store.observe(grouping_query()).await.unwrap();
        assert_eq!(query.next().await.unwrap().len(), 2);

        // renaming "a" changes no watched field and leaves the order alone
        let renamed = Conversation {
            name: "renamed".to_string(),
            ..record("a", 2)
        };
        store.upsert(renamed);
        assert!(query.next().now_or_never().is_none());

        // a favorite change is watched and must re-emit
        store
            .apply(RecordPatch::Favorite {
                id: "a".to_string(),
                favorite: true,
            })
            .unwrap();
        let snapshot = query.next().await.unwrap();
        assert!(snapshot[0].favorite);
    }

    #[tokio::test]
    async fn test_field_scoped_subscriber_sees_membership_changes() {
        let store = MemoryStore::with_records(vec![record("a", 2), record("b", 1)]);
        let mut query = store.observe(grouping_query()).await.unwrap();
        assert_eq!(query.next().await.unwrap().len(), 2);

        store
            .apply(RecordPatch::Hidden {
                id: "a".to_string(),
            })
            .unwrap();
        let snapshot = query.next().await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, "b");
    }

    #[tokio::test]
    async fn test_cancel_releases_subscriber() {
        let store = MemoryStore::with_records(vec![record("a", 1)]);
        let mut query = store.observe(flat_query(None)).await.unwrap();
        assert_eq!(store.subscriber_count(), 1);
        query.cancel();
        assert_eq!(store.subscriber_count(), 0);
        // a commit after cancellation reaches nobody and must not panic
        store.upsert(record("b", 2));
        assert!(query.next().await.is_none());
    }

    #[tokio::test]
    async fn test_drop_releases_subscriber() {
        let store = MemoryStore::with_records(vec![record("a", 1)]);
        {
            let _query = store.observe(flat_query(None)).await.unwrap();
            assert_eq!(store.subscriber_count(), 1);
        }
        assert_eq!(store.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_read_status_patch() {
        let mut unread = record("a", 1);
        unread.unread = 4;
        unread.thread_unread = vec!["t1".to_string()];
        unread.alert = true;
        let store = MemoryStore::with_records(vec![unread]);

        store
            .apply(RecordPatch::ReadStatus {
                id: "a".to_string(),
                mark_unread: false,
                include_threads: true,
            })
            .unwrap();
        let rows = store.records();
        assert_eq!(rows[0].unread, 0);
        assert!(!rows[0].alert);
        assert!(rows[0].thread_unread.is_empty());

        store
            .apply(RecordPatch::ReadStatus {
                id: "a".to_string(),
                mark_unread: true,
                include_threads: false,
            })
            .unwrap();
        assert!(store.records()[0].alert);
    }

    #[tokio::test]
    async fn test_apply_unknown_id_fails() {
        let store = MemoryStore::new();
        let err = store
            .apply(RecordPatch::Favorite {
                id: "missing".to_string(),
                favorite: true,
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::UnknownConversation(_)));
    }

    #[tokio::test]
    async fn test_observe_count() {
        let store = MemoryStore::new();
        assert_eq!(store.observe_count(), 0);
        let _a = store.observe(flat_query(None)).await.unwrap();
        let _b = store.observe(flat_query(None)).await.unwrap();
        assert_eq!(store.observe_count(), 2);
    }
}
