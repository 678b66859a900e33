//! The list runtime: one worker task owning the subscription lifecycle, the
//! grouped rows and the search overlay, plus a cloneable handle exposing the
//! consumer-facing API. Store emissions, consumer commands, the debounce
//! timer and search completions are arms of a single select loop, so no two
//! handlers ever interleave.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::config::ListConfig;
use crate::error::ServiceError;
use crate::grouping::group_conversations;
use crate::models::{Conversation, ConversationKind, QueryCriteria, ViewPhase, ViewRow, ViewState};
use crate::pagination::PageWindow;
use crate::search::SearchOverlay;
use crate::service::ChatService;
use crate::store::{ConversationStore, Predicate, RecordPatch, StoreQuery, StoreSort, WatchField};
use crate::subscription::{Snapshot, SubscriptionManager};

/// Commands accepted by the worker.
#[derive(Debug)]
enum ListCommand {
    SetCriteria(QueryCriteria),
    LoadMore,
    Search(String),
    CancelSearch,
    Shutdown,
}

type SearchCompletion = (u64, Result<Vec<Conversation>, ServiceError>);

/// Owns the worker task.
pub struct ListRuntime {
    worker: JoinHandle<()>,
    command_tx: mpsc::UnboundedSender<ListCommand>,
}

impl ListRuntime {
    /// Spawn the worker. The view starts in `Loading` with no rows until
    /// the first criteria value arrives and its subscription delivers.
    pub fn spawn(
        store: Arc<dyn ConversationStore>,
        service: Arc<dyn ChatService>,
        config: ListConfig,
    ) -> (Self, ListHandle) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (view_tx, view_rx) = watch::channel(ViewState::default());
        let (search_tx, search_rx) = mpsc::unbounded_channel();

        let worker = ListWorker {
            store: store.clone(),
            service: service.clone(),
            criteria: None,
            subscriptions: SubscriptionManager::default(),
            window: PageWindow::new(config.page_size),
            search: SearchOverlay::new(config.search_debounce),
            phase: ViewPhase::Loading,
            grouped: Vec::new(),
            view_tx,
            command_rx,
            search_tx,
            search_rx,
        };
        let handle = ListHandle {
            command_tx: command_tx.clone(),
            view_rx,
            store,
            service,
        };
        let worker = tokio::spawn(worker.run());
        (Self { worker, command_tx }, handle)
    }

    /// Stop the worker; the live subscription is cancelled on the way out.
    pub async fn shutdown(self) {
        let _ = self.command_tx.send(ListCommand::Shutdown);
        let _ = self.worker.await;
    }
}

/// Consumer-facing handle. Cloneable; all clones drive the same worker.
#[derive(Clone)]
pub struct ListHandle {
    command_tx: mpsc::UnboundedSender<ListCommand>,
    view_rx: watch::Receiver<ViewState>,
    store: Arc<dyn ConversationStore>,
    service: Arc<dyn ChatService>,
}

impl ListHandle {
    /// Reconfigure the view. A value field-identical to the current one is
    /// a no-op; anything else replaces the live subscription.
    pub fn set_criteria(&self, criteria: QueryCriteria) {
        let _ = self.command_tx.send(ListCommand::SetCriteria(criteria));
    }

    /// Grow the pagination window by one page. Only meaningful in the
    /// ungrouped view; ignored while sections are active.
    pub fn load_more(&self) {
        let _ = self.command_tx.send(ListCommand::LoadMore);
    }

    /// Feed the current search text. Empty text cancels the search.
    pub fn search(&self, text: impl Into<String>) {
        let _ = self.command_tx.send(ListCommand::Search(text.into()));
    }

    pub fn cancel_search(&self) {
        let _ = self.command_tx.send(ListCommand::CancelSearch);
    }

    /// Watch channel carrying the current row sequence.
    pub fn view(&self) -> watch::Receiver<ViewState> {
        self.view_rx.clone()
    }

    /// The row sequence as of now.
    pub fn view_state(&self) -> ViewState {
        self.view_rx.borrow().clone()
    }

    /// Favorite or unfavorite a conversation: the remote call first, the
    /// local record only once it succeeded. A local failure after remote
    /// success is logged and not retried; the remote action stands.
    pub async fn toggle_favorite(&self, id: &str, favorite: bool) -> Result<(), ServiceError> {
        self.service.set_favorite(id, favorite).await?;
        self.apply_local(RecordPatch::Favorite {
            id: id.to_string(),
            favorite,
        });
        Ok(())
    }

    /// Mark a conversation read or unread, remote first.
    pub async fn toggle_read(
        &self,
        id: &str,
        mark_unread: bool,
        include_threads: bool,
    ) -> Result<(), ServiceError> {
        self.service
            .set_read_status(id, mark_unread, include_threads)
            .await?;
        self.apply_local(RecordPatch::ReadStatus {
            id: id.to_string(),
            mark_unread,
            include_threads,
        });
        Ok(())
    }

    /// Hide a conversation from the list, remote first.
    pub async fn hide(&self, id: &str, kind: ConversationKind) -> Result<(), ServiceError> {
        self.service.hide(id, kind).await?;
        self.apply_local(RecordPatch::Hidden { id: id.to_string() });
        Ok(())
    }

    fn apply_local(&self, patch: RecordPatch) {
        if let Err(err) = self.store.apply(patch) {
            warn!(%err, "remote action succeeded but the local update failed");
        }
    }
}

struct ListWorker {
    store: Arc<dyn ConversationStore>,
    service: Arc<dyn ChatService>,
    criteria: Option<QueryCriteria>,
    subscriptions: SubscriptionManager,
    window: PageWindow,
    search: SearchOverlay,
    phase: ViewPhase,
    /// Latest grouped output of the live subscription; what the consumer
    /// sees whenever the search overlay is not in charge.
    grouped: Vec<ViewRow>,
    view_tx: watch::Sender<ViewState>,
    command_rx: mpsc::UnboundedReceiver<ListCommand>,
    search_tx: mpsc::UnboundedSender<SearchCompletion>,
    search_rx: mpsc::UnboundedReceiver<SearchCompletion>,
}

impl ListWorker {
    async fn run(mut self) {
        loop {
            let subscription_active = self.subscriptions.is_active();
            let search_deadline = self.search.deadline();
            tokio::select! {
                command = self.command_rx.recv() => {
                    match command {
                        None | Some(ListCommand::Shutdown) => break,
                        Some(command) => self.handle_command(command).await,
                    }
                }
                snapshot = self.subscriptions.recv(), if subscription_active => {
                    match snapshot {
                        Some(snapshot) => self.apply_snapshot(snapshot),
                        None => {
                            debug!("live query stream ended");
                            self.subscriptions.cancel();
                        }
                    }
                }
                _ = tokio::time::sleep_until(search_deadline.unwrap_or_else(tokio::time::Instant::now)),
                    if search_deadline.is_some() =>
                {
                    self.fire_search();
                }
                completion = self.search_rx.recv() => {
                    if let Some((generation, result)) = completion {
                        self.apply_search_result(generation, result);
                    }
                }
            }
        }
        self.subscriptions.cancel();
    }

    async fn handle_command(&mut self, command: ListCommand) {
        match command {
            ListCommand::SetCriteria(criteria) => self.set_criteria(criteria).await,
            ListCommand::LoadMore => self.load_more().await,
            ListCommand::Search(text) => {
                self.search.on_text(&text);
                if !self.search.is_active() {
                    // empty text cancelled the session
                    self.publish();
                }
            }
            ListCommand::CancelSearch => {
                self.search.cancel();
                self.publish();
            }
            // consumed by the run loop
            ListCommand::Shutdown => {}
        }
    }

    async fn set_criteria(&mut self, criteria: QueryCriteria) {
        if self.criteria.as_ref() == Some(&criteria) {
            debug!("criteria unchanged, keeping the live query");
            return;
        }
        self.window.reset();
        self.criteria = Some(criteria);
        let query = self.build_query(&criteria);
        self.open(query).await;
    }

    async fn load_more(&mut self) {
        let Some(criteria) = self.criteria else {
            return;
        };
        if criteria.grouping_active() {
            // sections observe the whole matching set already
            return;
        }
        let Some(window) = self.window.grow() else {
            debug!("load_more ignored, a window refresh is already in flight");
            return;
        };
        debug!(window, "growing pagination window");
        let query = StoreQuery {
            predicate: Predicate::visible(),
            sort: StoreSort::from_criteria(&criteria),
            window: Some(window),
            watch: None,
        };
        self.open(query).await;
    }

    fn build_query(&self, criteria: &QueryCriteria) -> StoreQuery {
        let sort = StoreSort::from_criteria(criteria);
        if criteria.grouping_active() {
            // whole matching set, re-emitted only for commits that can
            // change what section a record belongs to
            StoreQuery {
                predicate: Predicate::visible(),
                sort,
                window: None,
                watch: Some(WatchField::grouping_set()),
            }
        } else {
            StoreQuery {
                predicate: Predicate::visible(),
                sort,
                window: Some(self.window.current()),
                watch: None,
            }
        }
    }

    async fn open(&mut self, query: StoreQuery) {
        match self.subscriptions.replace(self.store.as_ref(), query).await {
            Ok(id) => {
                debug!(subscription = ?id, "live query opened");
            }
            Err(err) => {
                error!(%err, "failed to open live query");
                // clear the stored value so the consumer can retry with the
                // same criteria once the store is reachable again
                self.criteria = None;
                self.phase = ViewPhase::Failed(err.to_string());
                self.publish();
            }
        }
    }

    fn apply_snapshot(&mut self, snapshot: Snapshot) {
        if !self.subscriptions.is_current(&snapshot) {
            debug!(
                subscription = ?snapshot.subscription,
                "dropping snapshot of a cancelled subscription"
            );
            return;
        }
        let Some(criteria) = self.criteria else {
            return;
        };
        self.window.refresh_done();
        self.phase = ViewPhase::Live;
        self.grouped = group_conversations(&snapshot.conversations, &criteria);
        self.publish();
    }

    fn fire_search(&mut self) {
        let Some((generation, text)) = self.search.fire() else {
            return;
        };
        debug!(generation, "issuing search request");
        let service = self.service.clone();
        let completions = self.search_tx.clone();
        tokio::spawn(async move {
            let result = service.search(&text).await;
            let _ = completions.send((generation, result));
        });
    }

    fn apply_search_result(
        &mut self,
        generation: u64,
        result: Result<Vec<Conversation>, ServiceError>,
    ) {
        match result {
            Ok(records) => {
                if self.search.apply(generation, records) {
                    self.publish();
                } else {
                    debug!(generation, "dropping superseded search result");
                }
            }
            Err(err) => {
                // same treatment as a stale result: whatever is visible stays
                debug!(generation, %err, "search request failed");
            }
        }
    }

    /// Push the current view through the watch channel; structurally equal
    /// states are suppressed so consumers only wake up for real changes.
    fn publish(&self) {
        let rows = self
            .search
            .rows()
            .unwrap_or_else(|| self.grouped.clone());
        let state = ViewState {
            rows,
            phase: self.phase.clone(),
        };
        self.view_tx.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
    }
}
