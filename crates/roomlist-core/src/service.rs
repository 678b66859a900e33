//! Remote chat actions consumed by the core.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ServiceError;
use crate::models::{Conversation, ConversationKind};
use crate::store::MemoryStore;

/// The network side of the list: per-room actions and free-text search.
///
/// Implementations talk to a real server. The core only forwards calls and
/// reacts to success or failure; it never retries on its own.
#[async_trait]
pub trait ChatService: Send + Sync {
    async fn set_favorite(&self, id: &str, favorite: bool) -> Result<(), ServiceError>;

    /// Toggle the read status. `include_threads` also clears per-thread
    /// unread markers when marking read.
    async fn set_read_status(
        &self,
        id: &str,
        mark_unread: bool,
        include_threads: bool,
    ) -> Result<(), ServiceError>;

    async fn hide(&self, id: &str, kind: ConversationKind) -> Result<(), ServiceError>;

    /// Free-text search over the conversations the user can see. The result
    /// order is the server's.
    async fn search(&self, text: &str) -> Result<Vec<Conversation>, ServiceError>;
}

/// In-process service for demos and tests: writes always succeed and search
/// is a case-insensitive substring match over the store's visible records.
pub struct LoopbackChatService {
    store: Arc<MemoryStore>,
}

impl LoopbackChatService {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ChatService for LoopbackChatService {
    async fn set_favorite(&self, _id: &str, _favorite: bool) -> Result<(), ServiceError> {
        Ok(())
    }

    async fn set_read_status(
        &self,
        _id: &str,
        _mark_unread: bool,
        _include_threads: bool,
    ) -> Result<(), ServiceError> {
        Ok(())
    }

    async fn hide(&self, _id: &str, _kind: ConversationKind) -> Result<(), ServiceError> {
        Ok(())
    }

    async fn search(&self, text: &str) -> Result<Vec<Conversation>, ServiceError> {
        let needle = text.to_lowercase();
        Ok(self
            .store
            .records()
            .into_iter()
            .filter(|c| !c.archived && c.open)
            .filter(|c| {
                c.name.to_lowercase().contains(&needle)
                    || c.fname
                        .as_deref()
                        .is_some_and(|f| f.to_lowercase().contains(&needle))
            })
            .collect())
    }
}
