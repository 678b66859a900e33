pub mod config;
pub mod error;
pub mod grouping;
pub mod models;
pub mod pagination;
pub mod runtime;
pub mod search;
pub mod service;
pub mod store;
pub mod subscription;

// Re-export the embedder-facing surface at the crate root for convenience
pub use config::ListConfig;
pub use error::{ServiceError, StoreError};
pub use grouping::group_conversations;
pub use models::{
    Conversation, ConversationKind, QueryCriteria, SectionLabel, SortKey, ViewPhase, ViewRow,
    ViewState,
};
pub use runtime::{ListHandle, ListRuntime};
pub use service::{ChatService, LoopbackChatService};
pub use store::{
    ConversationStore, LiveQuery, MemoryStore, Predicate, RecordPatch, StoreQuery, StoreSort,
    WatchField,
};
