use thiserror::Error;

/// Failures surfaced by a conversation store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The storage engine rejected or could not serve a live query.
    /// Fatal for that attempt; the consumer decides when to retry.
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("unknown conversation: {0}")]
    UnknownConversation(String),
    #[error("local write failed: {0}")]
    WriteFailed(String),
}

/// Failures surfaced by the remote chat service.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("network failure: {0}")]
    Network(String),
    #[error("request rejected: {0}")]
    Rejected(String),
}
