/// Failure taxonomy for a streaming submission.
///
/// Cancellation is deliberately absent: a user-initiated stop resolves to the
/// `Cancelled` state with partial content committed, never to an error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StreamError {
    /// Connection failed before or during streaming
    #[error("transport failure: {0}")]
    Transport(String),

    /// The event stream broke the expected grammar
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// The backend reported an explicit error event
    #[error("provider error: {0}")]
    Provider(String),

    /// No events arrived within the configured idle interval
    #[error("stream idle for {0} ms")]
    Timeout(u64),
}

/// Errors from the message store commit path.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Single-writer-per-id discipline: an id may only be committed once
    #[error("message id already committed: {0}")]
    DuplicateId(String),

    #[error("message belongs to conversation {actual}, store holds {expected}")]
    ConversationMismatch { expected: String, actual: String },

    #[error("unknown message id: {0}")]
    UnknownMessage(String),
}
