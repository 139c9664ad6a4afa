use crate::endpoint::EndpointConfig;
use crate::error::StreamError;
use crate::models::ContentBlock;
use crate::streaming::StreamEvent;
use tokio::sync::{mpsc, oneshot};

/// What the transport receives when a submission opens.
/// For `regenerate`, `content` is empty and `target_message_id` tells the
/// backend which turn to respond to; reconstructing context is its job.
#[derive(Debug, Clone)]
pub struct PromptPayload {
    pub conversation_id: String,
    pub target_message_id: Option<String>,
    pub content: Vec<ContentBlock>,
}

/// Close capability for an open stream. `close()` is synchronous for the
/// caller; the transport observes the signal (or the dropped sender) and
/// tears the connection down on its own time.
#[derive(Debug)]
pub struct AbortHandle {
    cancel: Option<oneshot::Sender<()>>,
}

impl AbortHandle {
    pub fn new(cancel: oneshot::Sender<()>) -> Self {
        Self {
            cancel: Some(cancel),
        }
    }

    /// Handle for streams that cannot be aborted mid-flight (already-scripted
    /// replays); close is then a no-op.
    pub fn noop() -> Self {
        Self { cancel: None }
    }

    pub fn close(&mut self) {
        if let Some(tx) = self.cancel.take() {
            let _ = tx.send(());
        }
    }
}

/// One open, one-way, ordered event stream.
#[derive(Debug)]
pub struct StreamConnection {
    pub events: mpsc::UnboundedReceiver<StreamEvent>,
    pub abort: AbortHandle,
}

impl StreamConnection {
    pub fn new(events: mpsc::UnboundedReceiver<StreamEvent>, abort: AbortHandle) -> Self {
        Self { events, abort }
    }
}

/// Boundary to the streaming backend. Implementations own connection
/// details; the core only requires the five-kind ordered event grammar.
pub trait Transport {
    fn open(
        &self,
        endpoint: &EndpointConfig,
        prompt: &PromptPayload,
    ) -> Result<StreamConnection, StreamError>;
}
