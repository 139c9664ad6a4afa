use crate::config::CoreConfig;
use crate::endpoint::EndpointConfig;
use crate::error::{StoreError, StreamError};
use crate::models::{ContentBlock, Message, SubmissionSnapshot, SubmissionStatus};
use crate::panes::PaneIndex;
use crate::store::MessageStore;
use crate::streaming::{Applied, StreamConsumer, StreamEvent};
use crate::transport::{PromptPayload, StreamConnection, Transport};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Instant;
use tokio::sync::mpsc::error::TryRecvError;
use tracing::{debug, warn};

/// Drives one pane's submissions through the state machine
/// `Idle -> Queued -> Streaming -> {Done | Error | Cancelled}`.
///
/// The controller exclusively owns the live submission: its consumer, its
/// connection, and the abort handle. A new submission on the same pane
/// preempts (cancels and replaces) any in-flight one; there is no queue.
/// Event consumption is caller-driven: `poll()` drains whatever has arrived,
/// so two panes interleave on one thread without blocking each other.
pub struct SubmissionController {
    pane: PaneIndex,
    conversation_id: String,
    endpoint: EndpointConfig,
    config: CoreConfig,
    transport: Rc<dyn Transport>,
    store: Rc<RefCell<MessageStore>>,
    status: SubmissionStatus,
    consumer: Option<StreamConsumer>,
    connection: Option<StreamConnection>,
    error: Option<StreamError>,
    last_event_at: Option<Instant>,
}

impl SubmissionController {
    pub fn new(
        pane: PaneIndex,
        conversation_id: impl Into<String>,
        endpoint: EndpointConfig,
        config: CoreConfig,
        transport: Rc<dyn Transport>,
        store: Rc<RefCell<MessageStore>>,
    ) -> Self {
        Self {
            pane,
            conversation_id: conversation_id.into(),
            endpoint,
            config,
            transport,
            store,
            status: SubmissionStatus::Idle,
            consumer: None,
            connection: None,
            error: None,
            last_event_at: None,
        }
    }

    pub fn pane(&self) -> PaneIndex {
        self.pane
    }

    pub fn status(&self) -> SubmissionStatus {
        self.status
    }

    pub fn set_endpoint(&mut self, endpoint: EndpointConfig) {
        self.endpoint = endpoint;
    }

    /// Observable `{status, draft, error}` view for rendering collaborators.
    /// On Error the partial draft stays visible here even though it was never
    /// committed to the store.
    pub fn snapshot(&self) -> SubmissionSnapshot {
        SubmissionSnapshot {
            status: self.status,
            draft: self.consumer.as_ref().and_then(|c| c.draft().cloned()),
            error: self.error.clone(),
        }
    }

    /// Commit a new user turn under `parent_id` and open a response stream
    /// targeting it. Preempts any in-flight submission on this pane.
    /// Returns the committed user message id.
    pub fn submit(
        &mut self,
        content: Vec<ContentBlock>,
        parent_id: Option<String>,
    ) -> Result<String, StoreError> {
        if self.status.is_active() {
            debug!(pane = ?self.pane, "preempting in-flight submission");
            self.finalize_cancelled();
        }
        let user = Message::user(self.conversation_id.clone(), parent_id, content.clone());
        let user_id = user.id.clone();
        self.store.borrow_mut().commit(user)?;
        self.start_response(Some(user_id.clone()), content);
        Ok(user_id)
    }

    /// Stream a fresh response as a new sibling of `message_id`. The existing
    /// message is never replaced; history is append-only.
    pub fn regenerate(&mut self, message_id: &str) -> Result<(), StoreError> {
        let parent = {
            let store = self.store.borrow();
            store
                .parent_of(message_id)
                .ok_or_else(|| StoreError::UnknownMessage(message_id.to_string()))?
        };
        if self.status.is_active() {
            debug!(pane = ?self.pane, "preempting in-flight submission");
            self.finalize_cancelled();
        }
        self.start_response(parent, Vec::new());
        Ok(())
    }

    /// Open a response stream directly against an existing message, without
    /// creating a user turn. Used for the comparison pane, which shares the
    /// primary pane's user message.
    pub fn respond_to(&mut self, target_message_id: impl Into<String>) {
        if self.status.is_active() {
            debug!(pane = ?self.pane, "preempting in-flight submission");
            self.finalize_cancelled();
        }
        self.start_response(Some(target_message_id.into()), Vec::new());
    }

    /// Cancel the active submission. Synchronous for the caller: status flips
    /// and the handle closes immediately, whatever the transport does later.
    /// Partial content is committed; Cancelled is success-adjacent, not an
    /// error. No-op from Idle or any terminal state.
    pub fn stop(&mut self) {
        if !self.status.is_active() {
            return;
        }
        debug!(pane = ?self.pane, "stopping submission");
        self.finalize_cancelled();
    }

    /// Drain and apply every event that has arrived on this pane's stream.
    /// Events are applied in strict arrival order; anything arriving after a
    /// terminal transition is discarded rather than reopening the draft.
    pub fn poll(&mut self) {
        if !self.status.is_active() {
            if let Some(conn) = self.connection.as_mut() {
                while let Ok(event) = conn.events.try_recv() {
                    debug!(pane = ?self.pane, ?event, "discarding event after terminal transition");
                }
            }
            return;
        }

        loop {
            let Some(conn) = self.connection.as_mut() else {
                break;
            };
            let event = match conn.events.try_recv() {
                Ok(event) => event,
                Err(TryRecvError::Empty) => {
                    // Idle-timeout policy is local; the transport never
                    // signals it. Also covers a transport that never emits
                    // `start` while we sit in Queued.
                    if let Some(last) = self.last_event_at {
                        if last.elapsed() >= self.config.stream_idle_timeout {
                            let ms = self.config.stream_idle_timeout.as_millis() as u64;
                            warn!(pane = ?self.pane, idle_ms = ms, "stream idle timeout");
                            conn.abort.close();
                            self.status = SubmissionStatus::Error;
                            self.error = Some(StreamError::Timeout(ms));
                        }
                    }
                    break;
                }
                Err(TryRecvError::Disconnected) => {
                    conn.abort.close();
                    self.status = SubmissionStatus::Error;
                    self.error = Some(StreamError::Transport(
                        "event stream closed before finish".to_string(),
                    ));
                    break;
                }
            };

            self.last_event_at = Some(Instant::now());
            if matches!(event, StreamEvent::Start) {
                self.status = SubmissionStatus::Streaming;
            }
            let Some(consumer) = self.consumer.as_mut() else {
                break;
            };
            match consumer.apply(event) {
                Ok(Applied::Progress) => {}
                Ok(Applied::Finished(message)) => {
                    conn.abort.close();
                    if let Err(err) = self.store.borrow_mut().commit(message) {
                        warn!(pane = ?self.pane, %err, "finished response not committed");
                    }
                    self.status = SubmissionStatus::Done;
                    break;
                }
                Err(err) => {
                    conn.abort.close();
                    warn!(pane = ?self.pane, %err, "stream failed");
                    self.status = SubmissionStatus::Error;
                    self.error = Some(err);
                    break;
                }
            }
        }
    }

    fn start_response(&mut self, target_message_id: Option<String>, content: Vec<ContentBlock>) {
        self.error = None;
        self.last_event_at = None;
        let payload = PromptPayload {
            conversation_id: self.conversation_id.clone(),
            target_message_id: target_message_id.clone(),
            content,
        };
        match self.transport.open(&self.endpoint, &payload) {
            Ok(connection) => {
                self.consumer = Some(StreamConsumer::new(
                    self.conversation_id.clone(),
                    target_message_id,
                ));
                self.connection = Some(connection);
                self.status = SubmissionStatus::Queued;
                self.last_event_at = Some(Instant::now());
                debug!(pane = ?self.pane, endpoint = %self.endpoint, "submission queued");
            }
            Err(err) => {
                warn!(pane = ?self.pane, %err, "transport open failed");
                self.consumer = None;
                self.connection = None;
                self.status = SubmissionStatus::Error;
                self.error = Some(err);
            }
        }
    }

    /// Close the handle, commit whatever partial content accumulated, and
    /// land in Cancelled. Events already in flight are discarded by later
    /// polls because the status is terminal.
    fn finalize_cancelled(&mut self) {
        if let Some(conn) = self.connection.as_mut() {
            conn.abort.close();
        }
        if let Some(message) = self.consumer.as_mut().and_then(|c| c.finalize_partial()) {
            if let Err(err) = self.store.borrow_mut().commit(message) {
                warn!(pane = ?self.pane, %err, "cancelled partial not committed");
            }
        }
        self.status = SubmissionStatus::Cancelled;
    }
}
