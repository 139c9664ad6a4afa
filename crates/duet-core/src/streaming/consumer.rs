use crate::error::StreamError;
use crate::models::{new_message_id, now_ms, ContentBlock, Draft, Message, MessageStatus, Role};
use crate::streaming::StreamEvent;
use tracing::debug;

/// Result of applying one stream event.
#[derive(Debug, PartialEq)]
pub enum Applied {
    /// Stream still open, draft updated
    Progress,
    /// `Finish` arrived; the frozen message is ready to commit
    Finished(Message),
}

/// Consumes the ordered event sequence of one submission and folds it into a
/// draft message. Events must be applied in strict arrival order; the buffer
/// only ever appends. Grammar violations surface as `StreamError::Protocol`.
#[derive(Debug)]
pub struct StreamConsumer {
    conversation_id: String,
    parent_id: Option<String>,
    draft: Option<Draft>,
    finished: bool,
}

impl StreamConsumer {
    /// `target_message_id` is the parent the response will attach to.
    pub fn new(conversation_id: impl Into<String>, target_message_id: Option<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            parent_id: target_message_id,
            draft: None,
            finished: false,
        }
    }

    pub fn draft(&self) -> Option<&Draft> {
        self.draft.as_ref()
    }

    /// Apply the next event in arrival order.
    pub fn apply(&mut self, event: StreamEvent) -> Result<Applied, StreamError> {
        if self.finished {
            return Err(StreamError::Protocol(
                "event after stream finished".to_string(),
            ));
        }
        match event {
            StreamEvent::Start => {
                if self.draft.is_some() {
                    return Err(StreamError::Protocol("duplicate start event".to_string()));
                }
                let message_id = new_message_id();
                debug!(id = %message_id, parent = ?self.parent_id, "stream started, draft allocated");
                self.draft = Some(Draft {
                    message_id,
                    parent_id: self.parent_id.clone(),
                    conversation_id: self.conversation_id.clone(),
                    buffer: String::new(),
                    citations: Vec::new(),
                    started_at: now_ms(),
                });
                Ok(Applied::Progress)
            }
            StreamEvent::Delta { text } => {
                let draft = self.draft.as_mut().ok_or_else(|| {
                    StreamError::Protocol("delta before start event".to_string())
                })?;
                draft.push_delta(&text);
                Ok(Applied::Progress)
            }
            StreamEvent::Citation { citation } => {
                let draft = self.draft.as_mut().ok_or_else(|| {
                    StreamError::Protocol("citation before start event".to_string())
                })?;
                draft.citations.push(citation);
                Ok(Applied::Progress)
            }
            StreamEvent::Finish => {
                let draft = self.draft.as_ref().ok_or_else(|| {
                    StreamError::Protocol("finish before start event".to_string())
                })?;
                self.finished = true;
                Ok(Applied::Finished(Self::freeze(draft)))
            }
            StreamEvent::Error { message } => {
                // Draft stays as-is for the transient view; the caller decides
                // that it is never committed on error
                self.finished = true;
                Err(StreamError::Provider(message))
            }
        }
    }

    /// Freeze whatever has accumulated so far into a committable message.
    /// Used on cancellation; returns `None` if no `start` event arrived yet.
    pub fn finalize_partial(&mut self) -> Option<Message> {
        self.finished = true;
        self.draft.as_ref().map(Self::freeze)
    }

    /// Final `created_at` is assigned at freeze time so a committed response
    /// always sorts after the user turn that produced it.
    fn freeze(draft: &Draft) -> Message {
        Message {
            id: draft.message_id.clone(),
            parent_id: draft.parent_id.clone(),
            conversation_id: draft.conversation_id.clone(),
            role: Role::Assistant,
            content: vec![ContentBlock::text(draft.buffer.clone())],
            created_at: now_ms(),
            status: MessageStatus::Final,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streaming::Citation;

    fn consumer() -> StreamConsumer {
        StreamConsumer::new("c1", Some("parent-1".to_string()))
    }

    #[test]
    fn test_deltas_accumulate_in_order() {
        let mut c = consumer();
        c.apply(StreamEvent::Start).unwrap();
        c.apply(StreamEvent::Delta { text: "A".to_string() }).unwrap();
        c.apply(StreamEvent::Delta { text: "B".to_string() }).unwrap();
        assert_eq!(c.draft().unwrap().buffer, "AB");

        let applied = c.apply(StreamEvent::Finish).unwrap();
        match applied {
            Applied::Finished(msg) => {
                assert_eq!(msg.text(), "AB");
                assert_eq!(msg.parent_id.as_deref(), Some("parent-1"));
                assert_eq!(msg.role, Role::Assistant);
                assert_eq!(msg.status, MessageStatus::Final);
            }
            other => panic!("expected Finished, got {:?}", other),
        }
    }

    #[test]
    fn test_delta_before_start_is_protocol_error() {
        let mut c = consumer();
        let err = c
            .apply(StreamEvent::Delta { text: "A".to_string() })
            .unwrap_err();
        assert!(matches!(err, StreamError::Protocol(_)));
    }

    #[test]
    fn test_duplicate_start_is_protocol_error() {
        let mut c = consumer();
        c.apply(StreamEvent::Start).unwrap();
        let err = c.apply(StreamEvent::Start).unwrap_err();
        assert!(matches!(err, StreamError::Protocol(_)));
    }

    #[test]
    fn test_event_after_finish_is_protocol_error() {
        let mut c = consumer();
        c.apply(StreamEvent::Start).unwrap();
        c.apply(StreamEvent::Finish).unwrap();
        let err = c
            .apply(StreamEvent::Delta { text: "late".to_string() })
            .unwrap_err();
        assert!(matches!(err, StreamError::Protocol(_)));
    }

    #[test]
    fn test_citation_leaves_content_untouched() {
        let mut c = consumer();
        c.apply(StreamEvent::Start).unwrap();
        c.apply(StreamEvent::Delta { text: "text".to_string() }).unwrap();
        c.apply(StreamEvent::Citation {
            citation: Citation {
                source_id: "src-1".to_string(),
                title: Some("Paper".to_string()),
                url: None,
            },
        })
        .unwrap();
        let draft = c.draft().unwrap();
        assert_eq!(draft.buffer, "text");
        assert_eq!(draft.citations.len(), 1);
    }

    #[test]
    fn test_provider_error_preserves_draft() {
        let mut c = consumer();
        c.apply(StreamEvent::Start).unwrap();
        c.apply(StreamEvent::Delta { text: "partial".to_string() }).unwrap();
        let err = c
            .apply(StreamEvent::Error { message: "rate limited".to_string() })
            .unwrap_err();
        assert_eq!(err, StreamError::Provider("rate limited".to_string()));
        // Draft still readable for the transient view
        assert_eq!(c.draft().unwrap().buffer, "partial");
    }

    #[test]
    fn test_finalize_partial_freezes_buffer() {
        let mut c = consumer();
        c.apply(StreamEvent::Start).unwrap();
        c.apply(StreamEvent::Delta { text: "A".to_string() }).unwrap();
        let msg = c.finalize_partial().unwrap();
        assert_eq!(msg.text(), "A");
    }

    #[test]
    fn test_finalize_partial_before_start_yields_nothing() {
        let mut c = consumer();
        assert!(c.finalize_partial().is_none());
    }
}
