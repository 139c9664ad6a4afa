use crate::error::StreamError;
use crate::streaming::Citation;

/// Lifecycle of one submission on a pane.
///
/// Idle -> Queued -> Streaming -> {Done | Error | Cancelled}
///
/// Terminal states flow back to the start when the pane is reused; Cancelled
/// is success-adjacent (partial content is committed), Error is not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionStatus {
    Idle,
    Queued,
    Streaming,
    Done,
    Error,
    Cancelled,
}

impl SubmissionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SubmissionStatus::Done | SubmissionStatus::Error | SubmissionStatus::Cancelled
        )
    }

    /// True while the submission still owns a live stream
    pub fn is_active(&self) -> bool {
        matches!(self, SubmissionStatus::Queued | SubmissionStatus::Streaming)
    }
}

/// In-progress, uncommitted content buffer of an active submission.
/// The buffer is strictly append-only; citations live in a side list and
/// never reorder the main content.
#[derive(Debug, Clone, PartialEq)]
pub struct Draft {
    /// Client-assigned ID the committed message will keep
    pub message_id: String,
    pub parent_id: Option<String>,
    pub conversation_id: String,
    pub buffer: String,
    pub citations: Vec<Citation>,
    pub started_at: u64,
}

impl Draft {
    pub fn push_delta(&mut self, text: &str) {
        self.buffer.push_str(text);
    }

    /// Short single-line preview for status surfaces (first 100 chars)
    pub fn preview(&self) -> String {
        self.buffer
            .chars()
            .take(100)
            .collect::<String>()
            .replace('\n', " ")
    }
}

/// Externally observable view of a pane. Callers poll this instead of
/// handing callbacks into the core.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionSnapshot {
    pub status: SubmissionStatus,
    pub draft: Option<Draft>,
    pub error: Option<StreamError>,
}

impl SubmissionSnapshot {
    pub fn idle() -> Self {
        Self {
            status: SubmissionStatus::Idle,
            draft: None,
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(SubmissionStatus::Done.is_terminal());
        assert!(SubmissionStatus::Error.is_terminal());
        assert!(SubmissionStatus::Cancelled.is_terminal());
        assert!(!SubmissionStatus::Idle.is_terminal());
        assert!(SubmissionStatus::Queued.is_active());
        assert!(SubmissionStatus::Streaming.is_active());
        assert!(!SubmissionStatus::Done.is_active());
    }

    #[test]
    fn test_draft_preview_flattens_newlines() {
        let mut draft = Draft {
            message_id: "m1".to_string(),
            parent_id: None,
            conversation_id: "c1".to_string(),
            buffer: String::new(),
            citations: Vec::new(),
            started_at: 0,
        };
        draft.push_delta("line one\nline two");
        assert_eq!(draft.preview(), "line one line two");
    }
}
