use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Get current Unix timestamp in milliseconds
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Generate a client-side message ID using UUID v4
pub fn new_message_id() -> String {
    format!("msg-{}", Uuid::new_v4())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// One ordered piece of message content. Attachment blocks carry only the
/// attachment ID; resolution to a full record happens at tree-build time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: String },
    Attachment { attachment_id: String },
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }

    pub fn attachment(attachment_id: impl Into<String>) -> Self {
        ContentBlock::Attachment {
            attachment_id: attachment_id.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    /// Committed, immutable history
    Final,
    /// In-flight draft that has not been committed yet
    StreamingDraft,
}

/// Flat, persistence-friendly message record.
///
/// `parent_id = None` means the message hangs off the conversation root.
/// A parent_id that doesn't resolve yet is tolerated (the parent may still be
/// streaming); the tree builder parks such messages under a virtual root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub parent_id: Option<String>,
    pub conversation_id: String,
    pub role: Role,
    pub content: Vec<ContentBlock>,
    /// Unix millis; sibling ordering key (ties broken by id)
    pub created_at: u64,
    pub status: MessageStatus,
}

impl Message {
    /// Build a user turn with a fresh client-side ID
    pub fn user(
        conversation_id: impl Into<String>,
        parent_id: Option<String>,
        content: Vec<ContentBlock>,
    ) -> Self {
        Self {
            id: new_message_id(),
            parent_id,
            conversation_id: conversation_id.into(),
            role: Role::User,
            content,
            created_at: now_ms(),
            status: MessageStatus::Final,
        }
    }

    /// Concatenated text of all text blocks, in order
    pub fn text(&self) -> String {
        let mut out = String::new();
        for block in &self.content {
            if let ContentBlock::Text { text } = block {
                out.push_str(text);
            }
        }
        out
    }

    /// Attachment IDs referenced by this message, in content order
    pub fn attachment_ids(&self) -> Vec<&str> {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Attachment { attachment_id } => Some(attachment_id.as_str()),
                ContentBlock::Text { .. } => None,
            })
            .collect()
    }
}
