use crate::error::StoreError;
use crate::models::Message;
use tracing::debug;

/// Authoritative, conversation-scoped collection of flat message records.
///
/// History is append-only: records are inserted exactly once (id-presence
/// check before commit) and never mutated or removed afterwards. The revision
/// counter bumps on every change so consumers can detect staleness without
/// diffing the list.
#[derive(Debug)]
pub struct MessageStore {
    conversation_id: String,
    messages: Vec<Message>,
    revision: u64,
}

impl MessageStore {
    pub fn new(conversation_id: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            messages: Vec::new(),
            revision: 0,
        }
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    /// Parent ID of a message. Outer `None` = unknown id,
    /// inner `None` = the message hangs off the conversation root.
    pub fn parent_of(&self, id: &str) -> Option<Option<String>> {
        self.get(id).map(|m| m.parent_id.clone())
    }

    /// Replace the whole collection from a history fetch. The fetch result is
    /// the source of truth on (re)load; local appends are trusted afterwards.
    pub fn replace_all(&mut self, messages: Vec<Message>) {
        debug!(
            conversation_id = %self.conversation_id,
            count = messages.len(),
            "replacing message store from history fetch"
        );
        self.messages = messages;
        self.revision += 1;
    }

    /// Commit one record. Rejects ids already present (single writer per id)
    /// and records scoped to a different conversation. A dangling parent_id
    /// is allowed; the tree builder handles it.
    pub fn commit(&mut self, message: Message) -> Result<(), StoreError> {
        if message.conversation_id != self.conversation_id {
            return Err(StoreError::ConversationMismatch {
                expected: self.conversation_id.clone(),
                actual: message.conversation_id,
            });
        }
        if self.messages.iter().any(|m| m.id == message.id) {
            return Err(StoreError::DuplicateId(message.id));
        }
        debug!(id = %message.id, parent = ?message.parent_id, "committing message");
        self.messages.push(message);
        self.revision += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContentBlock, MessageStatus, Role};

    fn msg(id: &str, parent: Option<&str>) -> Message {
        Message {
            id: id.to_string(),
            parent_id: parent.map(|p| p.to_string()),
            conversation_id: "c1".to_string(),
            role: Role::User,
            content: vec![ContentBlock::text("x")],
            created_at: 1,
            status: MessageStatus::Final,
        }
    }

    #[test]
    fn test_commit_bumps_revision() {
        let mut store = MessageStore::new("c1");
        assert_eq!(store.revision(), 0);
        store.commit(msg("a", None)).unwrap();
        assert_eq!(store.revision(), 1);
        assert_eq!(store.messages().len(), 1);
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut store = MessageStore::new("c1");
        store.commit(msg("a", None)).unwrap();
        let err = store.commit(msg("a", None)).unwrap_err();
        assert_eq!(err, StoreError::DuplicateId("a".to_string()));
        // Store is unchanged by the rejected commit
        assert_eq!(store.messages().len(), 1);
        assert_eq!(store.revision(), 1);
    }

    #[test]
    fn test_conversation_mismatch_rejected() {
        let mut store = MessageStore::new("c1");
        let mut other = msg("a", None);
        other.conversation_id = "c2".to_string();
        assert!(matches!(
            store.commit(other),
            Err(StoreError::ConversationMismatch { .. })
        ));
    }

    #[test]
    fn test_dangling_parent_tolerated() {
        let mut store = MessageStore::new("c1");
        store.commit(msg("b", Some("not-yet-committed"))).unwrap();
        assert_eq!(
            store.parent_of("b"),
            Some(Some("not-yet-committed".to_string()))
        );
    }

    #[test]
    fn test_replace_all_resets_contents() {
        let mut store = MessageStore::new("c1");
        store.commit(msg("a", None)).unwrap();
        store.replace_all(vec![msg("x", None), msg("y", Some("x"))]);
        assert!(store.get("a").is_none());
        assert_eq!(store.messages().len(), 2);
        assert_eq!(store.revision(), 2);
    }
}
