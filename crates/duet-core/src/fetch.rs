use crate::models::{Attachment, Message};

/// History collaborator: source of truth for the flat message list on
/// (re)load. The core trusts its own local appends afterwards and does not
/// refetch after a commit.
pub trait HistorySource {
    fn fetch_messages(&self, conversation_id: &str) -> anyhow::Result<Vec<Message>>;
}

/// Attachment collaborator. `None` means "still pending"; the tree renders
/// the bare reference until resolution catches up.
pub trait AttachmentResolver {
    fn resolve(&self, attachment_id: &str) -> Option<Attachment>;
}
