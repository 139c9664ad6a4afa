use serde::{Deserialize, Serialize};

/// Fully resolved attachment record, provided by the external attachment
/// collaborator. The core never fetches these itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    pub url: Option<String>,
}

/// An attachment slot on a tree node. References stay `Pending` (bare ID)
/// until the collaborator resolves them; rendering a pending reference is
/// valid, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentRef {
    Resolved(Attachment),
    Pending(String),
}

impl AttachmentRef {
    pub fn id(&self) -> &str {
        match self {
            AttachmentRef::Resolved(att) => &att.id,
            AttachmentRef::Pending(id) => id,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, AttachmentRef::Resolved(_))
    }
}
