mod attachment;
mod message;
mod submission;

pub use attachment::{Attachment, AttachmentRef};
pub use message::{new_message_id, now_ms, ContentBlock, Message, MessageStatus, Role};
pub use submission::{Draft, SubmissionSnapshot, SubmissionStatus};
