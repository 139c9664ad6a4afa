mod consumer;
mod types;

pub use consumer::{Applied, StreamConsumer};
pub use types::{Citation, StreamEvent};
