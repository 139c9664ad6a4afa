pub mod config;
pub mod endpoint;
pub mod error;
pub mod fetch;
pub mod models;
pub mod panes;
pub mod session;
pub mod store;
pub mod streaming;
pub mod transport;
pub mod tree;

// Re-export the session surface at crate root for convenience
pub use config::CoreConfig;
pub use endpoint::{EndpointConfig, EndpointKind};
pub use error::{StoreError, StreamError};
pub use panes::PaneIndex;
pub use session::ConversationSession;
