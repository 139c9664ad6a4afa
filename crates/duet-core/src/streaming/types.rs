use serde::{Deserialize, Serialize};

/// Citation metadata attached to a draft mid-stream. Kept in a side list on
/// the draft; never interleaved into the content buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub source_id: String,
    pub title: Option<String>,
    pub url: Option<String>,
}

/// Ordered event grammar a transport must honor:
/// one `Start`, any number of `Delta`/`Citation`, then `Finish` or `Error`.
/// The core is transport-agnostic beyond this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StreamEvent {
    Start,
    Delta { text: String },
    Citation { citation: Citation },
    Finish,
    Error { message: String },
}
