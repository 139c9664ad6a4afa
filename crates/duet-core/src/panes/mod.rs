mod controller;
mod registry;

pub use controller::SubmissionController;
pub use registry::PaneRegistry;

use serde::{Deserialize, Serialize};

/// Closed set of response slots. Primary carries the main response,
/// Comparison the optional side-by-side one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaneIndex {
    Primary,
    Comparison,
}

impl PaneIndex {
    pub const ALL: [PaneIndex; 2] = [PaneIndex::Primary, PaneIndex::Comparison];

    pub fn index(&self) -> usize {
        match self {
            PaneIndex::Primary => 0,
            PaneIndex::Comparison => 1,
        }
    }
}
