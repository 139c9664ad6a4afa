use std::time::Duration;

/// Tunables for a conversation session. Plain data, no IO.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// A pane with a live stream and no events for this long self-transitions
    /// to Error with a timeout reason. Local policy, not transport-signaled.
    pub stream_idle_timeout: Duration,
    /// Defensive ceiling on ancestor chains during tree construction.
    /// Subtrees past this depth are cut off rather than chased further.
    pub tree_depth_ceiling: usize,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            stream_idle_timeout: Duration::from_secs(60),
            tree_depth_ceiling: 128,
        }
    }
}
