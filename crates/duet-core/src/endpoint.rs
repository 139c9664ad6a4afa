use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of backend families a pane can target. Dispatch is over this
/// enum, never over free-form string keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointKind {
    OpenAi,
    Azure,
    Anthropic,
    Google,
    Plugins,
}

impl EndpointKind {
    pub fn label(&self) -> &'static str {
        match self {
            EndpointKind::OpenAi => "OpenAI",
            EndpointKind::Azure => "Azure OpenAI",
            EndpointKind::Anthropic => "Anthropic",
            EndpointKind::Google => "Google",
            EndpointKind::Plugins => "Plugins",
        }
    }
}

impl fmt::Display for EndpointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Target a pane streams from: a backend family plus a model label.
/// Transport-level details (URLs, keys) live with the transport collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub kind: EndpointKind,
    pub model: String,
}

impl EndpointConfig {
    pub fn new(kind: EndpointKind, model: impl Into<String>) -> Self {
        Self {
            kind,
            model: model.into(),
        }
    }
}

impl fmt::Display for EndpointConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.model, self.kind)
    }
}
