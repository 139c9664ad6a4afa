use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use duet_core::fetch::HistorySource;
use duet_core::models::{ContentBlock, Message, SubmissionStatus};
use duet_core::streaming::StreamEvent;
use duet_core::transport::{AbortHandle, PromptPayload, StreamConnection, Transport};
use duet_core::tree::TreeNode;
use duet_core::{
    ConversationSession, CoreConfig, EndpointConfig, EndpointKind, PaneIndex, StreamError,
};

#[derive(Parser)]
#[command(name = "duet")]
#[command(about = "Dual-pane conversation core, driven from recorded transcripts")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a transcript file and print the resulting conversation tree
    Replay {
        /// Path to a JSON transcript
        path: PathBuf,
    },
}

/// Recorded session: prior history plus scripted turns. Each turn submits a
/// prompt on one pane and feeds it the recorded event stream.
#[derive(Debug, Deserialize)]
struct Transcript {
    conversation_id: String,
    #[serde(default)]
    history: Vec<Message>,
    #[serde(default)]
    turns: Vec<Turn>,
}

#[derive(Debug, Deserialize)]
struct Turn {
    pane: PaneIndex,
    prompt: String,
    events: Vec<StreamEvent>,
}

impl HistorySource for Transcript {
    fn fetch_messages(&self, _conversation_id: &str) -> anyhow::Result<Vec<Message>> {
        Ok(self.history.clone())
    }
}

/// Transport that replays pre-recorded event streams, one script per open.
#[derive(Default)]
struct ReplayTransport {
    scripts: RefCell<VecDeque<Vec<StreamEvent>>>,
}

impl Transport for ReplayTransport {
    fn open(
        &self,
        _endpoint: &EndpointConfig,
        _prompt: &PromptPayload,
    ) -> Result<StreamConnection, StreamError> {
        let script = self
            .scripts
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| StreamError::Transport("transcript exhausted".to_string()))?;
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        for event in script {
            let _ = tx.send(event);
        }
        Ok(StreamConnection::new(rx, AbortHandle::noop()))
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("duet=info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Replay { path } => replay(&path),
    }
}

fn replay(path: &PathBuf) -> anyhow::Result<()> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading transcript {}", path.display()))?;
    let transcript: Transcript = serde_json::from_str(&raw).context("parsing transcript")?;
    tracing::info!(
        conversation_id = %transcript.conversation_id,
        history = transcript.history.len(),
        turns = transcript.turns.len(),
        "replaying transcript"
    );

    let transport = Rc::new(ReplayTransport::default());
    let mut session = ConversationSession::new(
        transcript.conversation_id.clone(),
        transport.clone(),
        CoreConfig::default(),
        [
            EndpointConfig::new(EndpointKind::OpenAi, "gpt-4o"),
            EndpointConfig::new(EndpointKind::Anthropic, "claude-sonnet"),
        ],
    );
    session.reload(&transcript)?;

    for turn in &transcript.turns {
        transport
            .scripts
            .borrow_mut()
            .push_back(turn.events.clone());
        session.submit(turn.pane, vec![ContentBlock::text(&turn.prompt)])?;
        session.poll();
    }

    match session.tree() {
        Some(tree) => {
            println!("conversation {}", transcript.conversation_id);
            for node in tree {
                print_node(node, 0);
            }
        }
        None => println!("conversation {} is empty", transcript.conversation_id),
    }

    for pane in PaneIndex::ALL {
        let snapshot = session.snapshot(pane);
        if snapshot.status == SubmissionStatus::Idle {
            continue;
        }
        print!("{:?}: {:?}", pane, snapshot.status);
        if let Some(error) = &snapshot.error {
            print!(" ({error})");
        }
        if let Some(draft) = &snapshot.draft {
            print!(" [uncommitted: {}]", draft.preview());
        }
        println!();
    }
    Ok(())
}

fn print_node(node: &TreeNode, indent: usize) {
    let text = node.message.text();
    let first_line = text.lines().next().unwrap_or("");
    println!(
        "{}{:?} {} {}",
        "  ".repeat(indent),
        node.message.role,
        node.message.id,
        first_line
    );
    for child in &node.children {
        print_node(child, indent + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_transcript_parses() {
        let json = r#"{
            "conversation_id": "c1",
            "history": [],
            "turns": [
                {
                    "pane": "primary",
                    "prompt": "hello",
                    "events": [
                        {"kind": "start"},
                        {"kind": "delta", "text": "hi"},
                        {"kind": "finish"}
                    ]
                }
            ]
        }"#;
        let transcript: Transcript = serde_json::from_str(json).unwrap();
        assert_eq!(transcript.conversation_id, "c1");
        assert_eq!(transcript.turns.len(), 1);
        assert_eq!(transcript.turns[0].pane, PaneIndex::Primary);
        assert_eq!(transcript.turns[0].events.len(), 3);
    }

    #[test]
    fn test_replay_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "conversation_id": "c1",
                "turns": [
                    {{
                        "pane": "primary",
                        "prompt": "hello",
                        "events": [
                            {{"kind": "start"}},
                            {{"kind": "delta", "text": "hi there"}},
                            {{"kind": "finish"}}
                        ]
                    }}
                ]
            }}"#
        )
        .unwrap();
        replay(&file.path().to_path_buf()).unwrap();
    }
}
