use crate::config::CoreConfig;
use crate::endpoint::EndpointConfig;
use crate::error::StoreError;
use crate::models::{ContentBlock, SubmissionSnapshot};
use crate::panes::{PaneIndex, SubmissionController};
use crate::store::MessageStore;
use crate::transport::Transport;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::debug;

/// Keyed registry of pane controllers: exactly one live controller per pane
/// for the session's lifetime, created lazily on first use. Callers address
/// panes uniformly without knowing what state each one is in, and operations
/// on one pane never touch the other's controller or handle.
pub struct PaneRegistry {
    conversation_id: String,
    config: CoreConfig,
    transport: Rc<dyn Transport>,
    store: Rc<RefCell<MessageStore>>,
    endpoints: [EndpointConfig; 2],
    slots: [Option<SubmissionController>; 2],
}

impl PaneRegistry {
    pub fn new(
        conversation_id: impl Into<String>,
        config: CoreConfig,
        transport: Rc<dyn Transport>,
        store: Rc<RefCell<MessageStore>>,
        endpoints: [EndpointConfig; 2],
    ) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            config,
            transport,
            store,
            endpoints,
            slots: [None, None],
        }
    }

    /// Resolve the controller for a pane, creating it on first use.
    pub fn controller(&mut self, pane: PaneIndex) -> &mut SubmissionController {
        let slot = &mut self.slots[pane.index()];
        if slot.is_none() {
            debug!(?pane, "creating pane controller");
            *slot = Some(SubmissionController::new(
                pane,
                self.conversation_id.clone(),
                self.endpoints[pane.index()].clone(),
                self.config.clone(),
                self.transport.clone(),
                self.store.clone(),
            ));
        }
        slot.as_mut().expect("controller created above")
    }

    /// Controllers that exist so far, for polling and snapshots.
    pub fn live_controllers(&mut self) -> impl Iterator<Item = &mut SubmissionController> {
        self.slots.iter_mut().filter_map(|slot| slot.as_mut())
    }

    pub fn submit_on(
        &mut self,
        pane: PaneIndex,
        content: Vec<ContentBlock>,
        parent_id: Option<String>,
    ) -> Result<String, StoreError> {
        self.controller(pane).submit(content, parent_id)
    }

    pub fn regenerate_on(&mut self, pane: PaneIndex, message_id: &str) -> Result<(), StoreError> {
        self.controller(pane).regenerate(message_id)
    }

    pub fn stop_on(&mut self, pane: PaneIndex) {
        self.controller(pane).stop();
    }

    pub fn snapshot_of(&mut self, pane: PaneIndex) -> SubmissionSnapshot {
        self.controller(pane).snapshot()
    }

    pub fn set_endpoint(&mut self, pane: PaneIndex, endpoint: EndpointConfig) {
        self.endpoints[pane.index()] = endpoint.clone();
        if let Some(controller) = self.slots[pane.index()].as_mut() {
            controller.set_endpoint(endpoint);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::EndpointKind;
    use crate::error::StreamError;
    use crate::models::{ContentBlock, SubmissionStatus};
    use crate::streaming::StreamEvent;
    use crate::transport::{AbortHandle, PromptPayload, StreamConnection};
    use tokio::sync::{mpsc, oneshot};

    #[derive(Default)]
    struct ManualTransport {
        senders: RefCell<Vec<mpsc::UnboundedSender<StreamEvent>>>,
    }

    impl Transport for ManualTransport {
        fn open(
            &self,
            _endpoint: &EndpointConfig,
            _prompt: &PromptPayload,
        ) -> Result<StreamConnection, StreamError> {
            let (tx, rx) = mpsc::unbounded_channel();
            let (cancel_tx, _cancel_rx) = oneshot::channel();
            self.senders.borrow_mut().push(tx);
            Ok(StreamConnection::new(rx, AbortHandle::new(cancel_tx)))
        }
    }

    fn registry() -> (Rc<ManualTransport>, PaneRegistry) {
        let transport = Rc::new(ManualTransport::default());
        let store = Rc::new(RefCell::new(MessageStore::new("c1")));
        let endpoints = [
            EndpointConfig::new(EndpointKind::OpenAi, "gpt-a"),
            EndpointConfig::new(EndpointKind::Anthropic, "claude-b"),
        ];
        let reg = PaneRegistry::new(
            "c1",
            CoreConfig::default(),
            transport.clone(),
            store,
            endpoints,
        );
        (transport, reg)
    }

    #[test]
    fn test_one_controller_per_pane() {
        let (_transport, mut reg) = registry();
        let first = reg.controller(PaneIndex::Primary) as *const SubmissionController;
        let second = reg.controller(PaneIndex::Primary) as *const SubmissionController;
        assert_eq!(first, second);
        assert_eq!(reg.live_controllers().count(), 1);
        reg.controller(PaneIndex::Comparison);
        assert_eq!(reg.live_controllers().count(), 2);
    }

    #[test]
    fn test_pane_isolation_on_stop_and_submit() {
        let (transport, mut reg) = registry();
        reg.controller(PaneIndex::Primary)
            .submit(vec![ContentBlock::text("left")], None)
            .unwrap();
        reg.controller(PaneIndex::Comparison)
            .submit(vec![ContentBlock::text("right")], None)
            .unwrap();
        transport.senders.borrow()[0].send(StreamEvent::Start).unwrap();
        transport.senders.borrow()[1].send(StreamEvent::Start).unwrap();
        transport.senders.borrow()[1]
            .send(StreamEvent::Delta {
                text: "right-draft".to_string(),
            })
            .unwrap();
        for controller in reg.live_controllers() {
            controller.poll();
        }

        let before = reg.controller(PaneIndex::Comparison).snapshot();
        reg.controller(PaneIndex::Primary).stop();

        // Pane 1 is untouched by pane 0's stop
        let after = reg.controller(PaneIndex::Comparison).snapshot();
        assert_eq!(before, after);
        assert_eq!(after.status, SubmissionStatus::Streaming);
        assert_eq!(after.draft.unwrap().buffer, "right-draft");
        assert_eq!(
            reg.controller(PaneIndex::Primary).status(),
            SubmissionStatus::Cancelled
        );
    }
}
