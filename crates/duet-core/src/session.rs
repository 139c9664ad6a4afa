use crate::config::CoreConfig;
use crate::endpoint::EndpointConfig;
use crate::error::StoreError;
use crate::fetch::{AttachmentResolver, HistorySource};
use crate::models::{Attachment, ContentBlock, SubmissionSnapshot};
use crate::panes::{PaneIndex, PaneRegistry};
use crate::store::MessageStore;
use crate::transport::Transport;
use crate::tree::{self, PathSelection, TreeNode};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::debug;

/// Facade for one conversation: the message store, the two pane controllers,
/// the navigation state, and a tree cache keyed by store revision.
///
/// Single-threaded and cooperative: the owner calls `poll()` from its event
/// loop; everything else is synchronous. The store sits behind
/// `Rc<RefCell<…>>` so the pane controllers can commit into it.
pub struct ConversationSession {
    conversation_id: String,
    store: Rc<RefCell<MessageStore>>,
    registry: PaneRegistry,
    selection: PathSelection,
    attachments: HashMap<String, Attachment>,
    config: CoreConfig,
    tree_cache: Option<Vec<TreeNode>>,
    cached_revision: Option<u64>,
}

impl ConversationSession {
    pub fn new(
        conversation_id: impl Into<String>,
        transport: Rc<dyn Transport>,
        config: CoreConfig,
        endpoints: [EndpointConfig; 2],
    ) -> Self {
        let conversation_id = conversation_id.into();
        let store = Rc::new(RefCell::new(MessageStore::new(conversation_id.clone())));
        let registry = PaneRegistry::new(
            conversation_id.clone(),
            config.clone(),
            transport,
            store.clone(),
            endpoints,
        );
        Self {
            conversation_id,
            store,
            registry,
            selection: PathSelection::default(),
            attachments: HashMap::new(),
            config,
            tree_cache: None,
            cached_revision: None,
        }
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    pub fn store(&self) -> Rc<RefCell<MessageStore>> {
        self.store.clone()
    }

    /// Replace local history from the fetch collaborator. Source of truth on
    /// (re)load; afterwards local appends are trusted without refetching.
    pub fn reload(&mut self, source: &dyn HistorySource) -> anyhow::Result<()> {
        let messages = source.fetch_messages(&self.conversation_id)?;
        self.store.borrow_mut().replace_all(messages);
        Ok(())
    }

    /// Ask the attachment collaborator for any references that are still
    /// pending. Newly resolved records show up on the next tree rebuild.
    pub fn resolve_attachments(&mut self, resolver: &dyn AttachmentResolver) {
        let wanted: Vec<String> = {
            let store = self.store.borrow();
            store
                .messages()
                .iter()
                .flat_map(|m| m.attachment_ids().into_iter().map(str::to_string))
                .filter(|id| !self.attachments.contains_key(id))
                .collect()
        };
        let mut resolved_any = false;
        for id in wanted {
            if let Some(attachment) = resolver.resolve(&id) {
                self.attachments.insert(id, attachment);
                resolved_any = true;
            }
        }
        if resolved_any {
            // Force a rebuild even though the store didn't change
            self.cached_revision = None;
        }
    }

    /// The branching tree over current history, or `None` while there is no
    /// history yet. Recomputed only when the store revision moved.
    pub fn tree(&mut self) -> Option<&[TreeNode]> {
        self.rebuild_if_stale();
        self.tree_cache.as_deref()
    }

    /// Root-to-leaf sequence currently displayed.
    pub fn current_path(&mut self) -> Vec<&TreeNode> {
        self.rebuild_if_stale();
        let nodes = self.tree_cache.as_deref().unwrap_or(&[]);
        tree::current_path(nodes, &self.selection)
    }

    /// Override the default latest-sibling choice at one branch point.
    /// Written only by explicit user navigation, never by streaming.
    pub fn select_sibling(&mut self, parent_id: Option<&str>, sibling_id: &str) {
        debug!(?parent_id, sibling_id, "sibling navigation");
        self.selection.select_sibling(parent_id, sibling_id);
    }

    /// Submit a new user turn on a pane, attached to the current path's leaf.
    /// Returns the committed user message id.
    pub fn submit(
        &mut self,
        pane: PaneIndex,
        content: Vec<ContentBlock>,
    ) -> Result<String, StoreError> {
        let parent = self.current_leaf_id();
        self.registry.submit_on(pane, content, parent)
    }

    /// Submit one user turn and stream both panes against it side by side.
    /// Returns the shared user message id.
    pub fn compare(&mut self, content: Vec<ContentBlock>) -> Result<String, StoreError> {
        let parent = self.current_leaf_id();
        let user_id = self.registry.submit_on(PaneIndex::Primary, content, parent)?;
        self.registry
            .controller(PaneIndex::Comparison)
            .respond_to(user_id.clone());
        Ok(user_id)
    }

    /// Stream a new sibling response for `message_id` on the given pane.
    pub fn regenerate(&mut self, pane: PaneIndex, message_id: &str) -> Result<(), StoreError> {
        self.registry.regenerate_on(pane, message_id)
    }

    pub fn stop(&mut self, pane: PaneIndex) {
        self.registry.stop_on(pane);
    }

    pub fn snapshot(&mut self, pane: PaneIndex) -> SubmissionSnapshot {
        self.registry.snapshot_of(pane)
    }

    pub fn set_endpoint(&mut self, pane: PaneIndex, endpoint: EndpointConfig) {
        self.registry.set_endpoint(pane, endpoint);
    }

    /// Drain pending stream events on every live pane. Call from the owner's
    /// event loop tick.
    pub fn poll(&mut self) {
        for controller in self.registry.live_controllers() {
            controller.poll();
        }
    }

    fn current_leaf_id(&mut self) -> Option<String> {
        self.current_path()
            .last()
            .map(|node| node.message.id.clone())
    }

    fn rebuild_if_stale(&mut self) {
        let revision = self.store.borrow().revision();
        if self.cached_revision == Some(revision) {
            return;
        }
        let store = self.store.borrow();
        self.tree_cache = tree::build_with_ceiling(
            store.messages(),
            &self.attachments,
            self.config.tree_depth_ceiling,
        );
        self.cached_revision = Some(revision);
    }
}
