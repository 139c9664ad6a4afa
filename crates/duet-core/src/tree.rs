//! Reconstruction of the branching conversation tree from the flat message
//! list. Pure functions over the store contents; recomputed whenever the
//! store changes.

use crate::models::{Attachment, AttachmentRef, Message};
use std::collections::{HashMap, HashSet};
use tracing::warn;

/// Default ancestor-depth ceiling when none is configured.
pub const DEFAULT_DEPTH_CEILING: usize = 128;

/// One node of the rendered branch tree. Children are siblings ordered by
/// `(created_at, id)` ascending, so ordering is a total order and tree shape
/// is deterministic for any input ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub message: Message,
    pub children: Vec<TreeNode>,
    pub depth: usize,
    pub attachments: Vec<AttachmentRef>,
}

/// Build the branch tree from a flat message collection.
///
/// Returns `None` for empty input ("no history yet", distinct from an empty
/// tree) so callers can tell "still loading" from "nothing to show".
///
/// Messages whose parent_id doesn't resolve within the input are attached at
/// the top level instead of being dropped; partial or streaming data never
/// vanishes from the view. The same fallback absorbs cyclic parent chains:
/// cycle members are unreachable from any root, so they get promoted to the
/// top level and their subtrees built with a visited-set guard.
pub fn build(
    messages: &[Message],
    attachments: &HashMap<String, Attachment>,
) -> Option<Vec<TreeNode>> {
    build_with_ceiling(messages, attachments, DEFAULT_DEPTH_CEILING)
}

pub fn build_with_ceiling(
    messages: &[Message],
    attachments: &HashMap<String, Attachment>,
    depth_ceiling: usize,
) -> Option<Vec<TreeNode>> {
    if messages.is_empty() {
        return None;
    }

    let ids: HashSet<&str> = messages.iter().map(|m| m.id.as_str()).collect();

    // Group by parent; a parent absent from the input counts as the virtual root
    let mut children_of: HashMap<Option<&str>, Vec<&Message>> = HashMap::new();
    for msg in messages {
        let key = match msg.parent_id.as_deref() {
            Some(parent) if ids.contains(parent) => Some(parent),
            Some(_) | None => None,
        };
        children_of.entry(key).or_default().push(msg);
    }
    for group in children_of.values_mut() {
        group.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
    }

    let mut visited: HashSet<String> = HashSet::new();
    let mut roots: Vec<TreeNode> = children_of
        .get(&None)
        .map(|group| group.clone())
        .unwrap_or_default()
        .into_iter()
        .map(|msg| build_node(msg, &children_of, attachments, 0, &mut visited, depth_ceiling))
        .collect();

    // Anything still unvisited sits on a parent cycle. Fail closed: promote
    // each remaining message (earliest first) to the virtual root.
    if visited.len() < messages.len() {
        let mut leftover: Vec<&Message> = messages
            .iter()
            .filter(|m| !visited.contains(&m.id))
            .collect();
        leftover.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
        for msg in leftover {
            if visited.contains(&msg.id) {
                continue;
            }
            warn!(id = %msg.id, "message unreachable from any root, promoting to virtual root");
            roots.push(build_node(
                msg,
                &children_of,
                attachments,
                0,
                &mut visited,
                depth_ceiling,
            ));
        }
    }

    Some(roots)
}

fn build_node(
    msg: &Message,
    children_of: &HashMap<Option<&str>, Vec<&Message>>,
    attachments: &HashMap<String, Attachment>,
    depth: usize,
    visited: &mut HashSet<String>,
    depth_ceiling: usize,
) -> TreeNode {
    visited.insert(msg.id.clone());

    let resolved = msg
        .attachment_ids()
        .into_iter()
        .map(|id| match attachments.get(id) {
            Some(att) => AttachmentRef::Resolved(att.clone()),
            None => AttachmentRef::Pending(id.to_string()),
        })
        .collect();

    let children = if depth >= depth_ceiling {
        // Defensive cut: never chase an ancestor chain past the ceiling
        Vec::new()
    } else {
        children_of
            .get(&Some(msg.id.as_str()))
            .map(|group| {
                let mut built = Vec::new();
                for child in group.iter() {
                    if visited.contains(&child.id) {
                        continue;
                    }
                    built.push(build_node(
                        child,
                        children_of,
                        attachments,
                        depth + 1,
                        visited,
                        depth_ceiling,
                    ));
                }
                built
            })
            .unwrap_or_default()
    };

    TreeNode {
        message: msg.clone(),
        children,
        depth,
        attachments: resolved,
    }
}

/// Per-branch sibling choices made by explicit user navigation.
///
/// At a branch point the latest-created sibling wins unless an override was
/// recorded for that parent; an override persists until replaced. The key is
/// the parent message id, `None` for the conversation root.
#[derive(Debug, Clone, Default)]
pub struct PathSelection {
    chosen: HashMap<Option<String>, String>,
}

impl PathSelection {
    pub fn select_sibling(&mut self, parent_id: Option<&str>, sibling_id: &str) {
        self.chosen
            .insert(parent_id.map(str::to_string), sibling_id.to_string());
    }

    pub fn clear(&mut self) {
        self.chosen.clear();
    }

    fn chosen_for(&self, parent_id: Option<&str>) -> Option<&str> {
        self.chosen
            .get(&parent_id.map(str::to_string))
            .map(String::as_str)
    }
}

/// Resolve the root-to-leaf sequence currently displayed.
pub fn current_path<'a>(tree: &'a [TreeNode], selection: &PathSelection) -> Vec<&'a TreeNode> {
    let mut path = Vec::new();
    let mut siblings = tree;
    let mut parent_id: Option<&str> = None;

    while let Some(node) = pick_sibling(siblings, selection.chosen_for(parent_id)) {
        path.push(node);
        parent_id = Some(node.message.id.as_str());
        siblings = &node.children;
    }
    path
}

fn pick_sibling<'a>(siblings: &'a [TreeNode], chosen: Option<&str>) -> Option<&'a TreeNode> {
    if siblings.is_empty() {
        return None;
    }
    if let Some(id) = chosen {
        if let Some(node) = siblings.iter().find(|n| n.message.id == id) {
            return Some(node);
        }
        // Stale override (sibling no longer present): fall back to default
    }
    // Siblings are sorted ascending, so the latest-created is last
    siblings.last()
}
