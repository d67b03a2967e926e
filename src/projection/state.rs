//! Expand/select state that must survive projection rebuilds.

use std::collections::HashSet;

use tracing::trace;

use crate::projection::tree::{ProjectionNode, ProjectionTree, StableKey};

/// Expanded keys captured before a rebuild.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpansionSnapshot {
    expanded: HashSet<StableKey>,
}

impl ExpansionSnapshot {
    pub fn contains(&self, key: StableKey) -> bool {
        self.expanded.contains(&key)
    }

    pub fn len(&self) -> usize {
        self.expanded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expanded.is_empty()
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RestoreReport {
    /// Keys found in the new tree and expanded again.
    pub applied: usize,
    /// Keys that no longer exist; treated as not expanded.
    pub stale: usize,
}

pub fn snapshot(tree: &ProjectionTree) -> ExpansionSnapshot {
    ExpansionSnapshot {
        expanded: tree
            .iter()
            .filter(|n| n.is_expanded)
            .map(ProjectionNode::key)
            .collect(),
    }
}

pub fn restore(tree: &mut ProjectionTree, snapshot: &ExpansionSnapshot) -> RestoreReport {
    let mut report = RestoreReport::default();
    for key in &snapshot.expanded {
        match tree.get_mut(*key) {
            Some(node) => {
                node.is_expanded = true;
                report.applied += 1;
            }
            None => {
                trace!(?key, "expanded key no longer projected");
                report.stale += 1;
            }
        }
    }
    report
}

/// Select the node for `previous`, clearing any other selection.
///
/// Returns `false` when the key is gone; nothing is selected in that case.
pub fn restore_selection(tree: &mut ProjectionTree, previous: Option<StableKey>) -> bool {
    for node in tree.iter_mut() {
        node.is_selected = false;
    }
    let Some(key) = previous else {
        return false;
    };
    match tree.get_mut(key) {
        Some(node) => {
            node.is_selected = true;
            true
        }
        None => {
            trace!(?key, "selected key no longer projected");
            false
        }
    }
}

pub fn select(tree: &mut ProjectionTree, key: StableKey) -> bool {
    restore_selection(tree, Some(key))
}

pub fn selected(tree: &ProjectionTree) -> Option<StableKey> {
    tree.iter().find(|n| n.is_selected).map(ProjectionNode::key)
}

/// Expand every node that has children.
pub fn expand_all(tree: &mut ProjectionTree) {
    for node in tree.iter_mut() {
        node.is_expanded = node.has_children();
    }
}

/// Collapse everything below the root; the root stays open so the starts
/// remain visible.
pub fn collapse_all(tree: &mut ProjectionTree) {
    for node in tree.iter_mut() {
        node.is_expanded = node.key() == StableKey::Root;
    }
}

/// Expand nodes shallower than `depth` (root is depth 0).
pub fn expand_to_depth(tree: &mut ProjectionTree, depth: usize) {
    for node in tree.iter_mut() {
        node.is_expanded = node.depth() < depth && node.has_children();
    }
}

/// Flip one node. Returns the new state, or `None` if the key is unknown.
pub fn toggle(tree: &mut ProjectionTree, key: StableKey) -> Option<bool> {
    let node = tree.get_mut(key)?;
    node.is_expanded = !node.is_expanded;
    Some(node.is_expanded)
}

/// Expand every ancestor of `key` so that it becomes visible.
pub fn reveal(tree: &mut ProjectionTree, key: StableKey) -> bool {
    if !tree.contains(key) {
        return false;
    }
    for ancestor in tree.ancestors(key) {
        if let Some(node) = tree.get_mut(ancestor) {
            node.is_expanded = true;
        }
    }
    true
}

/// Rows in display order: the root, then expanded descendants depth-first.
pub fn visible_rows(tree: &ProjectionTree) -> Vec<&ProjectionNode> {
    let mut rows = Vec::new();
    let mut stack = vec![tree.root()];
    while let Some(node) = stack.pop() {
        rows.push(node);
        if node.is_expanded {
            let children: Vec<&ProjectionNode> = tree.children(node).collect();
            stack.extend(children.into_iter().rev());
        }
    }
    rows
}
