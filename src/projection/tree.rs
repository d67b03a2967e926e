//! The tree projection: a rebuildable, UI-facing view over a [`DialogGraph`].
//!
//! Each projection node is keyed by the pointer it was built from, so keys
//! survive a rebuild even though the nodes themselves are recreated. Owning
//! pointers expand into their target's children; links are leaves.

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::trace;

use crate::graph::model::{DialogGraph, ListId, NodeId, PtrId};

/// Identity of a projection node across rebuilds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StableKey {
    Root,
    Pointer(PtrId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectionNode {
    key: StableKey,
    node: Option<NodeId>,
    /// The pointer list shown under this row, `None` for link leaves.
    list: Option<ListId>,
    is_link: bool,
    parent: Option<usize>,
    children: Vec<usize>,
    depth: usize,
    sibling_index: usize,
    pub is_expanded: bool,
    pub is_selected: bool,
    pub is_unreachable_sibling: bool,
}

impl ProjectionNode {
    pub fn key(&self) -> StableKey {
        self.key
    }

    /// The dialogue node shown by this row (`None` for the root row).
    pub fn node(&self) -> Option<NodeId> {
        self.node
    }

    pub fn pointer(&self) -> Option<PtrId> {
        match self.key {
            StableKey::Root => None,
            StableKey::Pointer(p) => Some(p),
        }
    }

    pub fn list(&self) -> Option<ListId> {
        self.list
    }

    pub fn is_link(&self) -> bool {
        self.is_link
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Position among the parent's pointers.
    pub fn sibling_index(&self) -> usize {
        self.sibling_index
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }
}

/// Arena of projection nodes; index 0 is always the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectionTree {
    nodes: Vec<ProjectionNode>,
    by_key: HashMap<StableKey, usize>,
    by_list: HashMap<ListId, usize>,
}

impl Default for ProjectionTree {
    fn default() -> Self {
        Self::build(&DialogGraph::new())
    }
}

impl ProjectionTree {
    /// Build a fresh projection with every UI flag cleared.
    pub fn build(graph: &DialogGraph) -> Self {
        let mut tree = Self {
            nodes: vec![ProjectionNode {
                key: StableKey::Root,
                node: None,
                list: Some(ListId::Root),
                is_link: false,
                parent: None,
                children: Vec::new(),
                depth: 0,
                sibling_index: 0,
                is_expanded: false,
                is_selected: false,
                is_unreachable_sibling: false,
            }],
            by_key: HashMap::from([(StableKey::Root, 0)]),
            by_list: HashMap::from([(ListId::Root, 0)]),
        };

        let mut expanded_nodes: HashSet<NodeId> = HashSet::new();
        let mut pending = vec![0usize];
        while let Some(idx) = pending.pop() {
            let Some(list) = tree.nodes[idx].list else {
                continue;
            };
            let Some(pointers) = graph.children(list) else {
                continue;
            };
            let depth = tree.nodes[idx].depth + 1;
            let mut expandable = Vec::new();
            for (sibling_index, ptr_id) in pointers.iter().enumerate() {
                let Some(ptr) = graph.pointer(*ptr_id) else {
                    continue;
                };
                let target = ptr.target();
                let owns = !ptr.is_link() && expanded_nodes.insert(target);
                let child_idx = tree.nodes.len();
                tree.nodes.push(ProjectionNode {
                    key: StableKey::Pointer(*ptr_id),
                    node: Some(target),
                    list: owns.then_some(ListId::Node(target)),
                    is_link: ptr.is_link(),
                    parent: Some(idx),
                    children: Vec::new(),
                    depth,
                    sibling_index,
                    is_expanded: false,
                    is_selected: false,
                    is_unreachable_sibling: false,
                });
                tree.by_key.insert(StableKey::Pointer(*ptr_id), child_idx);
                tree.nodes[idx].children.push(child_idx);
                if owns {
                    tree.by_list.insert(ListId::Node(target), child_idx);
                    expandable.push(child_idx);
                }
            }
            pending.extend(expandable.into_iter().rev());
        }
        trace!(nodes = tree.nodes.len(), "built projection");
        tree
    }

    pub fn root(&self) -> &ProjectionNode {
        &self.nodes[0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when the root has nothing under it.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    pub fn get(&self, key: StableKey) -> Option<&ProjectionNode> {
        self.by_key.get(&key).map(|&idx| &self.nodes[idx])
    }

    pub fn get_mut(&mut self, key: StableKey) -> Option<&mut ProjectionNode> {
        self.by_key.get(&key).map(|&idx| &mut self.nodes[idx])
    }

    pub fn contains(&self, key: StableKey) -> bool {
        self.by_key.contains_key(&key)
    }

    /// The row that shows the children of `list`.
    pub fn for_list(&self, list: ListId) -> Option<&ProjectionNode> {
        self.by_list.get(&list).map(|&idx| &self.nodes[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProjectionNode> {
        self.nodes.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut ProjectionNode> {
        self.nodes.iter_mut()
    }

    pub fn children(&self, node: &ProjectionNode) -> impl Iterator<Item = &ProjectionNode> {
        node.children.iter().map(|&idx| &self.nodes[idx])
    }

    pub fn parent(&self, node: &ProjectionNode) -> Option<&ProjectionNode> {
        node.parent.map(|idx| &self.nodes[idx])
    }

    /// Whether `node` is the last child of its parent.
    pub fn is_last_child(&self, node: &ProjectionNode) -> bool {
        self.parent(node)
            .is_none_or(|p| p.children.last() == self.by_key.get(&node.key))
    }

    /// Keys from the root down to (excluding) `key`.
    pub fn ancestors(&self, key: StableKey) -> Vec<StableKey> {
        let mut out = Vec::new();
        let mut current = self.by_key.get(&key).and_then(|&idx| self.nodes[idx].parent);
        while let Some(idx) = current {
            out.push(self.nodes[idx].key);
            current = self.nodes[idx].parent;
        }
        out.reverse();
        out
    }

    /// Set `is_unreachable_sibling` on the children of `list` by sibling index.
    ///
    /// Returns `false` when the list is not projected.
    pub fn apply_unreachable(&mut self, list: ListId, indices: &BTreeSet<usize>) -> bool {
        let Some(&parent) = self.by_list.get(&list) else {
            return false;
        };
        let children = self.nodes[parent].children.clone();
        for child in children {
            let node = &mut self.nodes[child];
            node.is_unreachable_sibling = indices.contains(&node.sibling_index);
        }
        true
    }
}
