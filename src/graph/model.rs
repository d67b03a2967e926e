//! In-memory model of a branching-dialogue document.
//!
//! Nodes live in a registry keyed by [`NodeId`]; edges are [`DialogPointer`]s
//! keyed by [`PtrId`]. Every live node has exactly one owning pointer that is
//! reachable from the root through owning pointers only. Any other pointer to
//! the same node is a link and never owns its target.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::graph::traverse;

/// Stable identity of a dialogue node. Never reused within one graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    pub(crate) fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "N{}", self.0)
    }
}

impl FromStr for NodeId {
    type Err = String;

    /// Accepts `N12`, `n12` or a bare `12`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix('N')
            .or_else(|| trimmed.strip_prefix('n'))
            .unwrap_or(trimmed);
        digits
            .parse::<u64>()
            .map(NodeId)
            .map_err(|_| format!("invalid node id {:?} (expected e.g. N12)", s))
    }
}

/// Stable identity of a pointer. Never reused within one graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PtrId(u64);

impl PtrId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PtrId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

/// Which side of the conversation a node belongs to.
///
/// Dialogue alternates: root starts point to entries, entries to replies,
/// replies back to entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// A line spoken by the NPC.
    Entry,
    /// A player response.
    Reply,
}

impl NodeKind {
    pub fn opposite(self) -> Self {
        match self {
            Self::Entry => Self::Reply,
            Self::Reply => Self::Entry,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Entry => "entry",
            Self::Reply => "reply",
        }
    }
}

/// The owner of an ordered pointer list: the synthetic root or a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListId {
    Root,
    Node(NodeId),
}

impl fmt::Display for ListId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Root => f.write_str("root"),
            Self::Node(id) => id.fmt(f),
        }
    }
}

/// Language id used when a caller does not name one.
pub const DEFAULT_LANGUAGE: u32 = 0;

/// Localized text: one string per language id, kept in language order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct LocString(BTreeMap<u32, String>);

impl LocString {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text in the default language only.
    pub fn plain(text: impl Into<String>) -> Self {
        let mut s = Self::new();
        s.set(DEFAULT_LANGUAGE, text);
        s
    }

    pub fn get(&self, language: u32) -> Option<&str> {
        self.0.get(&language).map(String::as_str)
    }

    pub fn set(&mut self, language: u32, text: impl Into<String>) {
        self.0.insert(language, text.into());
    }

    /// The string with the lowest language id, if any.
    pub fn first(&self) -> Option<&str> {
        self.0.values().next().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.0.iter().map(|(lang, text)| (*lang, text.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(|t| t.is_empty())
    }
}

/// Reference to a quest journal entry updated when a node is spoken.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QuestRef {
    pub tag: String,
    pub entry: Option<u32>,
}

/// One line of dialogue.
///
/// Content fields are public; the pointer list is only changed through
/// [`DialogGraph`] so that ownership stays consistent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogNode {
    id: NodeId,
    kind: NodeKind,
    pub speaker: String,
    pub text: LocString,
    pub action: Option<String>,
    pub quest: Option<QuestRef>,
    pub comment: String,
    pointers: Vec<PtrId>,
}

impl DialogNode {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn pointers(&self) -> &[PtrId] {
        &self.pointers
    }

    /// Text suitable for a one-line label.
    pub fn display_text(&self) -> &str {
        match self.text.first() {
            Some(t) if !t.is_empty() => t,
            _ => "[empty]",
        }
    }
}

/// A directed edge from a pointer list to a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogPointer {
    id: PtrId,
    parent: ListId,
    target: NodeId,
    is_link: bool,
    condition: Option<String>,
    link_comment: String,
}

impl DialogPointer {
    pub fn id(&self) -> PtrId {
        self.id
    }

    pub fn parent(&self) -> ListId {
        self.parent
    }

    pub fn target(&self) -> NodeId {
        self.target
    }

    pub fn is_link(&self) -> bool {
        self.is_link
    }

    /// Guard condition script; `None` means the branch is unconditional.
    pub fn condition(&self) -> Option<&str> {
        self.condition.as_deref()
    }

    pub fn link_comment(&self) -> &str {
        &self.link_comment
    }
}

/// Failures returned by structural graph operations.
///
/// The graph is left unchanged whenever one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// The parent list does not exist in the graph.
    InvalidParentReference(ListId),
    /// A link names a node that is not in the registry.
    DanglingLinkTarget(NodeId),
    /// A link target does not alternate with its parent (entry under entry).
    KindMismatch { parent: ListId, target: NodeId },
    /// The pointer is not part of the given parent list.
    UnknownPointer(PtrId),
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidParentReference(list) => write!(f, "parent {} is not in the graph", list),
            Self::DanglingLinkTarget(node) => write!(f, "link target {} is not in the graph", node),
            Self::KindMismatch { parent, target } => write!(
                f,
                "cannot link {} under {}: entries and replies must alternate",
                target, parent
            ),
            Self::UnknownPointer(ptr) => write!(f, "pointer {} is not in that list", ptr),
        }
    }
}

impl std::error::Error for GraphError {}

/// What garbage collection did after a pointer went away.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RemoveOutcome {
    /// Nodes no longer reachable from the root, now gone from the registry.
    pub pruned: Vec<NodeId>,
    /// Links that became the owning pointer of a surviving node.
    pub promoted: Vec<PtrId>,
    /// Owning pointers turned into links because their target had another owner.
    pub demoted: Vec<PtrId>,
}

impl RemoveOutcome {
    pub fn is_empty(&self) -> bool {
        self.pruned.is_empty() && self.promoted.is_empty() && self.demoted.is_empty()
    }
}

/// The authoritative dialogue document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DialogGraph {
    nodes: BTreeMap<NodeId, DialogNode>,
    pointers: BTreeMap<PtrId, DialogPointer>,
    starts: Vec<PtrId>,
    next_node: u64,
    next_ptr: u64,
}

impl DialogGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, id: NodeId) -> Option<&DialogNode> {
        self.nodes.get(&id)
    }

    /// Mutable access to node content (speaker, text, scripts, comment).
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut DialogNode> {
        self.nodes.get_mut(&id)
    }

    pub fn pointer(&self, id: PtrId) -> Option<&DialogPointer> {
        self.pointers.get(&id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &DialogNode> {
        self.nodes.values()
    }

    pub fn pointers(&self) -> impl Iterator<Item = &DialogPointer> {
        self.pointers.values()
    }

    /// Top-level conversation starts.
    pub fn starts(&self) -> &[PtrId] {
        &self.starts
    }

    /// The ordered pointer list owned by `list`, or `None` if it does not exist.
    pub fn children(&self, list: ListId) -> Option<&[PtrId]> {
        match list {
            ListId::Root => Some(&self.starts),
            ListId::Node(id) => self.nodes.get(&id).map(|n| n.pointers.as_slice()),
        }
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn contains_list(&self, list: ListId) -> bool {
        match list {
            ListId::Root => true,
            ListId::Node(id) => self.contains_node(id),
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn pointer_count(&self) -> usize {
        self.pointers.len()
    }

    /// The kind children of `list` must have.
    pub fn child_kind(&self, list: ListId) -> Option<NodeKind> {
        match list {
            ListId::Root => Some(NodeKind::Entry),
            ListId::Node(id) => self.nodes.get(&id).map(|n| n.kind.opposite()),
        }
    }

    /// The owning pointer of a node.
    pub fn owner(&self, node: NodeId) -> Option<PtrId> {
        self.pointers
            .values()
            .find(|p| !p.is_link && p.target == node)
            .map(|p| p.id)
    }

    /// Insert an owning pointer to a new, empty node directly after sibling
    /// `after` (`None` or an index past the end appends).
    pub fn add_child(&mut self, parent: ListId, after: Option<usize>) -> Result<PtrId, GraphError> {
        let kind = self
            .child_kind(parent)
            .ok_or(GraphError::InvalidParentReference(parent))?;
        let node = self.alloc_node(kind);
        let ptr = self.insert_pointer(parent, node, false, None, String::new(), after);
        debug!(%parent, %node, %ptr, "added child");
        Ok(ptr)
    }

    /// Insert a non-owning pointer to an existing node.
    pub fn add_link(
        &mut self,
        parent: ListId,
        target: NodeId,
        after: Option<usize>,
    ) -> Result<PtrId, GraphError> {
        let kind = self
            .child_kind(parent)
            .ok_or(GraphError::InvalidParentReference(parent))?;
        let target_kind = self
            .nodes
            .get(&target)
            .map(|n| n.kind)
            .ok_or(GraphError::DanglingLinkTarget(target))?;
        if target_kind != kind {
            return Err(GraphError::KindMismatch { parent, target });
        }
        let ptr = self.insert_pointer(parent, target, true, None, String::new(), after);
        debug!(%parent, %target, %ptr, "added link");
        Ok(ptr)
    }

    /// Detach `pointer` from `parent` and collect whatever became unreachable.
    ///
    /// A node survives while any pointer reachable from the root still
    /// targets it; if its owner was the one removed, a surviving link takes
    /// over ownership.
    pub fn remove_pointer(
        &mut self,
        parent: ListId,
        pointer: PtrId,
    ) -> Result<RemoveOutcome, GraphError> {
        let list = self
            .list_mut(parent)
            .ok_or(GraphError::InvalidParentReference(parent))?;
        let pos = list
            .iter()
            .position(|p| *p == pointer)
            .ok_or(GraphError::UnknownPointer(pointer))?;
        list.remove(pos);
        self.pointers.remove(&pointer);

        let outcome = self.collect_garbage();
        debug!(
            %parent,
            %pointer,
            pruned = outcome.pruned.len(),
            promoted = outcome.promoted.len(),
            "removed pointer"
        );
        Ok(outcome)
    }

    /// Replace a pointer's guard condition. Blank scripts are stored as `None`.
    ///
    /// Returns the list the pointer belongs to, which is the sibling list
    /// whose reachability must be recomputed.
    pub fn set_condition(
        &mut self,
        pointer: PtrId,
        script: Option<String>,
    ) -> Result<ListId, GraphError> {
        let ptr = self
            .pointers
            .get_mut(&pointer)
            .ok_or(GraphError::UnknownPointer(pointer))?;
        ptr.condition = script.filter(|s| !s.trim().is_empty());
        Ok(ptr.parent)
    }

    pub fn set_link_comment(
        &mut self,
        pointer: PtrId,
        comment: impl Into<String>,
    ) -> Result<(), GraphError> {
        let ptr = self
            .pointers
            .get_mut(&pointer)
            .ok_or(GraphError::UnknownPointer(pointer))?;
        ptr.link_comment = comment.into();
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Construction helpers (used by loaders)
    // -----------------------------------------------------------------------

    /// Create a detached node. It is pruned by the next collection unless a
    /// pointer is attached to it.
    pub(crate) fn alloc_node(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.next_node);
        self.next_node += 1;
        self.nodes.insert(
            id,
            DialogNode {
                id,
                kind,
                speaker: String::new(),
                text: LocString::new(),
                action: None,
                quest: None,
                comment: String::new(),
                pointers: Vec::new(),
            },
        );
        id
    }

    /// Append a pointer without ownership repair. Callers run
    /// [`DialogGraph::collect_garbage`] once all pointers are attached.
    pub(crate) fn attach(
        &mut self,
        parent: ListId,
        target: NodeId,
        is_link: bool,
        condition: Option<String>,
        link_comment: String,
    ) -> Result<PtrId, GraphError> {
        if !self.contains_list(parent) {
            return Err(GraphError::InvalidParentReference(parent));
        }
        if !self.contains_node(target) {
            return Err(GraphError::DanglingLinkTarget(target));
        }
        let condition = condition.filter(|s| !s.trim().is_empty());
        Ok(self.insert_pointer(parent, target, is_link, condition, link_comment, None))
    }

    fn insert_pointer(
        &mut self,
        parent: ListId,
        target: NodeId,
        is_link: bool,
        condition: Option<String>,
        link_comment: String,
        after: Option<usize>,
    ) -> PtrId {
        let id = PtrId(self.next_ptr);
        self.next_ptr += 1;
        self.pointers.insert(
            id,
            DialogPointer {
                id,
                parent,
                target,
                is_link,
                condition,
                link_comment,
            },
        );
        if let Some(list) = self.list_mut(parent) {
            let at = after.map_or(list.len(), |i| (i + 1).min(list.len()));
            list.insert(at, id);
        }
        id
    }

    fn list_mut(&mut self, list: ListId) -> Option<&mut Vec<PtrId>> {
        match list {
            ListId::Root => Some(&mut self.starts),
            ListId::Node(id) => self.nodes.get_mut(&id).map(|n| &mut n.pointers),
        }
    }

    // -----------------------------------------------------------------------
    // Garbage collection and ownership repair
    // -----------------------------------------------------------------------

    /// Prune nodes unreachable from the root, then make sure every survivor
    /// has exactly one owning pointer on an owning path from the root.
    pub(crate) fn collect_garbage(&mut self) -> RemoveOutcome {
        let mut outcome = RemoveOutcome::default();

        let reachable = traverse::reachable_nodes(self);
        let doomed: Vec<NodeId> = self
            .nodes
            .keys()
            .filter(|id| !reachable.contains(id))
            .copied()
            .collect();
        for id in &doomed {
            if let Some(node) = self.nodes.remove(id) {
                for ptr in node.pointers {
                    self.pointers.remove(&ptr);
                }
            }
        }
        outcome.pruned = doomed;

        // Pass 1: owners already on an owning path from the root keep their
        // nodes. A second owning pointer to the same node becomes a link.
        let mut owner_of: HashMap<NodeId, PtrId> = HashMap::new();
        let mut stack: Vec<PtrId> = self.starts.iter().rev().copied().collect();
        while let Some(ptr_id) = stack.pop() {
            let Some(ptr) = self.pointers.get(&ptr_id) else {
                continue;
            };
            if ptr.is_link {
                continue;
            }
            let target = ptr.target;
            if owner_of.contains_key(&target) {
                self.set_link_flag(ptr_id, true);
                outcome.demoted.push(ptr_id);
                continue;
            }
            owner_of.insert(target, ptr_id);
            if let Some(node) = self.nodes.get(&target) {
                stack.extend(node.pointers.iter().rev().copied());
            }
        }

        // Pass 2: walk every pointer in preorder. The first link reaching an
        // unowned node takes ownership; stale owners met later are demoted.
        let mut descended: HashSet<NodeId> = HashSet::new();
        let mut stack: Vec<PtrId> = self.starts.iter().rev().copied().collect();
        while let Some(ptr_id) = stack.pop() {
            let Some(ptr) = self.pointers.get(&ptr_id) else {
                continue;
            };
            let target = ptr.target;
            let is_link = ptr.is_link;
            match owner_of.get(&target).copied() {
                None => {
                    if is_link {
                        self.set_link_flag(ptr_id, false);
                        outcome.promoted.push(ptr_id);
                    }
                    owner_of.insert(target, ptr_id);
                }
                Some(owner) if owner != ptr_id => {
                    if !is_link {
                        self.set_link_flag(ptr_id, true);
                        outcome.demoted.push(ptr_id);
                    }
                    continue;
                }
                Some(_) => {}
            }
            if descended.insert(target)
                && let Some(node) = self.nodes.get(&target)
            {
                stack.extend(node.pointers.iter().rev().copied());
            }
        }

        outcome
    }

    fn set_link_flag(&mut self, ptr: PtrId, is_link: bool) {
        if let Some(p) = self.pointers.get_mut(&ptr) {
            p.is_link = is_link;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn target(g: &DialogGraph, ptr: PtrId) -> NodeId {
        g.pointer(ptr).unwrap().target()
    }

    #[test]
    fn add_child_alternates_kinds() {
        let mut g = DialogGraph::new();
        let start = g.add_child(ListId::Root, None).unwrap();
        let entry = target(&g, start);
        assert_eq!(g.node(entry).unwrap().kind(), NodeKind::Entry);

        let reply_ptr = g.add_child(ListId::Node(entry), None).unwrap();
        let reply = target(&g, reply_ptr);
        assert_eq!(g.node(reply).unwrap().kind(), NodeKind::Reply);
        assert!(!g.pointer(reply_ptr).unwrap().is_link());
    }

    #[test]
    fn add_child_inserts_after_index() {
        let mut g = DialogGraph::new();
        let a = g.add_child(ListId::Root, None).unwrap();
        let c = g.add_child(ListId::Root, None).unwrap();
        let b = g.add_child(ListId::Root, Some(0)).unwrap();
        assert_eq!(g.starts(), &[a, b, c]);

        let d = g.add_child(ListId::Root, Some(99)).unwrap();
        assert_eq!(g.starts().last(), Some(&d));
    }

    #[test]
    fn add_child_rejects_missing_parent() {
        let mut g = DialogGraph::new();
        let bogus = ListId::Node(NodeId::from_raw(42));
        assert_eq!(
            g.add_child(bogus, None),
            Err(GraphError::InvalidParentReference(bogus))
        );
        assert_eq!(g.node_count(), 0);
        assert_eq!(g.pointer_count(), 0);
    }

    #[test]
    fn add_link_rejects_dangling_target_before_mutation() {
        let mut g = DialogGraph::new();
        let start = g.add_child(ListId::Root, None).unwrap();
        let entry = target(&g, start);
        let before = g.clone();

        let missing = NodeId::from_raw(999);
        assert_eq!(
            g.add_link(ListId::Node(entry), missing, None),
            Err(GraphError::DanglingLinkTarget(missing))
        );
        assert_eq!(g, before);
    }

    #[test]
    fn add_link_rejects_kind_mismatch() {
        let mut g = DialogGraph::new();
        let a = g.add_child(ListId::Root, None).unwrap();
        let b = g.add_child(ListId::Root, None).unwrap();
        let (ea, eb) = (target(&g, a), target(&g, b));
        let err = g.add_link(ListId::Node(ea), eb, None).unwrap_err();
        assert_eq!(
            err,
            GraphError::KindMismatch {
                parent: ListId::Node(ea),
                target: eb
            }
        );
    }

    #[test]
    fn link_shares_target_without_duplicating() {
        let mut g = DialogGraph::new();
        let start = g.add_child(ListId::Root, None).unwrap();
        let entry = target(&g, start);
        let r1 = g.add_child(ListId::Node(entry), None).unwrap();
        let reply = target(&g, r1);
        let r2 = g.add_child(ListId::Node(entry), None).unwrap();
        let reply2 = target(&g, r2);

        // reply2 -> new entry; that entry links back to `reply`.
        let e2 = g.add_child(ListId::Node(reply2), None).unwrap();
        let entry2 = target(&g, e2);
        let link = g.add_link(ListId::Node(entry2), reply, None).unwrap();

        assert!(g.pointer(link).unwrap().is_link());
        assert_eq!(target(&g, link), reply);
        assert_eq!(g.node_count(), 4);
        assert_eq!(g.owner(reply), Some(r1));
    }

    #[test]
    fn removing_only_owner_prunes_node_and_subtree() {
        let mut g = DialogGraph::new();
        let start = g.add_child(ListId::Root, None).unwrap();
        let entry = target(&g, start);
        let r = g.add_child(ListId::Node(entry), None).unwrap();
        let reply = target(&g, r);

        let outcome = g.remove_pointer(ListId::Root, start).unwrap();
        assert!(!g.contains_node(entry));
        assert!(!g.contains_node(reply));
        assert_eq!(outcome.pruned.len(), 2);
        assert_eq!(g.pointer_count(), 0);
    }

    #[test]
    fn removing_owner_keeps_linked_node_and_promotes_link() {
        let mut g = DialogGraph::new();
        let s1 = g.add_child(ListId::Root, None).unwrap();
        let shared = target(&g, s1);
        let s2 = g.add_child(ListId::Root, None).unwrap();
        let other = target(&g, s2);
        let r = g.add_child(ListId::Node(other), None).unwrap();
        let reply = target(&g, r);
        let link = g.add_link(ListId::Node(reply), shared, None).unwrap();

        let outcome = g.remove_pointer(ListId::Root, s1).unwrap();
        assert!(g.contains_node(shared));
        assert_eq!(outcome.promoted, vec![link]);
        assert!(!g.pointer(link).unwrap().is_link());
        assert_eq!(g.owner(shared), Some(link));
    }

    #[test]
    fn removing_link_leaves_target() {
        let mut g = DialogGraph::new();
        let s1 = g.add_child(ListId::Root, None).unwrap();
        let entry = target(&g, s1);
        let link = g.add_link(ListId::Root, entry, None).unwrap();

        let outcome = g.remove_pointer(ListId::Root, link).unwrap();
        assert!(outcome.is_empty());
        assert!(g.contains_node(entry));
        assert_eq!(g.starts(), &[s1]);
    }

    #[test]
    fn unreachable_cycle_is_pruned() {
        let mut g = DialogGraph::new();
        let s = g.add_child(ListId::Root, None).unwrap();
        let entry = target(&g, s);
        let r = g.add_child(ListId::Node(entry), None).unwrap();
        let reply = target(&g, r);
        g.add_link(ListId::Node(reply), entry, None).unwrap();

        let outcome = g.remove_pointer(ListId::Root, s).unwrap();
        assert_eq!(g.node_count(), 0);
        assert_eq!(outcome.pruned.len(), 2);
    }

    #[test]
    fn cycle_kept_alive_by_outside_link_is_reowned() {
        // root -> A(entry) -> B(reply) -> link A ; root -> C(entry) -> D(reply)
        // D -> link A. Removing root->A keeps A alive via D's link.
        let mut g = DialogGraph::new();
        let sa = g.add_child(ListId::Root, None).unwrap();
        let a = target(&g, sa);
        let ab = g.add_child(ListId::Node(a), None).unwrap();
        let b = target(&g, ab);
        let back = g.add_link(ListId::Node(b), a, None).unwrap();
        let sc = g.add_child(ListId::Root, None).unwrap();
        let c = target(&g, sc);
        let cd = g.add_child(ListId::Node(c), None).unwrap();
        let d = target(&g, cd);
        let from_d = g.add_link(ListId::Node(d), a, None).unwrap();

        let outcome = g.remove_pointer(ListId::Root, sa).unwrap();
        assert!(outcome.pruned.is_empty());
        assert_eq!(g.owner(a), Some(from_d));
        assert_eq!(g.owner(b), Some(ab));
        assert!(g.pointer(back).unwrap().is_link());
    }

    #[test]
    fn remove_pointer_rejects_unknown_pointer() {
        let mut g = DialogGraph::new();
        let s = g.add_child(ListId::Root, None).unwrap();
        let entry = target(&g, s);
        assert_eq!(
            g.remove_pointer(ListId::Node(entry), s),
            Err(GraphError::UnknownPointer(s))
        );
        assert!(g.contains_node(entry));
    }

    #[test]
    fn set_condition_blank_clears_guard() {
        let mut g = DialogGraph::new();
        let s = g.add_child(ListId::Root, None).unwrap();
        assert_eq!(
            g.set_condition(s, Some("gc_check".into())).unwrap(),
            ListId::Root
        );
        assert_eq!(g.pointer(s).unwrap().condition(), Some("gc_check"));
        g.set_condition(s, Some("   ".into())).unwrap();
        assert_eq!(g.pointer(s).unwrap().condition(), None);
    }

    #[test]
    fn duplicate_owners_are_demoted_by_collection() {
        let mut g = DialogGraph::new();
        let e = g.alloc_node(NodeKind::Entry);
        let first = g.attach(ListId::Root, e, false, None, String::new()).unwrap();
        let second = g.attach(ListId::Root, e, false, None, String::new()).unwrap();

        let outcome = g.collect_garbage();
        assert_eq!(outcome.demoted, vec![second]);
        assert_eq!(g.owner(e), Some(first));
    }

    #[test]
    fn node_id_parses_display_form() {
        assert_eq!("N12".parse::<NodeId>(), Ok(NodeId::from_raw(12)));
        assert_eq!("7".parse::<NodeId>(), Ok(NodeId::from_raw(7)));
        assert!("P3".parse::<NodeId>().is_err());
        assert_eq!(NodeId::from_raw(5).to_string(), "N5");
    }
}
