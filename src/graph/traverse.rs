//! Graph walks. Links may form cycles, so every walk keeps a visited set.

use std::collections::{HashMap, HashSet};

use crate::graph::model::{DialogGraph, ListId, NodeId, PtrId};

/// Every node reachable from the root through any pointer.
pub fn reachable_nodes(graph: &DialogGraph) -> HashSet<NodeId> {
    let mut seen = HashSet::new();
    let mut stack: Vec<NodeId> = graph
        .starts()
        .iter()
        .filter_map(|p| graph.pointer(*p).map(|p| p.target()))
        .collect();
    while let Some(id) = stack.pop() {
        if !seen.insert(id) {
            continue;
        }
        if let Some(node) = graph.node(id) {
            stack.extend(
                node.pointers()
                    .iter()
                    .filter_map(|p| graph.pointer(*p).map(|p| p.target())),
            );
        }
    }
    seen
}

/// Owning pointer of every node that has one.
pub fn owner_index(graph: &DialogGraph) -> HashMap<NodeId, PtrId> {
    graph
        .pointers()
        .filter(|p| !p.is_link())
        .map(|p| (p.target(), p.id()))
        .collect()
}

/// Owning pointers from the root down to `node`, root side first.
///
/// `None` when the node is not in the graph or has no owning path.
pub fn ancestor_path(graph: &DialogGraph, node: NodeId) -> Option<Vec<PtrId>> {
    let owners = owner_index(graph);
    let mut path = Vec::new();
    let mut seen = HashSet::new();
    let mut current = node;
    loop {
        if !seen.insert(current) {
            return None;
        }
        let ptr = *owners.get(&current)?;
        path.push(ptr);
        match graph.pointer(ptr)?.parent() {
            ListId::Root => break,
            ListId::Node(parent) => current = parent,
        }
    }
    path.reverse();
    Some(path)
}

/// Every pointer targeting `node`: the owner first, then links in creation order.
pub fn incoming(graph: &DialogGraph, node: NodeId) -> Vec<PtrId> {
    let mut refs: Vec<(bool, PtrId)> = graph
        .pointers()
        .filter(|p| p.target() == node)
        .map(|p| (p.is_link(), p.id()))
        .collect();
    refs.sort();
    refs.into_iter().map(|(_, id)| id).collect()
}

/// Sibling lists in depth-first order over owning pointers, root first.
pub fn owned_lists(graph: &DialogGraph) -> Vec<ListId> {
    let mut lists = vec![ListId::Root];
    let mut seen = HashSet::new();
    let mut stack: Vec<PtrId> = graph.starts().iter().rev().copied().collect();
    while let Some(ptr) = stack.pop() {
        let Some(p) = graph.pointer(ptr) else {
            continue;
        };
        if p.is_link() || !seen.insert(p.target()) {
            continue;
        }
        lists.push(ListId::Node(p.target()));
        if let Some(node) = graph.node(p.target()) {
            stack.extend(node.pointers().iter().rev().copied());
        }
    }
    lists
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(g: &DialogGraph, ptr: PtrId) -> NodeId {
        g.pointer(ptr).unwrap().target()
    }

    #[test]
    fn ancestor_path_follows_owners() {
        let mut g = DialogGraph::new();
        let s = g.add_child(ListId::Root, None).unwrap();
        let e = target(&g, s);
        let r = g.add_child(ListId::Node(e), None).unwrap();
        let reply = target(&g, r);
        let e2p = g.add_child(ListId::Node(reply), None).unwrap();
        let e2 = target(&g, e2p);

        assert_eq!(ancestor_path(&g, e2), Some(vec![s, r, e2p]));
        assert_eq!(ancestor_path(&g, e), Some(vec![s]));
        assert_eq!(ancestor_path(&g, NodeId::from_raw(77)), None);
    }

    #[test]
    fn ancestor_path_ignores_links() {
        let mut g = DialogGraph::new();
        let s1 = g.add_child(ListId::Root, None).unwrap();
        let e1 = target(&g, s1);
        let r = g.add_child(ListId::Node(e1), None).unwrap();
        let reply = target(&g, r);
        let s2 = g.add_child(ListId::Root, None).unwrap();
        let e2 = target(&g, s2);
        g.add_link(ListId::Node(e2), reply, None).unwrap();

        assert_eq!(ancestor_path(&g, reply), Some(vec![s1, r]));
    }

    #[test]
    fn reachable_nodes_terminates_on_cycles() {
        let mut g = DialogGraph::new();
        let s = g.add_child(ListId::Root, None).unwrap();
        let e = target(&g, s);
        let r = g.add_child(ListId::Node(e), None).unwrap();
        let reply = target(&g, r);
        g.add_link(ListId::Node(reply), e, None).unwrap();

        let seen = reachable_nodes(&g);
        assert_eq!(seen.len(), 2);
        assert!(seen.contains(&e) && seen.contains(&reply));
    }

    #[test]
    fn incoming_lists_owner_before_links() {
        let mut g = DialogGraph::new();
        let link = {
            let s = g.add_child(ListId::Root, None).unwrap();
            let e = target(&g, s);
            g.add_link(ListId::Root, e, Some(0)).unwrap()
        };
        let shared = target(&g, link);
        let owner = g.owner(shared).unwrap();
        assert_eq!(incoming(&g, shared), vec![owner, link]);
    }

    #[test]
    fn owned_lists_skip_link_targets() {
        let mut g = DialogGraph::new();
        let s = g.add_child(ListId::Root, None).unwrap();
        let e = target(&g, s);
        g.add_link(ListId::Root, e, None).unwrap();
        assert_eq!(owned_lists(&g), vec![ListId::Root, ListId::Node(e)]);
    }
}
