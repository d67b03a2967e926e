//! The flowchart projection: dialogue nodes as boxes, pointers as edges.
//!
//! Unlike the tree, every dialogue node appears exactly once. Each link
//! pointer becomes its own small `link` node pointing at the shared target,
//! which keeps cross-links distinguishable from owning edges.

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeSet, HashMap};
use std::hash::{Hash, Hasher};

use serde::Serialize;

use crate::graph::model::{DialogGraph, DialogNode, ListId, NodeId, NodeKind, PtrId};

pub const ROOT_ID: &str = "root";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowNodeKind {
    Root,
    Npc,
    Pc,
    Link,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FlowNode {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: FlowNodeKind,
    pub text: String,
    pub speaker: String,
    pub has_action: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_script: Option<String>,
    pub is_link: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_target: Option<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub link_comment: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FlowLink {
    pub source: String,
    pub target: String,
    pub has_condition: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition_script: Option<String>,
    pub unreachable: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct FlowchartData {
    pub nodes: Vec<FlowNode>,
    pub links: Vec<FlowLink>,
    /// Id of the node matching the tree selection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected: Option<String>,
}

impl FlowchartData {
    /// Hash of the whole structure; a changed value means a re-render is due.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

/// Flowchart id of a dialogue node (`entry_3`, `reply_7`).
pub fn flow_id(node: &DialogNode) -> String {
    format!("{}_{}", node.kind().label(), node.id().raw())
}

/// Flowchart id of the synthetic node standing for a link pointer.
pub fn link_flow_id(ptr: PtrId) -> String {
    format!("link_{}", ptr.raw())
}

/// Resolve a flowchart id back to the dialogue node it shows.
///
/// Link ids resolve to the link's target.
pub fn node_for_flow_id(graph: &DialogGraph, id: &str) -> Option<NodeId> {
    let (prefix, raw) = id.rsplit_once('_')?;
    let raw: u64 = raw.parse().ok()?;
    match prefix {
        "entry" | "reply" => {
            let node = NodeId::from_raw(raw);
            let kind = graph.node(node)?.kind();
            (kind.label() == prefix).then_some(node)
        }
        "link" => graph
            .pointers()
            .find(|p| p.id().raw() == raw && p.is_link())
            .map(|p| p.target()),
        _ => None,
    }
}

/// The link pointer a `link_*` id stands for.
pub fn link_for_flow_id(graph: &DialogGraph, id: &str) -> Option<PtrId> {
    let raw: u64 = id.strip_prefix("link_")?.parse().ok()?;
    graph
        .pointers()
        .find(|p| p.id().raw() == raw && p.is_link())
        .map(|p| p.id())
}

/// Build the flowchart structure, flagging edges whose sibling index is in
/// the unreachable set of their list.
pub fn build(graph: &DialogGraph, unreachable: &HashMap<ListId, BTreeSet<usize>>) -> FlowchartData {
    let mut data = FlowchartData::default();
    data.nodes.push(FlowNode {
        id: ROOT_ID.to_string(),
        kind: FlowNodeKind::Root,
        text: "Dialog Start".to_string(),
        speaker: String::new(),
        has_action: false,
        action_script: None,
        is_link: false,
        link_target: None,
        link_comment: String::new(),
    });

    for node in graph.nodes() {
        data.nodes.push(FlowNode {
            id: flow_id(node),
            kind: match node.kind() {
                NodeKind::Entry => FlowNodeKind::Npc,
                NodeKind::Reply => FlowNodeKind::Pc,
            },
            text: node.display_text().to_string(),
            speaker: node.speaker.clone(),
            has_action: node.action.is_some(),
            action_script: node.action.clone(),
            is_link: false,
            link_target: None,
            link_comment: String::new(),
        });
    }

    let empty = BTreeSet::new();
    let mut lists: Vec<(ListId, String, &[PtrId])> = vec![(
        ListId::Root,
        ROOT_ID.to_string(),
        graph.starts(),
    )];
    lists.extend(
        graph
            .nodes()
            .map(|n| (ListId::Node(n.id()), flow_id(n), n.pointers())),
    );

    for (list, source, pointers) in lists {
        let hidden = unreachable.get(&list).unwrap_or(&empty);
        for (idx, ptr_id) in pointers.iter().enumerate() {
            let Some(ptr) = graph.pointer(*ptr_id) else {
                continue;
            };
            let Some(target) = graph.node(ptr.target()) else {
                continue;
            };
            let condition = ptr.condition().map(str::to_string);
            let edge_target = if ptr.is_link() {
                let id = link_flow_id(*ptr_id);
                data.nodes.push(FlowNode {
                    id: id.clone(),
                    kind: FlowNodeKind::Link,
                    text: format!("-> {}", target.display_text()),
                    speaker: target.speaker.clone(),
                    has_action: false,
                    action_script: None,
                    is_link: true,
                    link_target: Some(flow_id(target)),
                    link_comment: ptr.link_comment().to_string(),
                });
                id
            } else {
                flow_id(target)
            };
            data.links.push(FlowLink {
                source: source.clone(),
                target: edge_target,
                has_condition: condition.is_some(),
                condition_script: condition,
                unreachable: hidden.contains(&idx),
            });
        }
    }

    data
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (DialogGraph, PtrId, PtrId) {
        let mut g = DialogGraph::new();
        let s = g.add_child(ListId::Root, None).unwrap();
        let entry = g.pointer(s).unwrap().target();
        g.node_mut(entry).unwrap().speaker = "Guard".into();
        let r = g.add_child(ListId::Node(entry), None).unwrap();
        let reply = g.pointer(r).unwrap().target();
        let link = g.add_link(ListId::Node(reply), entry, None).unwrap();
        g.set_condition(link, Some("gc_has_item".into())).unwrap();
        (g, s, link)
    }

    #[test]
    fn every_node_once_plus_link_nodes() {
        let (g, _, link) = sample();
        let data = build(&g, &HashMap::new());
        // root + entry + reply + link node
        assert_eq!(data.nodes.len(), 4);
        assert_eq!(data.links.len(), 3);

        let link_node = data.nodes.iter().find(|n| n.kind == FlowNodeKind::Link).unwrap();
        assert_eq!(link_node.id, link_flow_id(link));
        let entry_id = format!("entry_{}", g.pointer(link).unwrap().target().raw());
        assert_eq!(link_node.link_target.as_deref(), Some(entry_id.as_str()));

        let edge = data.links.iter().find(|l| l.target == link_node.id).unwrap();
        assert!(edge.has_condition);
        assert_eq!(edge.condition_script.as_deref(), Some("gc_has_item"));
    }

    #[test]
    fn unreachable_flags_follow_sibling_index() {
        let mut g = DialogGraph::new();
        g.add_child(ListId::Root, None).unwrap();
        g.add_child(ListId::Root, None).unwrap();
        let sets = HashMap::from([(ListId::Root, BTreeSet::from([1]))]);
        let data = build(&g, &sets);
        let flags: Vec<bool> = data.links.iter().map(|l| l.unreachable).collect();
        assert_eq!(flags, vec![false, true]);
    }

    #[test]
    fn fingerprint_changes_with_structure() {
        let (mut g, s, _) = sample();
        let before = build(&g, &HashMap::new()).fingerprint();
        assert_eq!(before, build(&g, &HashMap::new()).fingerprint());
        g.set_condition(s, Some("gc_other".into())).unwrap();
        assert_ne!(before, build(&g, &HashMap::new()).fingerprint());
    }

    #[test]
    fn flow_ids_resolve_back_to_nodes() {
        let (g, s, link) = sample();
        let entry = g.pointer(s).unwrap().target();
        let id = flow_id(g.node(entry).unwrap());
        assert_eq!(node_for_flow_id(&g, &id), Some(entry));
        assert_eq!(node_for_flow_id(&g, &link_flow_id(link)), Some(entry));
        assert_eq!(node_for_flow_id(&g, &format!("reply_{}", entry.raw())), None);
        assert_eq!(node_for_flow_id(&g, ROOT_ID), None);
        assert_eq!(link_for_flow_id(&g, &link_flow_id(link)), Some(link));
        assert_eq!(link_for_flow_id(&g, &link_flow_id(s)), None);
        assert_eq!(link_for_flow_id(&g, &id), None);
    }

    #[test]
    fn serializes_with_type_field() {
        let (g, _, _) = sample();
        let json = serde_json::to_value(build(&g, &HashMap::new())).unwrap();
        assert_eq!(json["nodes"][0]["type"], "root");
        assert_eq!(json["nodes"][1]["type"], "npc");
    }
}
