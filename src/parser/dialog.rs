//! JSON interchange format for dialogue files.
//!
//! ```json
//! {
//!   "entries": [{ "speaker": "Guard", "text": { "0": "Halt!" }, "pointers": [{ "index": 0 }] }],
//!   "replies": [{ "text": { "0": "I mean no harm." } }],
//!   "starts": [{ "index": 0 }]
//! }
//! ```
//!
//! Start pointers index into `entries`, entry pointers into `replies` and
//! reply pointers into `entries`.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::graph::model::{
    DialogGraph, DialogNode, ListId, LocString, NodeId, NodeKind, PtrId, QuestRef, RemoveOutcome,
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogFile {
    #[serde(default)]
    pub entries: Vec<NodeRecord>,
    #[serde(default)]
    pub replies: Vec<NodeRecord>,
    #[serde(default)]
    pub starts: Vec<PointerRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub speaker: String,
    /// Language id to text.
    #[serde(default)]
    pub text: BTreeMap<u32, String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub comment: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quest: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quest_entry: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pointers: Vec<PointerRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointerRecord {
    pub index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_link: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub link_comment: String,
}

pub fn parse(input: &str) -> Result<DialogFile> {
    serde_json::from_str(input).context("invalid dialogue file")
}

pub fn serialize(file: &DialogFile) -> Result<String> {
    let mut out = serde_json::to_string_pretty(file).context("failed to encode dialogue")?;
    out.push('\n');
    Ok(out)
}

/// Build a graph, repairing ownership and dropping unreachable nodes.
///
/// The returned outcome lists what the repair changed; it is empty for a
/// well-formed file.
pub fn to_graph(file: &DialogFile) -> Result<(DialogGraph, RemoveOutcome)> {
    let mut graph = DialogGraph::new();
    let entries = alloc_all(&mut graph, NodeKind::Entry, &file.entries);
    let replies = alloc_all(&mut graph, NodeKind::Reply, &file.replies);

    attach_all(&mut graph, ListId::Root, &file.starts, &entries, "entries")
        .context("in starts")?;
    for (i, record) in file.entries.iter().enumerate() {
        attach_all(&mut graph, ListId::Node(entries[i]), &record.pointers, &replies, "replies")
            .with_context(|| format!("in entry {}", i))?;
    }
    for (i, record) in file.replies.iter().enumerate() {
        attach_all(&mut graph, ListId::Node(replies[i]), &record.pointers, &entries, "entries")
            .with_context(|| format!("in reply {}", i))?;
    }

    let outcome = graph.collect_garbage();
    if !outcome.pruned.is_empty() {
        warn!(count = outcome.pruned.len(), "dropped unreachable nodes");
    }
    if !outcome.promoted.is_empty() || !outcome.demoted.is_empty() {
        warn!(
            promoted = outcome.promoted.len(),
            demoted = outcome.demoted.len(),
            "repaired link ownership"
        );
    }
    Ok((graph, outcome))
}

fn alloc_all(graph: &mut DialogGraph, kind: NodeKind, records: &[NodeRecord]) -> Vec<NodeId> {
    records
        .iter()
        .map(|record| {
            let id = graph.alloc_node(kind);
            if let Some(node) = graph.node_mut(id) {
                fill_node(node, record);
            }
            id
        })
        .collect()
}

fn fill_node(node: &mut DialogNode, record: &NodeRecord) {
    node.speaker = record.speaker.clone();
    let mut text = LocString::new();
    for (lang, s) in &record.text {
        text.set(*lang, s.clone());
    }
    node.text = text;
    node.comment = record.comment.clone();
    node.action = record.action.clone().filter(|s| !s.trim().is_empty());
    node.quest = record.quest.clone().map(|tag| QuestRef {
        tag,
        entry: record.quest_entry,
    });
}

fn attach_all(
    graph: &mut DialogGraph,
    parent: ListId,
    pointers: &[PointerRecord],
    targets: &[NodeId],
    target_list: &str,
) -> Result<()> {
    for (pos, p) in pointers.iter().enumerate() {
        let Some(&target) = targets.get(p.index) else {
            bail!(
                "pointer {} targets {} index {} but there are only {}",
                pos,
                target_list,
                p.index,
                targets.len()
            );
        };
        graph.attach(
            parent,
            target,
            p.is_link,
            p.condition.clone(),
            p.link_comment.clone(),
        )?;
    }
    Ok(())
}

/// Flatten a graph back into the interchange format.
pub fn from_graph(graph: &DialogGraph) -> DialogFile {
    let mut index: HashMap<NodeId, usize> = HashMap::new();
    let mut file = DialogFile::default();
    for node in graph.nodes() {
        let list = match node.kind() {
            NodeKind::Entry => &mut file.entries,
            NodeKind::Reply => &mut file.replies,
        };
        index.insert(node.id(), list.len());
        list.push(NodeRecord {
            speaker: node.speaker.clone(),
            text: node.text.iter().map(|(l, s)| (l, s.to_string())).collect(),
            comment: node.comment.clone(),
            action: node.action.clone(),
            quest: node.quest.as_ref().map(|q| q.tag.clone()),
            quest_entry: node.quest.as_ref().and_then(|q| q.entry),
            pointers: Vec::new(),
        });
    }

    let records = |ptrs: &[PtrId]| -> Vec<PointerRecord> {
        ptrs.iter()
            .filter_map(|id| graph.pointer(*id))
            .filter_map(|p| {
                Some(PointerRecord {
                    index: *index.get(&p.target())?,
                    condition: p.condition().map(str::to_string),
                    is_link: p.is_link(),
                    link_comment: p.link_comment().to_string(),
                })
            })
            .collect()
    };

    file.starts = records(graph.starts());
    for node in graph.nodes() {
        let Some(&i) = index.get(&node.id()) else {
            continue;
        };
        let pointers = records(node.pointers());
        match node.kind() {
            NodeKind::Entry => file.entries[i].pointers = pointers,
            NodeKind::Reply => file.replies[i].pointers = pointers,
        }
    }
    file
}

pub fn load(path: &Path) -> Result<(DialogGraph, RemoveOutcome)> {
    let input =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let file = parse(&input).with_context(|| format!("failed to parse {}", path.display()))?;
    to_graph(&file).with_context(|| format!("failed to load {}", path.display()))
}

pub fn save(path: &Path, graph: &DialogGraph) -> Result<()> {
    let out = serialize(&from_graph(graph))?;
    fs::write(path, out).with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const GUARD: &str = r#"{
        "entries": [
            { "speaker": "Guard", "text": { "0": "Halt!", "2": "Halte!" }, "pointers": [{ "index": 0 }, { "index": 1, "condition": "gc_has_pass" }] },
            { "speaker": "Guard", "text": { "0": "Move along." }, "action": "nw_walk_wp" }
        ],
        "replies": [
            { "text": { "0": "I mean no harm." }, "pointers": [{ "index": 1 }] },
            { "text": { "0": "Here is my pass." }, "quest": "q_gate", "quest_entry": 20, "pointers": [{ "index": 1, "is_link": true, "link_comment": "same farewell" }] }
        ],
        "starts": [{ "index": 0 }]
    }"#;

    #[test]
    fn loads_content_and_structure() {
        let (g, outcome) = to_graph(&parse(GUARD).unwrap()).unwrap();
        assert!(outcome.is_empty());
        assert_eq!(g.node_count(), 4);
        assert_eq!(g.pointer_count(), 5);

        let start = g.pointer(g.starts()[0]).unwrap();
        let halt = g.node(start.target()).unwrap();
        assert_eq!(halt.speaker, "Guard");
        assert_eq!(halt.text.get(2), Some("Halte!"));
        let second = g.pointer(halt.pointers()[1]).unwrap();
        assert_eq!(second.condition(), Some("gc_has_pass"));

        let pass = g.node(second.target()).unwrap();
        assert_eq!(pass.quest, Some(QuestRef { tag: "q_gate".into(), entry: Some(20) }));
        let link = g.pointer(pass.pointers()[0]).unwrap();
        assert!(link.is_link());
        assert_eq!(link.link_comment(), "same farewell");
    }

    #[test]
    fn canonical_file_survives_save_and_load() {
        let file = parse(GUARD).unwrap();
        let (g, _) = to_graph(&file).unwrap();
        assert_eq!(from_graph(&g), file);
    }

    #[test]
    fn out_of_range_index_names_the_location() {
        let bad = r#"{ "entries": [{ "pointers": [{ "index": 3 }] }], "starts": [{ "index": 0 }] }"#;
        let err = to_graph(&parse(bad).unwrap()).unwrap_err();
        let msg = format!("{:#}", err);
        assert!(msg.contains("in entry 0"), "{}", msg);
        assert!(msg.contains("replies index 3"), "{}", msg);
    }

    #[test]
    fn unreachable_nodes_are_dropped() {
        let input = r#"{
            "entries": [{ "text": { "0": "kept" } }, { "text": { "0": "orphan" } }],
            "starts": [{ "index": 0 }]
        }"#;
        let (g, outcome) = to_graph(&parse(input).unwrap()).unwrap();
        assert_eq!(g.node_count(), 1);
        assert_eq!(outcome.pruned.len(), 1);
    }

    #[test]
    fn link_only_target_gets_an_owner() {
        let input = r#"{
            "entries": [{ "text": { "0": "only linked" } }],
            "starts": [{ "index": 0, "is_link": true }]
        }"#;
        let (g, outcome) = to_graph(&parse(input).unwrap()).unwrap();
        assert_eq!(outcome.promoted.len(), 1);
        assert!(!g.pointer(g.starts()[0]).unwrap().is_link());
    }

    #[test]
    fn save_then_load_from_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("guard.json");
        let (g, _) = to_graph(&parse(GUARD).unwrap()).unwrap();
        save(&path, &g).unwrap();
        let (back, outcome) = load(&path).unwrap();
        assert!(outcome.is_empty());
        assert_eq!(from_graph(&back), from_graph(&g));
    }

    #[test]
    fn missing_file_is_reported() {
        let dir = TempDir::new().unwrap();
        let err = load(&dir.path().join("nope.json")).unwrap_err();
        assert!(format!("{}", err).contains("failed to read"));
    }
}
