//! `dlgtree inspect`: query a dialogue file for specific conditions.

use std::path::Path;

use anyhow::{Result, bail};

use dlgtree::graph::model::{DialogGraph, ListId, NodeId};
use dlgtree::graph::traverse;
use dlgtree::sync::Synchronizer;

use crate::commands;

// ---------------------------------------------------------------------------
// Public entry points
// ---------------------------------------------------------------------------

pub fn run_unreachable(path: &Path) -> Result<()> {
    let (sync, _) = commands::load(path)?;
    print_lines(unreachable_report(&sync), "  No unreachable branches.");
    Ok(())
}

pub fn run_links(path: &Path, node: &str) -> Result<()> {
    let (sync, _) = commands::load(path)?;
    let id = parse_node(sync.graph(), node)?;
    print_lines(links_report(sync.graph(), id), "  Nothing points at this node.");
    Ok(())
}

pub fn run_path(path: &Path, node: &str) -> Result<()> {
    let (sync, _) = commands::load(path)?;
    let id = parse_node(sync.graph(), node)?;
    print_lines(path_report(sync.graph(), id), "  No owning path from the root.");
    Ok(())
}

fn print_lines(lines: Vec<String>, empty: &str) {
    if lines.is_empty() {
        println!("{}", empty);
    } else {
        for line in lines {
            println!("  {}", line);
        }
    }
}

fn parse_node(graph: &DialogGraph, raw: &str) -> Result<NodeId> {
    let id: NodeId = raw.parse().map_err(anyhow::Error::msg)?;
    if !graph.contains_node(id) {
        bail!("node {} is not in this dialogue", id);
    }
    Ok(id)
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// Every statically unreachable pointer, grouped by list in tree order.
fn unreachable_report(sync: &Synchronizer) -> Vec<String> {
    let graph = sync.graph();
    let mut lines = Vec::new();
    for list in traverse::owned_lists(graph) {
        let Some(pointers) = graph.children(list) else {
            continue;
        };
        for idx in sync.unreachable(list) {
            let Some(ptr) = pointers.get(idx).and_then(|p| graph.pointer(*p)) else {
                continue;
            };
            let guard = ptr.condition().unwrap_or("no condition");
            lines.push(format!(
                "{} #{} -> {} [{}]",
                list,
                idx,
                describe(graph, ptr.target()),
                guard
            ));
        }
    }
    lines
}

/// The owning pointer and every link that targets `node`.
fn links_report(graph: &DialogGraph, node: NodeId) -> Vec<String> {
    traverse::incoming(graph, node)
        .into_iter()
        .filter_map(|id| graph.pointer(id))
        .map(|ptr| {
            let role = if ptr.is_link() { "link " } else { "owner" };
            let from = match ptr.parent() {
                ListId::Root => "root".to_string(),
                ListId::Node(parent) => describe(graph, parent),
            };
            if ptr.link_comment().is_empty() {
                format!("{} {} from {}", role, ptr.id(), from)
            } else {
                format!("{} {} from {} : {}", role, ptr.id(), from, ptr.link_comment())
            }
        })
        .collect()
}

/// Owning path from the root down to `node`.
fn path_report(graph: &DialogGraph, node: NodeId) -> Vec<String> {
    let Some(path) = traverse::ancestor_path(graph, node) else {
        return Vec::new();
    };
    let mut lines = vec!["root".to_string()];
    for (depth, id) in path.iter().enumerate() {
        let Some(ptr) = graph.pointer(*id) else {
            continue;
        };
        lines.push(format!(
            "{}└─ {}",
            "   ".repeat(depth),
            describe(graph, ptr.target())
        ));
    }
    lines
}

fn describe(graph: &DialogGraph, id: NodeId) -> String {
    match graph.node(id) {
        Some(node) => format!("{} {} \"{}\"", id, node.kind().label(), node.display_text()),
        None => id.to_string(),
    }
}
