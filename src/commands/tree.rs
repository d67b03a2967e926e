//! `dlgtree tree`: print the tree projection of a dialogue file.

use std::path::Path;

use anyhow::Result;
use crossterm::style::Stylize;

use dlgtree::graph::model::{DialogGraph, NodeKind};
use dlgtree::parser::config::Config;
use dlgtree::projection::state;
use dlgtree::projection::{ProjectionNode, ProjectionTree};

use crate::commands;

pub fn run(path: &Path, all: bool) -> Result<()> {
    let (mut sync, config) = commands::load(path)?;
    if all {
        sync.expand_all();
    }
    for row in tree_rows(sync.graph(), sync.projection(), &config) {
        let text = format!("{}{}", row.prefix, row.label);
        if row.unreachable {
            println!("  {}{}", text.dark_grey(), row.detail.dark_grey());
        } else if row.is_link {
            println!("  {}{}", text.cyan(), row.detail.dark_grey());
        } else {
            println!("  {}{}", text, row.detail.dark_grey());
        }
    }
    Ok(())
}

/// One printable row of the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeRow {
    pub prefix: String,
    pub label: String,
    /// Condition, link comment and markers; printed dimmed after the label.
    pub detail: String,
    pub unreachable: bool,
    pub is_link: bool,
}

pub fn tree_rows(graph: &DialogGraph, tree: &ProjectionTree, config: &Config) -> Vec<TreeRow> {
    state::visible_rows(tree)
        .into_iter()
        .map(|row| TreeRow {
            prefix: guide_prefix(tree, row),
            label: row_label(graph, row),
            detail: row_detail(graph, row, config),
            unreachable: config.show_unreachable && row.is_unreachable_sibling,
            is_link: row.is_link(),
        })
        .collect()
}

/// Tree guides (`│  `, `├─ `, `└─ `) plus the fold marker.
pub fn guide_prefix(tree: &ProjectionTree, row: &ProjectionNode) -> String {
    let mut prefix = String::new();
    if row.depth() > 0 {
        for key in tree.ancestors(row.key()).into_iter().skip(1) {
            let last = tree.get(key).is_none_or(|a| tree.is_last_child(a));
            prefix.push_str(if last { "   " } else { "│  " });
        }
        prefix.push_str(if tree.is_last_child(row) { "└─ " } else { "├─ " });
    }
    if row.has_children() {
        prefix.push_str(if row.is_expanded { "▾ " } else { "▸ " });
    }
    prefix
}

pub fn row_label(graph: &DialogGraph, row: &ProjectionNode) -> String {
    let Some(node) = row.node().and_then(|id| graph.node(id)) else {
        return "Root".to_string();
    };
    let text = node.display_text();
    let body = match node.kind() {
        NodeKind::Entry if !node.speaker.is_empty() => format!("{}: {}", node.speaker, text),
        NodeKind::Entry => format!("Owner: {}", text),
        NodeKind::Reply => format!("PC: {}", text),
    };
    if row.is_link() {
        format!("-> {} {}", node.id(), body)
    } else {
        format!("{} {}", node.id(), body)
    }
}

fn row_detail(graph: &DialogGraph, row: &ProjectionNode, config: &Config) -> String {
    let mut detail = String::new();
    let Some(ptr) = row.pointer().and_then(|p| graph.pointer(p)) else {
        return detail;
    };
    if let Some(cond) = ptr.condition() {
        detail.push_str(&format!("  [if {}]", cond));
    }
    if row.is_link() && config.show_link_comments && !ptr.link_comment().is_empty() {
        detail.push_str(&format!("  # {}", ptr.link_comment()));
    }
    if let Some(action) = row.node().and_then(|n| graph.node(n)).and_then(|n| n.action.as_deref())
        && !row.is_link()
    {
        detail.push_str(&format!("  [do {}]", action));
    }
    if config.show_unreachable && row.is_unreachable_sibling {
        detail.push_str("  (unreachable)");
    }
    if !row.is_expanded && row.has_children() {
        detail.push_str(&format!("  +{}", row.child_count()));
    }
    detail
}
