use ratatui::Frame;
use ratatui::layout::{Constraint, Flex, Layout, Margin, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Clear, Padding, Paragraph, Wrap};

use dlgtree::graph::model::{DialogGraph, ListId, NodeKind};
use dlgtree::graph::traverse;
use dlgtree::projection::ProjectionNode;

use crate::commands::tree::TreeRow;

pub struct ViewData<'a> {
    pub rows: &'a [TreeRow],
    pub cursor: Option<usize>,
    pub scroll: usize,
    pub details: Vec<Line<'static>>,
    pub selected_label: &'a str,
    pub marked_label: Option<&'a str>,
    pub summary: &'a str,
    pub hints: &'a str,
    pub message: Option<&'a str>,
    pub show_help: bool,
    pub demo: bool,
}

/// Rows that fit in the tree pane for a terminal of `area`.
pub fn tree_view_rows(area: Rect) -> usize {
    // outer margin, double border, padding, status block
    usize::from(area.height.saturating_sub(2 + 2 + 2 + 5 + 2))
}

pub fn draw(frame: &mut Frame, data: &ViewData<'_>) {
    let area = frame.area().inner(Margin {
        horizontal: 3,
        vertical: 1,
    });

    let mut title_spans = vec![
        Span::styled("dlgtree view", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw("  "),
        Span::styled("[?] help", Style::default().fg(Color::DarkGray)),
        Span::raw("  "),
        Span::styled("[q] quit", Style::default().fg(Color::DarkGray)),
    ];
    if data.demo {
        title_spans.push(Span::raw("  "));
        title_spans.push(Span::styled(
            "[DEMO]",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ));
    }
    let outer = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Double)
        .border_style(Style::default().fg(Color::DarkGray))
        .padding(Padding::new(2, 2, 1, 1))
        .title(Line::from(title_spans));
    let inner = outer.inner(area);
    frame.render_widget(outer, area);

    let [panes_area, _gap, status_area] = Layout::vertical([
        Constraint::Min(6),
        Constraint::Length(1),
        Constraint::Length(4),
    ])
    .areas(inner);
    let [tree_outer, details_outer] =
        Layout::horizontal([Constraint::Percentage(62), Constraint::Percentage(38)])
            .areas(panes_area);

    let tree_block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(Color::White))
        .title(Span::styled(
            "TREE",
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        ));
    let tree_inner = tree_block.inner(tree_outer);
    frame.render_widget(tree_block, tree_outer);
    let tree = Paragraph::new(build_tree_lines(data.rows, data.cursor))
        .scroll((u16::try_from(data.scroll).unwrap_or(u16::MAX), 0));
    frame.render_widget(tree, tree_inner);

    let details_block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            "DETAILS",
            Style::default()
                .fg(Color::Gray)
                .add_modifier(Modifier::BOLD),
        ));
    let details_inner = details_block.inner(details_outer);
    frame.render_widget(details_block, details_outer);
    let details = Paragraph::new(data.details.clone()).wrap(Wrap { trim: false });
    frame.render_widget(details, details_inner);

    let mut top_status = format!("SELECTED: {}   {}", data.selected_label, data.summary);
    if let Some(marked) = data.marked_label {
        top_status.push_str(&format!("   link target: {}", marked));
    }
    let mut hint_line = data.hints.to_string();
    if let Some(msg) = data.message {
        hint_line.push_str("   ");
        hint_line.push_str(msg);
    }
    let status = Paragraph::new(vec![
        Line::from(Span::styled(
            top_status,
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(hint_line, Style::default().fg(Color::DarkGray))),
    ])
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(Color::DarkGray))
            .padding(Padding::new(1, 1, 0, 0)),
    );
    frame.render_widget(status, status_area);

    if data.show_help {
        render_help_overlay(frame);
    }
}

fn build_tree_lines(rows: &[TreeRow], cursor: Option<usize>) -> Vec<Line<'static>> {
    rows.iter()
        .enumerate()
        .map(|(idx, row)| {
            let selected = cursor == Some(idx);
            let mut label_style = if row.unreachable {
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::CROSSED_OUT)
            } else if row.is_link {
                Style::default().fg(Color::Cyan)
            } else {
                Style::default().fg(Color::White)
            };
            let mut scaffold_style = Style::default().fg(Color::DarkGray);
            if selected {
                label_style = label_style.bg(Color::DarkGray).add_modifier(Modifier::BOLD);
                scaffold_style = scaffold_style.bg(Color::DarkGray);
            }
            Line::from(vec![
                Span::styled(row.prefix.clone(), scaffold_style),
                Span::styled(row.label.clone(), label_style),
                Span::styled(row.detail.clone(), Style::default().fg(Color::DarkGray)),
            ])
        })
        .collect()
}

pub fn build_details_lines(graph: &DialogGraph, row: Option<&ProjectionNode>) -> Vec<Line<'static>> {
    let heading = |text: &str| {
        Line::from(Span::styled(
            text.to_string(),
            Style::default()
                .fg(Color::Gray)
                .add_modifier(Modifier::BOLD),
        ))
    };
    let field = |key: &str, value: String| {
        Line::from(vec![
            Span::styled(format!("{key:<10}"), Style::default().fg(Color::DarkGray)),
            Span::raw(value),
        ])
    };

    let Some(row) = row else {
        return vec![Line::from("Nothing selected.")];
    };
    let Some(node) = row.node().and_then(|id| graph.node(id)) else {
        return vec![
            heading("Root"),
            field("starts", graph.starts().len().to_string()),
            field("nodes", graph.node_count().to_string()),
            field("pointers", graph.pointer_count().to_string()),
        ];
    };

    let mut lines = vec![heading(&format!(
        "{} {}",
        node.id(),
        match node.kind() {
            NodeKind::Entry => "NPC entry",
            NodeKind::Reply => "PC reply",
        }
    ))];
    if !node.speaker.is_empty() {
        lines.push(field("speaker", node.speaker.clone()));
    }
    for (lang, text) in node.text.iter() {
        lines.push(field(&format!("text[{}]", lang), text.to_string()));
    }
    if let Some(action) = &node.action {
        lines.push(field("action", action.clone()));
    }
    if let Some(quest) = &node.quest {
        let entry = quest.entry.map(|e| format!(" #{}", e)).unwrap_or_default();
        lines.push(field("quest", format!("{}{}", quest.tag, entry)));
    }
    if !node.comment.is_empty() {
        lines.push(field("comment", node.comment.clone()));
    }

    if let Some(ptr) = row.pointer().and_then(|p| graph.pointer(p)) {
        lines.push(Line::from(""));
        lines.push(heading(if ptr.is_link() { "Link" } else { "Pointer" }));
        lines.push(field("id", ptr.id().to_string()));
        lines.push(field(
            "condition",
            ptr.condition().unwrap_or("(none)").to_string(),
        ));
        if !ptr.link_comment().is_empty() {
            lines.push(field("note", ptr.link_comment().to_string()));
        }
        if row.is_unreachable_sibling {
            lines.push(Line::from(Span::styled(
                "never taken: an earlier sibling always wins or the guard is false",
                Style::default().fg(Color::LightRed),
            )));
        }
    }

    let incoming = traverse::incoming(graph, node.id());
    let links: Vec<String> = incoming
        .iter()
        .filter_map(|p| graph.pointer(*p))
        .filter(|p| p.is_link())
        .map(|p| match p.parent() {
            ListId::Root => "root".to_string(),
            ListId::Node(parent) => parent.to_string(),
        })
        .collect();
    if !links.is_empty() {
        lines.push(Line::from(""));
        lines.push(field("linked by", links.join(", ")));
    }
    lines
}

pub fn draw_text_prompt(frame: &mut Frame, title: &str, buffer: &str, cursor: usize) {
    let area = centered_rect(frame.area(), 70, 28);
    frame.render_widget(Clear, area);
    let paragraph = Paragraph::new(vec![
        Line::from(Span::styled(
            title.to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        line_with_cursor(
            buffer,
            cursor,
            "leave empty to clear",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
            Style::default().fg(Color::DarkGray),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::SLOW_BLINK),
        ),
        Line::from(""),
        Line::from(Span::styled(
            "[Backspace] delete  [Enter] save  [Esc] back",
            Style::default().fg(Color::DarkGray),
        )),
    ])
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Double)
            .border_style(Style::default().fg(Color::Yellow))
            .padding(Padding::new(2, 2, 1, 1)),
    )
    .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

pub fn draw_confirm_prompt(frame: &mut Frame, message: &str) {
    let area = centered_rect(frame.area(), 60, 24);
    frame.render_widget(Clear, area);
    let paragraph = Paragraph::new(vec![
        Line::from(Span::styled(
            message.to_string(),
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "[y/Enter] confirm  [n/Esc] cancel",
            Style::default().fg(Color::DarkGray),
        )),
    ])
    .block(
        Block::default()
            .title(" confirm ")
            .borders(Borders::ALL)
            .border_type(BorderType::Double)
            .border_style(Style::default().fg(Color::LightRed))
            .padding(Padding::new(2, 2, 1, 1)),
    )
    .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn line_with_cursor(
    text: &str,
    cursor: usize,
    placeholder: &str,
    text_style: Style,
    placeholder_style: Style,
    caret_style: Style,
) -> Line<'static> {
    let mut spans = Vec::new();
    let char_len = text.chars().count();
    let clamped = cursor.min(char_len);

    if char_len == 0 {
        spans.push(Span::styled("▌", caret_style));
        if !placeholder.is_empty() {
            spans.push(Span::raw(" "));
            spans.push(Span::styled(placeholder.to_string(), placeholder_style));
        }
        return Line::from(spans);
    }

    let split = byte_index_for_cursor(text, clamped);
    let (left, right) = text.split_at(split);
    if !left.is_empty() {
        spans.push(Span::styled(left.to_string(), text_style));
    }
    spans.push(Span::styled("▌", caret_style));
    if !right.is_empty() {
        spans.push(Span::styled(right.to_string(), text_style));
    }
    Line::from(spans)
}

pub fn byte_index_for_cursor(text: &str, cursor: usize) -> usize {
    text.char_indices()
        .nth(cursor)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len())
}

fn render_help_overlay(frame: &mut Frame) {
    let area = centered_rect(frame.area(), 84, 70);
    frame.render_widget(Clear, area);
    let help = Paragraph::new(vec![
        Line::from("NAVIGATE"),
        Line::from("  j/k or arrows move, h/l collapse/expand or jump to parent/child"),
        Line::from("  Enter/Space toggles, E expands all, C collapses all"),
        Line::from(""),
        Line::from("EDIT"),
        Line::from("  n  add a child under the selected row"),
        Line::from("  m  mark the selected node as link target, L link it here"),
        Line::from("  c  edit the guard condition, e edit the line's text"),
        Line::from("  d  delete the selected pointer (unreachable nodes are pruned)"),
        Line::from(""),
        Line::from("Dimmed rows can never be taken. s opens settings."),
        Line::from("Esc/Backspace backs out one step."),
    ])
    .block(Block::default().title("Help").borders(Borders::ALL));
    frame.render_widget(help, area);
}

pub fn centered_rect(area: Rect, width_percent: u16, height_percent: u16) -> Rect {
    let vertical = Layout::vertical([
        Constraint::Percentage((100 - height_percent) / 2),
        Constraint::Percentage(height_percent),
        Constraint::Percentage((100 - height_percent) / 2),
    ])
    .flex(Flex::Center)
    .split(area);
    Layout::horizontal([
        Constraint::Percentage((100 - width_percent) / 2),
        Constraint::Percentage(width_percent),
        Constraint::Percentage((100 - width_percent) / 2),
    ])
    .flex(Flex::Center)
    .split(vertical[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_index_respects_multibyte_chars() {
        assert_eq!(byte_index_for_cursor("héllo", 2), 3);
        assert_eq!(byte_index_for_cursor("abc", 10), 3);
    }

    #[test]
    fn root_details_show_counts() {
        let mut g = DialogGraph::new();
        g.add_child(ListId::Root, None).unwrap();
        let tree = dlgtree::projection::ProjectionTree::build(&g);
        let lines = build_details_lines(&g, Some(tree.root()));
        let text: Vec<String> = lines.iter().map(|l| l.to_string()).collect();
        assert_eq!(text[0], "Root");
        assert!(text[1].contains('1'));
    }

    #[test]
    fn pointer_details_show_condition() {
        let mut g = DialogGraph::new();
        let s = g.add_child(ListId::Root, None).unwrap();
        g.set_condition(s, Some("gc_first".into())).unwrap();
        let tree = dlgtree::projection::ProjectionTree::build(&g);
        let row = tree.get(dlgtree::projection::StableKey::Pointer(s));
        let text: Vec<String> = build_details_lines(&g, row).iter().map(|l| l.to_string()).collect();
        assert!(text.iter().any(|l| l.contains("gc_first")));
        assert!(text[0].ends_with("NPC entry"));
    }
}
