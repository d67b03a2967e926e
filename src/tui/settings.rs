use crossterm::event::{KeyCode, KeyEvent};
use ratatui::Frame;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Clear, Padding, Paragraph};

use dlgtree::parser::config::Config;

use crate::tui::render::centered_rect;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsEvent {
    None,
    Changed,
    Close,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SettingsPanelState {
    pub selected_row: usize,
}

const SETTINGS_ROW_COUNT: usize = 4;
const MAX_EXPAND_DEPTH: usize = 16;

pub fn handle_key(
    key: KeyEvent,
    state: &mut SettingsPanelState,
    config: &mut Config,
) -> SettingsEvent {
    match key.code {
        KeyCode::Esc | KeyCode::Backspace | KeyCode::Char('q') => SettingsEvent::Close,
        KeyCode::Up | KeyCode::Char('k') => {
            state.selected_row = state.selected_row.saturating_sub(1);
            SettingsEvent::None
        }
        KeyCode::Down | KeyCode::Char('j') => {
            state.selected_row = (state.selected_row + 1).min(SETTINGS_ROW_COUNT - 1);
            SettingsEvent::None
        }
        KeyCode::Left | KeyCode::Char('h') => adjust(config, state.selected_row, false),
        KeyCode::Right | KeyCode::Char('l') | KeyCode::Enter | KeyCode::Char(' ') => {
            adjust(config, state.selected_row, true)
        }
        _ => SettingsEvent::None,
    }
}

pub fn draw(frame: &mut Frame, state: &SettingsPanelState, config: &Config) {
    let area = centered_rect(frame.area(), 56, 44);
    frame.render_widget(Clear, area);

    let title = Line::from(vec![
        Span::styled(
            "Settings",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled("[Esc] close", Style::default().fg(Color::Gray)),
    ]);

    let selected_row = state.selected_row.min(SETTINGS_ROW_COUNT - 1);
    let mut lines = vec![
        settings_row(
            selected_row == 0,
            "evaluation order",
            config.evaluation_order.as_str().to_string(),
            Color::Yellow,
        ),
        settings_row(
            selected_row == 1,
            "expand depth on load",
            config.expand_depth.to_string(),
            Color::Yellow,
        ),
        toggle_row(
            selected_row == 2,
            "mark unreachable",
            config.show_unreachable,
        ),
        toggle_row(
            selected_row == 3,
            "show link comments",
            config.show_link_comments,
        ),
        Line::from(""),
        Line::from(Span::styled(
            "About this option",
            Style::default()
                .fg(Color::Gray)
                .add_modifier(Modifier::BOLD),
        )),
    ];
    for text in selected_row_description(selected_row) {
        lines.push(Line::from(Span::styled(
            text,
            Style::default().fg(Color::DarkGray),
        )));
    }
    lines.extend([
        Line::from(""),
        Line::from(Span::styled(
            "Use arrows/hjkl or Enter/Space to change.",
            Style::default().fg(Color::DarkGray),
        )),
        Line::from(Span::styled(
            "Changes write to .dlgtree immediately.",
            Style::default().fg(Color::DarkGray),
        )),
    ]);

    let panel = Paragraph::new(lines).block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(Color::Cyan))
            .padding(Padding::new(1, 1, 1, 0)),
    );
    frame.render_widget(panel, area);
}

fn toggle_row(selected: bool, key: &str, enabled: bool) -> Line<'static> {
    let (text, color) = if enabled {
        ("[ON]", Color::Green)
    } else {
        ("[OFF]", Color::LightRed)
    };
    settings_row(selected, key, text.to_string(), color)
}

fn settings_row(selected: bool, key: &str, value: String, color: Color) -> Line<'static> {
    let indicator = if selected { ">" } else { " " };
    let base_style = if selected {
        Style::default()
            .fg(Color::White)
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Gray)
    };
    let mut value_style = Style::default().fg(color).add_modifier(Modifier::BOLD);
    if selected {
        value_style = value_style.bg(Color::DarkGray);
    }

    Line::from(vec![
        Span::styled(format!("{indicator} {key:<24}"), base_style),
        Span::styled(value, value_style),
    ])
}

fn selected_row_description(selected_row: usize) -> [&'static str; 2] {
    match selected_row {
        0 => [
            "first-match: an unconditional branch hides later ones.",
            "independent: only provably false guards are hidden.",
        ],
        1 => [
            "How many levels of the tree are open right after",
            "a dialogue file is loaded.",
        ],
        2 => [
            "Dims branches whose guard can never pass or that",
            "sit behind an unconditional sibling.",
        ],
        3 => [
            "Shows the note stored on each link pointer next",
            "to the link row.",
        ],
        _ => ["", ""],
    }
}

fn adjust(config: &mut Config, selected_row: usize, forward: bool) -> SettingsEvent {
    match selected_row {
        0 => {
            config.evaluation_order = if forward {
                config.evaluation_order.next()
            } else {
                config.evaluation_order.next().next()
            };
            SettingsEvent::Changed
        }
        1 => {
            config.expand_depth = if forward {
                (config.expand_depth + 1).min(MAX_EXPAND_DEPTH)
            } else {
                config.expand_depth.saturating_sub(1)
            };
            SettingsEvent::Changed
        }
        2 => {
            config.show_unreachable = !config.show_unreachable;
            SettingsEvent::Changed
        }
        3 => {
            config.show_link_comments = !config.show_link_comments;
            SettingsEvent::Changed
        }
        _ => SettingsEvent::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;
    use dlgtree::reachability::EvaluationOrder;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn order_cycles_both_ways() {
        let mut state = SettingsPanelState::default();
        let mut config = Config::default();
        assert_eq!(handle_key(key(KeyCode::Right), &mut state, &mut config), SettingsEvent::Changed);
        assert_eq!(config.evaluation_order, EvaluationOrder::Independent);
        handle_key(key(KeyCode::Left), &mut state, &mut config);
        assert_eq!(config.evaluation_order, EvaluationOrder::FirstMatch);
    }

    #[test]
    fn depth_never_goes_negative() {
        let mut state = SettingsPanelState { selected_row: 1 };
        let mut config = Config {
            expand_depth: 0,
            ..Config::default()
        };
        handle_key(key(KeyCode::Left), &mut state, &mut config);
        assert_eq!(config.expand_depth, 0);
        handle_key(key(KeyCode::Right), &mut state, &mut config);
        assert_eq!(config.expand_depth, 1);
    }

    #[test]
    fn selection_is_clamped() {
        let mut state = SettingsPanelState::default();
        let mut config = Config::default();
        for _ in 0..10 {
            handle_key(key(KeyCode::Down), &mut state, &mut config);
        }
        assert_eq!(state.selected_row, SETTINGS_ROW_COUNT - 1);
        assert_eq!(handle_key(key(KeyCode::Esc), &mut state, &mut config), SettingsEvent::Close);
    }
}
