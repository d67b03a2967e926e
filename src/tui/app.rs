use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::backend::CrosstermBackend;
use ratatui::{Frame, Terminal};
use tracing::info;

use dlgtree::graph::model::{DEFAULT_LANGUAGE, DialogGraph, ListId, LocString, NodeId, PtrId};
use dlgtree::parser::config::{self, Config};
use dlgtree::parser::dialog;
use dlgtree::projection::{ProjectionNode, StableKey, state};
use dlgtree::sync::Synchronizer;
use dlgtree::workspace;

use crate::commands::tree::{self, TreeRow};
use crate::tui::input::{self, Action, Direction};
use crate::tui::render::{self, ViewData};
use crate::tui::settings::{self, SettingsEvent, SettingsPanelState};

const HINTS: &str =
    "n add  m mark  L link  c condition  e text  d delete  E/C expand/collapse all  s settings";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingTextKind {
    Condition(PtrId),
    Text(NodeId),
}

#[derive(Debug, Clone)]
struct PendingText {
    title: String,
    buffer: String,
    cursor: usize,
    kind: PendingTextKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingConfirm {
    DeletePointer { parent: ListId, pointer: PtrId },
}

struct AppState {
    dialog_path: Option<PathBuf>,
    config_path: Option<PathBuf>,
    sync: Synchronizer,
    config: Config,
    scroll: usize,
    tree_view_rows: usize,
    marked: Option<NodeId>,
    show_help: bool,
    show_settings: bool,
    settings_state: SettingsPanelState,
    status_message: Option<String>,
    pending_text: Option<PendingText>,
    pending_confirm: Option<PendingConfirm>,
    dirty: bool,
    demo: bool,
}

impl AppState {
    fn load(path: Option<&Path>) -> Result<Self> {
        let (graph, config, dialog_path, config_path, message) = match path {
            None => (
                demo_graph()?,
                Config::default(),
                None,
                None,
                Some("demo mode: changes are in-memory only".to_string()),
            ),
            Some(path) => {
                let config = workspace::load_config_for(path)?;
                let (graph, outcome) = dialog::load(path)?;
                let message = (!outcome.is_empty()).then(|| {
                    format!(
                        "repaired on load: {} pruned, {} promoted, {} demoted",
                        outcome.pruned.len(),
                        outcome.promoted.len(),
                        outcome.demoted.len()
                    )
                });
                (
                    graph,
                    config,
                    Some(path.to_path_buf()),
                    Some(workspace::config_target_for(path)),
                    message,
                )
            }
        };

        let mut sync = workspace::build_synchronizer(&config);
        sync.on_graph_loaded(graph);
        let mut app = Self {
            demo: dialog_path.is_none(),
            dialog_path,
            config_path,
            sync,
            config,
            scroll: 0,
            tree_view_rows: 0,
            marked: None,
            show_help: false,
            show_settings: false,
            settings_state: SettingsPanelState::default(),
            status_message: message,
            pending_text: None,
            pending_confirm: None,
            dirty: false,
        };
        let first = state::visible_rows(app.sync.projection())
            .get(1)
            .map(|r| r.key())
            .unwrap_or(StableKey::Root);
        app.sync.select(first);
        Ok(app)
    }

    fn rows(&self) -> Vec<TreeRow> {
        tree::tree_rows(self.sync.graph(), self.sync.projection(), &self.config)
    }

    fn selected_key(&self) -> StableKey {
        state::selected(self.sync.projection()).unwrap_or(StableKey::Root)
    }

    fn selected_row(&self) -> Option<&ProjectionNode> {
        self.sync.projection().get(self.selected_key())
    }

    fn cursor_index(&self) -> Option<usize> {
        let key = self.selected_key();
        state::visible_rows(self.sync.projection())
            .iter()
            .position(|r| r.key() == key)
    }

    fn draw(&mut self, frame: &mut Frame) {
        self.tree_view_rows = render::tree_view_rows(frame.area());
        self.update_scroll_for_cursor();

        let rows = self.rows();
        let selected_label = self
            .selected_row()
            .map(|r| tree::row_label(self.sync.graph(), r))
            .unwrap_or_else(|| "-".to_string());
        let marked_label = self.marked.map(|id| id.to_string());
        let chart = self.sync.flowchart();
        let unreachable: usize = self.sync.unreachable_lists().values().map(|s| s.len()).sum();
        let summary = format!(
            "{} nodes  {} edges  {} unreachable  order: {}",
            self.sync.graph().node_count(),
            chart.links.len(),
            unreachable,
            self.sync.order()
        );
        let data = ViewData {
            rows: &rows,
            cursor: self.cursor_index(),
            scroll: self.scroll,
            details: render::build_details_lines(self.sync.graph(), self.selected_row()),
            selected_label: &selected_label,
            marked_label: marked_label.as_deref(),
            summary: &summary,
            hints: HINTS,
            message: self.status_message.as_deref(),
            show_help: self.show_help,
            demo: self.demo,
        };
        render::draw(frame, &data);

        if self.show_settings {
            settings::draw(frame, &self.settings_state, &self.config);
        }
        if let Some(prompt) = &self.pending_text {
            render::draw_text_prompt(frame, &prompt.title, &prompt.buffer, prompt.cursor);
        } else if let Some(confirm) = &self.pending_confirm {
            let PendingConfirm::DeletePointer { pointer, .. } = confirm;
            render::draw_confirm_prompt(
                frame,
                &format!("Delete pointer {}? Nodes left unreachable are removed.", pointer),
            );
        }
    }

    fn update_scroll_for_cursor(&mut self) {
        let Some(cursor) = self.cursor_index() else {
            return;
        };
        let height = self.tree_view_rows.max(1);
        if cursor < self.scroll {
            self.scroll = cursor;
        } else if cursor >= self.scroll + height {
            self.scroll = cursor + 1 - height;
        }
    }

    /// Returns `true` when the app should exit.
    fn handle_key(&mut self, key: KeyEvent) -> Result<bool> {
        self.status_message = None;

        if self.show_settings {
            let event = settings::handle_key(key, &mut self.settings_state, &mut self.config);
            match event {
                SettingsEvent::Changed => self.apply_config()?,
                SettingsEvent::Close => self.show_settings = false,
                SettingsEvent::None => {}
            }
            return Ok(false);
        }

        if self.pending_confirm.is_some() {
            self.handle_confirm_key(key);
            return Ok(false);
        }

        let in_text_mode = self.pending_text.is_some();
        let action = input::action_for_key(key, in_text_mode);
        if in_text_mode {
            self.handle_text_action(action);
            return Ok(false);
        }

        match action {
            Action::Quit => return Ok(true),
            Action::ToggleHelp => self.show_help = !self.show_help,
            Action::OpenSettings => self.show_settings = true,
            Action::Move(direction) => self.move_cursor(direction),
            Action::PageUp => self.move_by(-(self.tree_view_rows.max(1) as isize)),
            Action::PageDown => self.move_by(self.tree_view_rows.max(1) as isize),
            Action::Toggle => {
                self.sync.toggle(self.selected_key());
            }
            Action::ExpandAll => self.sync.expand_all(),
            Action::CollapseAll => {
                self.sync.collapse_all();
                if self.cursor_index().is_none() {
                    self.select_visible_ancestor();
                }
            }
            Action::AddChild => self.add_child(),
            Action::MarkLinkTarget => self.mark_link_target(),
            Action::AddLink => self.add_link(),
            Action::DeletePointer => self.start_delete(),
            Action::EditCondition => self.start_edit_condition(),
            Action::EditText => self.start_edit_text(),
            Action::Cancel => {
                self.show_help = false;
                self.marked = None;
            }
            Action::Noop | Action::SubmitText | Action::Backspace | Action::InputChar(_) => {}
        }
        Ok(false)
    }

    fn move_cursor(&mut self, direction: Direction) {
        match direction {
            Direction::Up => self.move_by(-1),
            Direction::Down => self.move_by(1),
            Direction::Left => {
                let key = self.selected_key();
                let tree = self.sync.projection();
                let Some(row) = tree.get(key) else {
                    return;
                };
                let collapse = row.is_expanded && row.has_children();
                let parent = tree.parent(row).map(ProjectionNode::key);
                if collapse {
                    self.sync.toggle(key);
                } else if let Some(parent) = parent {
                    self.sync.select(parent);
                }
            }
            Direction::Right => {
                let key = self.selected_key();
                let tree = self.sync.projection();
                let Some(row) = tree.get(key) else {
                    return;
                };
                if !row.has_children() {
                    return;
                }
                let first = row
                    .is_expanded
                    .then(|| tree.children(row).next().map(ProjectionNode::key))
                    .flatten();
                match first {
                    Some(first) => {
                        self.sync.select(first);
                    }
                    None => {
                        self.sync.toggle(key);
                    }
                }
            }
        }
    }

    fn move_by(&mut self, delta: isize) {
        let keys: Vec<StableKey> = state::visible_rows(self.sync.projection())
            .iter()
            .map(|r| r.key())
            .collect();
        let current = self.cursor_index().unwrap_or(0) as isize;
        let next = (current + delta).clamp(0, keys.len() as isize - 1);
        if let Some(key) = keys.get(next as usize) {
            self.sync.select(*key);
        }
    }

    /// Move the cursor to the deepest ancestor that is still on screen.
    fn select_visible_ancestor(&mut self) {
        let key = self.selected_key();
        let tree = self.sync.projection();
        let visible: Vec<StableKey> = state::visible_rows(tree)
            .iter()
            .map(|r| r.key())
            .collect();
        let mut chain = tree.ancestors(key);
        chain.push(key);
        let target = chain
            .into_iter()
            .rev()
            .find(|k| visible.contains(k))
            .unwrap_or(StableKey::Root);
        self.sync.select(target);
    }

    fn add_child(&mut self) {
        let Some(parent) = self.selected_row().map(|r| r.list()) else {
            return;
        };
        let Some(parent) = parent else {
            self.status_message = Some("links have no children here; add under the owning row".to_string());
            return;
        };
        match self.sync.add_child(parent, None) {
            Ok(ptr) => {
                self.dirty = true;
                if let Some(node) = self.sync.graph().pointer(ptr).map(|p| p.target()) {
                    self.open_text_prompt(
                        format!("Text for new {}", node),
                        String::new(),
                        PendingTextKind::Text(node),
                    );
                }
            }
            Err(err) => self.status_message = Some(format!("cannot add: {}", err)),
        }
    }

    fn mark_link_target(&mut self) {
        match self.selected_row().and_then(|r| r.node()) {
            Some(node) => {
                self.marked = Some(node);
                self.status_message = Some(format!("marked {}; select a parent and press L", node));
            }
            None => self.status_message = Some("the root cannot be linked to".to_string()),
        }
    }

    fn add_link(&mut self) {
        let Some(target) = self.marked else {
            self.status_message = Some("mark a link target with m first".to_string());
            return;
        };
        let Some(parent) = self.selected_row().and_then(|r| r.list()) else {
            self.status_message = Some("select an owning row to link from".to_string());
            return;
        };
        match self.sync.add_link(parent, target, None) {
            Ok(_) => {
                self.dirty = true;
                self.marked = None;
                self.status_message = Some(format!("linked {} under {}", target, parent));
            }
            Err(err) => self.status_message = Some(format!("cannot link: {}", err)),
        }
    }

    fn start_delete(&mut self) {
        let Some(pointer) = self.selected_row().and_then(|r| r.pointer()) else {
            self.status_message = Some("the root cannot be deleted".to_string());
            return;
        };
        let Some(parent) = self.sync.graph().pointer(pointer).map(|p| p.parent()) else {
            return;
        };
        self.pending_confirm = Some(PendingConfirm::DeletePointer { parent, pointer });
    }

    fn handle_confirm_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                if let Some(PendingConfirm::DeletePointer { parent, pointer }) =
                    self.pending_confirm.take()
                {
                    self.delete_pointer(parent, pointer);
                }
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc | KeyCode::Backspace => {
                self.pending_confirm = None;
            }
            _ => {}
        }
    }

    fn delete_pointer(&mut self, parent: ListId, pointer: PtrId) {
        match self.sync.remove_pointer(parent, pointer) {
            Ok(outcome) => {
                self.dirty = true;
                if self.marked.is_some_and(|m| !self.sync.graph().contains_node(m)) {
                    self.marked = None;
                }
                self.status_message = Some(format!(
                    "deleted {}: {} node(s) pruned, {} link(s) promoted",
                    pointer,
                    outcome.pruned.len(),
                    outcome.promoted.len()
                ));
            }
            Err(err) => self.status_message = Some(format!("cannot delete: {}", err)),
        }
    }

    fn start_edit_condition(&mut self) {
        let Some(ptr) = self.selected_row().and_then(|r| r.pointer()) else {
            self.status_message = Some("the root has no condition".to_string());
            return;
        };
        let current = self
            .sync
            .graph()
            .pointer(ptr)
            .and_then(|p| p.condition())
            .unwrap_or_default()
            .to_string();
        self.open_text_prompt(
            format!("Condition for {}", ptr),
            current,
            PendingTextKind::Condition(ptr),
        );
    }

    fn start_edit_text(&mut self) {
        let Some(node) = self.selected_row().and_then(|r| r.node()) else {
            self.status_message = Some("the root has no text".to_string());
            return;
        };
        let current = self
            .sync
            .graph()
            .node(node)
            .and_then(|n| n.text.get(DEFAULT_LANGUAGE))
            .unwrap_or_default()
            .to_string();
        self.open_text_prompt(format!("Text for {}", node), current, PendingTextKind::Text(node));
    }

    fn open_text_prompt(&mut self, title: String, buffer: String, kind: PendingTextKind) {
        let cursor = buffer.chars().count();
        self.pending_text = Some(PendingText {
            title,
            buffer,
            cursor,
            kind,
        });
    }

    fn handle_text_action(&mut self, action: Action) {
        match action {
            Action::Cancel => {
                self.pending_text = None;
                return;
            }
            Action::SubmitText => {
                if let Some(prompt) = self.pending_text.take() {
                    self.submit_text(prompt);
                }
                return;
            }
            _ => {}
        }
        let Some(prompt) = &mut self.pending_text else {
            return;
        };
        match action {
            Action::Backspace => {
                if prompt.cursor > 0 {
                    let at = render::byte_index_for_cursor(&prompt.buffer, prompt.cursor - 1);
                    prompt.buffer.remove(at);
                    prompt.cursor -= 1;
                }
            }
            Action::Move(Direction::Left) => prompt.cursor = prompt.cursor.saturating_sub(1),
            Action::Move(Direction::Right) => {
                prompt.cursor = (prompt.cursor + 1).min(prompt.buffer.chars().count());
            }
            Action::InputChar(c) => {
                let at = render::byte_index_for_cursor(&prompt.buffer, prompt.cursor);
                prompt.buffer.insert(at, c);
                prompt.cursor += 1;
            }
            _ => {}
        }
    }

    fn submit_text(&mut self, prompt: PendingText) {
        let value = prompt.buffer.trim().to_string();
        match prompt.kind {
            PendingTextKind::Condition(ptr) => {
                let script = (!value.is_empty()).then_some(value);
                match self.sync.set_condition(ptr, script) {
                    Ok(hidden) => {
                        self.dirty = true;
                        self.status_message =
                            Some(format!("{} unreachable sibling(s) in this list", hidden.len()));
                    }
                    Err(err) => self.status_message = Some(format!("cannot set condition: {}", err)),
                }
            }
            PendingTextKind::Text(node) => {
                let Some(dialog_node) = self.sync.graph_mut().node_mut(node) else {
                    return;
                };
                dialog_node.text.set(DEFAULT_LANGUAGE, value);
                self.dirty = true;
                let owner = self.sync.graph().owner(node);
                let list = owner
                    .and_then(|p| self.sync.graph().pointer(p))
                    .map(|p| p.parent())
                    .unwrap_or(ListId::Root);
                self.sync.on_graph_mutated(list);
            }
        }
    }

    fn apply_config(&mut self) -> Result<()> {
        self.sync.set_classifier(self.config.classifier());
        self.sync.set_order(self.config.evaluation_order);
        self.sync.set_expand_depth(self.config.expand_depth);
        self.persist_config()
    }

    fn persist_config(&self) -> Result<()> {
        if self.demo {
            return Ok(());
        }
        if let Some(path) = &self.config_path {
            fs::write(path, config::serialize(&self.config))?;
        }
        Ok(())
    }

    fn persist_graph(&self) -> Result<()> {
        if self.demo || !self.dirty {
            return Ok(());
        }
        if let Some(path) = &self.dialog_path {
            dialog::save(path, self.sync.graph())?;
            info!(path = %path.display(), "saved dialogue");
        }
        Ok(())
    }
}

/// Open the browser on `path`, or on the built-in sample when `None`.
pub fn run(path: Option<&Path>) -> Result<()> {
    let mut app = AppState::load(path)?;

    let mut stdout = io::stdout();
    enable_raw_mode()?;
    execute!(stdout, EnterAlternateScreen)?;
    let _guard = TerminalGuard;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    loop {
        terminal.draw(|f| app.draw(f))?;
        if !event::poll(Duration::from_millis(200))? {
            continue;
        }
        if let Event::Key(key) = event::read()? {
            if matches!(key.kind, KeyEventKind::Release | KeyEventKind::Repeat) {
                continue;
            }
            if app.handle_key(key)? {
                break;
            }
        }
    }

    app.persist_graph()?;
    Ok(())
}

struct TerminalGuard;

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let mut stdout = io::stdout();
        let _ = execute!(stdout, LeaveAlternateScreen);
    }
}

/// A guard's greeting: three replies, a quest branch and a link back into
/// the quest line.
fn demo_graph() -> Result<DialogGraph> {
    let mut g = DialogGraph::new();
    let hello = demo_line(&mut g, ListId::Root, "Guard", "Hello, traveler!")?;
    let greet = demo_line(&mut g, ListId::Node(hello), "", "Greetings.")?;
    let rude = demo_line(&mut g, ListId::Node(hello), "", "What do you want?")?;
    let leave = demo_line(&mut g, ListId::Node(hello), "", "[Leave]")?;
    let quest = demo_line(&mut g, ListId::Node(greet), "Guard", "I have a quest for you.")?;
    demo_line(&mut g, ListId::Node(rude), "Guard", "No need to be rude!")?;
    let more = demo_line(&mut g, ListId::Node(quest), "", "Tell me more.")?;
    demo_line(&mut g, ListId::Node(quest), "", "Not interested.")?;
    let cave = demo_line(&mut g, ListId::Node(more), "Merchant", "There's a cave nearby...")?;
    let accept = demo_line(&mut g, ListId::Node(cave), "", "I'll look into it.")?;

    if let Some(node) = g.node_mut(leave) {
        node.action = Some("nw_walk_wp".to_string());
    }
    if let Some(node) = g.node_mut(quest) {
        node.action = Some("sc_start_quest".to_string());
    }
    if let Some(ptr) = g.node(quest).and_then(|n| n.pointers().first().copied()) {
        g.set_condition(ptr, Some("gc_check_skill".to_string()))?;
    }
    let link = g.add_link(ListId::Node(accept), quest, None)?;
    g.set_condition(link, Some("gc_has_item".to_string()))?;
    g.set_link_comment(link, "Quest Accepted")?;
    Ok(g)
}

fn demo_line(g: &mut DialogGraph, parent: ListId, speaker: &str, text: &str) -> Result<NodeId> {
    let ptr = g.add_child(parent, None)?;
    let id = g
        .pointer(ptr)
        .map(|p| p.target())
        .ok_or_else(|| anyhow::anyhow!("pointer {} vanished", ptr))?;
    if let Some(node) = g.node_mut(id) {
        node.speaker = speaker.to_string();
        node.text = LocString::plain(text);
    }
    Ok(id)
}
