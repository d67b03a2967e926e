use crossterm::event::{KeyCode, KeyEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Move(Direction),
    PageUp,
    PageDown,
    Toggle,
    ExpandAll,
    CollapseAll,
    AddChild,
    MarkLinkTarget,
    AddLink,
    DeletePointer,
    EditCondition,
    EditText,
    OpenSettings,
    ToggleHelp,
    Quit,
    SubmitText,
    Cancel,
    Backspace,
    InputChar(char),
    Noop,
}

pub fn action_for_key(key: KeyEvent, text_mode: bool) -> Action {
    if text_mode {
        return match key.code {
            KeyCode::Enter => Action::SubmitText,
            KeyCode::Esc => Action::Cancel,
            KeyCode::Backspace => Action::Backspace,
            KeyCode::Left => Action::Move(Direction::Left),
            KeyCode::Right => Action::Move(Direction::Right),
            KeyCode::Char(c) => Action::InputChar(c),
            _ => Action::Noop,
        };
    }

    match key.code {
        KeyCode::Up | KeyCode::Char('k') => Action::Move(Direction::Up),
        KeyCode::Down | KeyCode::Char('j') => Action::Move(Direction::Down),
        KeyCode::Left | KeyCode::Char('h') => Action::Move(Direction::Left),
        KeyCode::Right | KeyCode::Char('l') => Action::Move(Direction::Right),
        KeyCode::PageUp => Action::PageUp,
        KeyCode::PageDown => Action::PageDown,
        KeyCode::Enter | KeyCode::Char(' ') => Action::Toggle,
        KeyCode::Esc | KeyCode::Backspace => Action::Cancel,
        KeyCode::Char('E') => Action::ExpandAll,
        KeyCode::Char('C') => Action::CollapseAll,
        KeyCode::Char('n') => Action::AddChild,
        KeyCode::Char('m') => Action::MarkLinkTarget,
        KeyCode::Char('L') => Action::AddLink,
        KeyCode::Char('d') => Action::DeletePointer,
        KeyCode::Char('c') => Action::EditCondition,
        KeyCode::Char('e') => Action::EditText,
        KeyCode::Char('s') => Action::OpenSettings,
        KeyCode::Char('?') => Action::ToggleHelp,
        KeyCode::Char('q') => Action::Quit,
        _ => Action::Noop,
    }
}
