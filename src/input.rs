use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum InputMode {
    Table,
    Detail,
    Fatal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    Back,
    Down,
    Up,
    PageDown,
    PageUp,
    Top,
    Bottom,
    ShowYaml,
    ShowDescribe,
    ToggleHelp,
}

pub fn map_key(mode: InputMode, key: KeyEvent) -> Option<Action> {
    if is_quit(key) {
        return Some(Action::Quit);
    }
    match mode {
        InputMode::Table => map_table_key(key).or_else(|| map_movement_key(key)),
        InputMode::Detail => map_movement_key(key),
        InputMode::Fatal => None,
    }
}

fn is_quit(key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Char('c') => key.modifiers.contains(KeyModifiers::CONTROL),
        KeyCode::Char('q') => key.modifiers.is_empty(),
        _ => false,
    }
}

fn map_table_key(key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Enter => Some(Action::ShowYaml),
        KeyCode::Char('y') if key.modifiers.is_empty() => Some(Action::ShowYaml),
        KeyCode::Char('d') if key.modifiers.is_empty() => Some(Action::ShowDescribe),
        _ => None,
    }
}

fn map_movement_key(key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Char('j') if key.modifiers.is_empty() => Some(Action::Down),
        KeyCode::Down => Some(Action::Down),
        KeyCode::Char('k') if key.modifiers.is_empty() => Some(Action::Up),
        KeyCode::Up => Some(Action::Up),
        KeyCode::Char('g') if key.modifiers.is_empty() => Some(Action::Top),
        KeyCode::Home => Some(Action::Top),
        KeyCode::Char('G') => Some(Action::Bottom),
        KeyCode::End => Some(Action::Bottom),
        KeyCode::PageDown => Some(Action::PageDown),
        KeyCode::PageUp => Some(Action::PageUp),
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(Action::PageDown)
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(Action::PageUp),
        KeyCode::Char('h') | KeyCode::Char('?') => Some(Action::ToggleHelp),
        KeyCode::Esc => Some(Action::Back),
        _ => None,
    }
}
