//! Key names to editor actions.
//!
//! Keys are written the way the keybinding files spell them: `Tab`,
//! `Shift+Tab`, `Ctrl+z`, `Up`, or a single character.

use midiseq_core::action::EditorAction;
use midiseq_core::context::NoteAttribute;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCode {
    Up,
    Down,
    Left,
    Right,
    Tab,
    Insert,
    Delete,
    Backspace,
    PageUp,
    PageDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPattern {
    Char(char),
    Ctrl(char),
    Key(KeyCode),
    ShiftKey(KeyCode),
    CtrlKey(KeyCode),
}

pub fn parse_key(s: &str) -> Option<KeyPattern> {
    if let Some(rest) = s.strip_prefix("Ctrl+") {
        let mut chars = rest.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Some(KeyPattern::Ctrl(c.to_ascii_lowercase())),
            _ => parse_named_key(rest).map(KeyPattern::CtrlKey),
        }
    } else if let Some(rest) = s.strip_prefix("Shift+") {
        parse_named_key(rest).map(KeyPattern::ShiftKey)
    } else {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Some(KeyPattern::Char(c)),
            _ => parse_named_key(s).map(KeyPattern::Key),
        }
    }
}

fn parse_named_key(s: &str) -> Option<KeyCode> {
    match s {
        "Up" => Some(KeyCode::Up),
        "Down" => Some(KeyCode::Down),
        "Left" => Some(KeyCode::Left),
        "Right" => Some(KeyCode::Right),
        "Tab" => Some(KeyCode::Tab),
        "Insert" => Some(KeyCode::Insert),
        "Delete" => Some(KeyCode::Delete),
        "Backspace" => Some(KeyCode::Backspace),
        "PageUp" => Some(KeyCode::PageUp),
        "PageDown" => Some(KeyCode::PageDown),
        _ => None,
    }
}

/// Cursor moves in sixteenths; Ctrl moves a whole quarter.
const CURSOR_STEP_COARSE: i32 = 4;

pub fn action_for_key(key: KeyPattern) -> Option<EditorAction> {
    use EditorAction::*;
    let action = match key {
        KeyPattern::Key(KeyCode::Tab) => SelectNextNote,
        KeyPattern::ShiftKey(KeyCode::Tab) => SelectPrevNote,

        KeyPattern::Key(KeyCode::Up) | KeyPattern::Char('+') => ChangeSelectedAttribute(1),
        KeyPattern::Key(KeyCode::Down) | KeyPattern::Char('-') => ChangeSelectedAttribute(-1),
        KeyPattern::CtrlKey(KeyCode::Up) => ChangeSelectedAttribute(12),
        KeyPattern::CtrlKey(KeyCode::Down) => ChangeSelectedAttribute(-12),
        KeyPattern::Char(']') => ChangePitch(1),
        KeyPattern::Char('[') => ChangePitch(-1),

        KeyPattern::Key(KeyCode::Right) => AdvanceCursor(1),
        KeyPattern::Key(KeyCode::Left) => AdvanceCursor(-1),
        KeyPattern::CtrlKey(KeyCode::Right) => AdvanceCursor(CURSOR_STEP_COARSE),
        KeyPattern::CtrlKey(KeyCode::Left) => AdvanceCursor(-CURSOR_STEP_COARSE),
        KeyPattern::ShiftKey(KeyCode::Up) | KeyPattern::Key(KeyCode::PageUp) => {
            ChangeCursorPitch(1)
        }
        KeyPattern::ShiftKey(KeyCode::Down) | KeyPattern::Key(KeyCode::PageDown) => {
            ChangeCursorPitch(-1)
        }

        KeyPattern::Key(KeyCode::Insert) => InsertNote,
        KeyPattern::Key(KeyCode::Delete) | KeyPattern::Key(KeyCode::Backspace) => DeleteNote,

        KeyPattern::Char('p') => SetNoteAttribute(NoteAttribute::Pitch),
        KeyPattern::Char('s') => SetNoteAttribute(NoteAttribute::StartTime),
        KeyPattern::Char('d') => SetNoteAttribute(NoteAttribute::Duration),

        KeyPattern::Ctrl('z') => Undo,
        KeyPattern::Ctrl('y') => Redo,
        _ => return None,
    };
    Some(action)
}
