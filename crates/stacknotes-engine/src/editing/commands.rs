use crate::editing::RangeSelection;

/// Caret movement directions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
    LineStart,
    LineEnd,
}

/// Text-level edit commands understood by [`crate::Document::apply`].
///
/// Structural list changes go through [`crate::ListCommand`] instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cmd {
    /// Replace the selection with `text`; each newline splits the line
    InsertText { text: String },
    /// Enter: split the current line, or leave the list on an empty item
    SplitLine,
    /// Backspace
    DeleteBackward,
    /// Move the focus; `extend` keeps the anchor where it is
    Move { direction: Direction, extend: bool },
    Select(RangeSelection),
    SelectAll,
}

impl Cmd {
    pub fn insert(text: impl Into<String>) -> Self {
        Cmd::InsertText { text: text.into() }
    }

    pub fn move_caret(direction: Direction) -> Self {
        Cmd::Move {
            direction,
            extend: false,
        }
    }

    pub fn extend(direction: Direction) -> Self {
        Cmd::Move {
            direction,
            extend: true,
        }
    }
}
