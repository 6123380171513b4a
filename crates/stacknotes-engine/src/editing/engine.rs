//! The rich-text engine boundary.
//!
//! Everything above this module (toolbar, list toggling, region bookkeeping)
//! talks to an editing region only through [`RichTextEngine`] and the
//! read-only [`EditorState`] it hands out inside transactions.

use serde::{Deserialize, Serialize};

/// List flavour of a top-level list block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListType {
    Bullet,
    Number,
    Check,
}

/// Classification of a top-level block, reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Paragraph,
    List { list_type: ListType },
}

impl BlockKind {
    pub fn list_type(self) -> Option<ListType> {
        match self {
            BlockKind::Paragraph => None,
            BlockKind::List { list_type } => Some(list_type),
        }
    }
}

/// A position in a document.
///
/// `line` is the list item index inside a list block and always 0 for a
/// paragraph. `offset` counts chars, not bytes. The derived ordering is
/// document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Point {
    pub block: usize,
    pub line: usize,
    pub offset: usize,
}

impl Point {
    pub fn new(block: usize, line: usize, offset: usize) -> Self {
        Self {
            block,
            line,
            offset,
        }
    }
}

/// A range selection; collapsed when anchor and focus coincide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeSelection {
    pub anchor: Point,
    pub focus: Point,
}

impl RangeSelection {
    pub fn new(anchor: Point, focus: Point) -> Self {
        Self { anchor, focus }
    }

    pub fn caret(at: Point) -> Self {
        Self::new(at, at)
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    pub fn start(&self) -> Point {
        self.anchor.min(self.focus)
    }

    pub fn end(&self) -> Point {
        self.anchor.max(self.focus)
    }
}

/// Identifies one list item: the list block and the item index inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListItemKey {
    pub block: usize,
    pub line: usize,
}

/// Structural mutations queued through [`RichTextEngine::dispatch_command`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListCommand {
    /// Turn the selected blocks into one list of the given type
    InsertList(ListType),
    /// Turn every list touched by the selection back into paragraphs
    RemoveList,
}

/// Handle returned by [`RichTextEngine::register_update_listener`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);

/// Read (and, inside an update transaction, write) access to one document.
pub trait EditorState {
    /// The current range selection, if the region holds one
    fn selection(&self) -> Option<&RangeSelection>;

    /// Capability query for a top-level block
    fn block_kind(&self, block: usize) -> Option<BlockKind>;

    /// Every list item touched by the selection, in document order
    fn selected_list_items(&self) -> Vec<ListItemKey>;

    fn is_checked(&self, item: ListItemKey) -> Option<bool>;

    /// Returns whether the flag actually changed
    fn set_checked(&mut self, item: ListItemKey, checked: bool) -> bool;

    /// True when the document holds no authored text
    fn is_blank(&self) -> bool;
}

/// One editing region's engine instance.
///
/// `read` and `update` are scoped transactions: `read` sees the latest
/// committed state, `update` commits atomically and then notifies every
/// update listener before returning.
pub trait RichTextEngine {
    type State: EditorState;

    fn read<R>(&self, f: impl FnOnce(&Self::State) -> R) -> R;

    fn update<R>(&self, f: impl FnOnce(&mut Self::State) -> R) -> R;

    fn register_update_listener(
        &self,
        listener: impl FnMut(&Self::State) + 'static,
    ) -> ListenerId;

    fn unregister_update_listener(&self, id: ListenerId);

    /// Returns whether the command changed the document
    fn dispatch_command(&self, command: ListCommand) -> bool;
}
