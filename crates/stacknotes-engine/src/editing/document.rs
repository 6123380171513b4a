use serde::{Deserialize, Serialize};

use crate::editing::{
    BlockKind, Cmd, Direction, EditorState, ListCommand, ListItemKey, ListType, Point,
    RangeSelection,
};

/// One item of a list block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListItem {
    pub text: String,
    /// Only meaningful inside check lists
    #[serde(default)]
    pub checked: bool,
}

impl ListItem {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            checked: false,
        }
    }

    pub fn checked(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            checked: true,
        }
    }
}

/// Top-level block of a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Block {
    Paragraph {
        text: String,
    },
    /// Never holds zero items
    List {
        list_type: ListType,
        items: Vec<ListItem>,
    },
}

impl Block {
    pub fn paragraph(text: impl Into<String>) -> Self {
        Block::Paragraph { text: text.into() }
    }

    pub fn list(list_type: ListType, items: Vec<ListItem>) -> Self {
        Block::List { list_type, items }
    }

    pub fn kind(&self) -> BlockKind {
        match self {
            Block::Paragraph { .. } => BlockKind::Paragraph,
            Block::List { list_type, .. } => BlockKind::List {
                list_type: *list_type,
            },
        }
    }

    pub fn line_count(&self) -> usize {
        match self {
            Block::Paragraph { .. } => 1,
            Block::List { items, .. } => items.len(),
        }
    }

    pub fn line_text(&self, line: usize) -> Option<&str> {
        match self {
            Block::Paragraph { text } if line == 0 => Some(text),
            Block::Paragraph { .. } => None,
            Block::List { items, .. } => items.get(line).map(|item| item.text.as_str()),
        }
    }

    fn line_text_mut(&mut self, line: usize) -> Option<&mut String> {
        match self {
            Block::Paragraph { text } if line == 0 => Some(text),
            Block::Paragraph { .. } => None,
            Block::List { items, .. } => items.get_mut(line).map(|item| &mut item.text),
        }
    }
}

/// A rendered line: list marker plus the line's text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayLine {
    pub block: usize,
    pub line: usize,
    pub marker: String,
    pub text: String,
}

/// The document model behind [`crate::NoteEditor`].
///
/// A document always holds at least one block, and list blocks always hold at
/// least one item. Every edit leaves the selection pointing at valid
/// positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    blocks: Vec<Block>,
    selection: Option<RangeSelection>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// A blank document: one empty paragraph and no selection
    pub fn new() -> Self {
        Self {
            blocks: vec![Block::paragraph("")],
            selection: None,
        }
    }

    pub fn from_blocks(blocks: Vec<Block>) -> Self {
        let mut blocks: Vec<Block> = blocks
            .into_iter()
            .filter(|block| block.line_count() > 0)
            .collect();
        if blocks.is_empty() {
            blocks.push(Block::paragraph(""));
        }
        Self {
            blocks,
            selection: None,
        }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Plain text, one line per paragraph or list item
    pub fn text(&self) -> String {
        self.line_addresses()
            .filter_map(|(block, line)| self.line_text(block, line))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn display_lines(&self) -> Vec<DisplayLine> {
        let mut lines = Vec::new();
        for (index, block) in self.blocks.iter().enumerate() {
            match block {
                Block::Paragraph { text } => lines.push(DisplayLine {
                    block: index,
                    line: 0,
                    marker: String::new(),
                    text: text.clone(),
                }),
                Block::List { list_type, items } => {
                    for (line, item) in items.iter().enumerate() {
                        let marker = match list_type {
                            ListType::Bullet => "• ".to_string(),
                            ListType::Number => format!("{}. ", line + 1),
                            ListType::Check if item.checked => "[x] ".to_string(),
                            ListType::Check => "[ ] ".to_string(),
                        };
                        lines.push(DisplayLine {
                            block: index,
                            line,
                            marker,
                            text: item.text.clone(),
                        });
                    }
                }
            }
        }
        lines
    }

    /// Markers and text joined into one string, mostly for tests and logs
    pub fn outline(&self) -> String {
        self.display_lines()
            .iter()
            .map(|line| format!("{}{}", line.marker, line.text))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn line_text(&self, block: usize, line: usize) -> Option<&str> {
        self.blocks.get(block).and_then(|b| b.line_text(line))
    }

    pub fn set_selection(&mut self, selection: Option<RangeSelection>) {
        self.selection =
            selection.map(|s| RangeSelection::new(self.clamp(s.anchor), self.clamp(s.focus)));
    }

    /// Put a caret at the end of the document unless a selection exists
    pub fn ensure_selection(&mut self) {
        if self.selection.is_none() {
            self.selection = Some(RangeSelection::caret(self.last_point()));
        }
    }

    /// Apply a text command; returns whether anything changed
    pub fn apply(&mut self, cmd: &Cmd) -> bool {
        let before = self.clone();
        match cmd {
            Cmd::InsertText { text } => self.insert_text(text),
            Cmd::SplitLine => self.split_line(),
            Cmd::DeleteBackward => self.delete_backward(),
            Cmd::Move { direction, extend } => self.move_focus(*direction, *extend),
            Cmd::Select(selection) => self.set_selection(Some(*selection)),
            Cmd::SelectAll => {
                self.selection = Some(RangeSelection::new(Point::default(), self.last_point()))
            }
        }
        *self != before
    }

    /// Apply a structural list command; returns whether anything changed
    pub fn apply_list_command(&mut self, command: ListCommand) -> bool {
        let before = self.clone();
        match command {
            ListCommand::InsertList(list_type) => self.insert_list(list_type),
            ListCommand::RemoveList => self.remove_list(),
        }
        *self != before
    }

    fn insert_text(&mut self, text: &str) {
        let Some(selection) = self.selection else {
            return;
        };
        let mut caret = self.delete_range(selection.start(), selection.end());
        for (index, piece) in text.split('\n').enumerate() {
            if index > 0 {
                caret = self.split_at(caret);
            }
            if let Some(line) = self.line_text_mut(caret.block, caret.line) {
                let at = byte_index(line, caret.offset);
                line.insert_str(at, piece);
                caret.offset += piece.chars().count();
            }
        }
        self.selection = Some(RangeSelection::caret(caret));
    }

    fn split_line(&mut self) {
        let Some(selection) = self.selection else {
            return;
        };
        let at = self.delete_range(selection.start(), selection.end());
        // Enter on an empty item leaves the list
        let caret = if let Some(Block::List { items, .. }) = self.blocks.get(at.block)
            && items[at.line].text.is_empty()
        {
            self.lift_item(at.block, at.line)
        } else {
            self.split_at(at)
        };
        self.selection = Some(RangeSelection::caret(caret));
    }

    fn delete_backward(&mut self) {
        let Some(selection) = self.selection else {
            return;
        };
        if !selection.is_collapsed() {
            let caret = self.delete_range(selection.start(), selection.end());
            self.selection = Some(RangeSelection::caret(caret));
            return;
        }

        let at = selection.focus;
        let caret = if at.offset > 0 {
            let start = Point {
                offset: at.offset - 1,
                ..at
            };
            self.delete_range(start, at)
        } else if at.line == 0 && matches!(self.blocks.get(at.block), Some(Block::List { .. })) {
            // Backspace at the start of a list turns its first item into a paragraph
            self.lift_item(at.block, 0)
        } else if let Some((block, line)) = self.prev_line(at.block, at.line) {
            let start = Point::new(block, line, self.line_len(block, line));
            self.delete_range(start, at)
        } else {
            at
        };
        self.selection = Some(RangeSelection::caret(caret));
    }

    fn move_focus(&mut self, direction: Direction, extend: bool) {
        let Some(selection) = self.selection else {
            return;
        };
        let focus = selection.focus;
        let len = self.line_len(focus.block, focus.line);
        let target = match direction {
            Direction::Left if focus.offset > 0 => Point {
                offset: focus.offset - 1,
                ..focus
            },
            Direction::Left => self
                .prev_line(focus.block, focus.line)
                .map(|(block, line)| Point::new(block, line, self.line_len(block, line)))
                .unwrap_or(focus),
            Direction::Right if focus.offset < len => Point {
                offset: focus.offset + 1,
                ..focus
            },
            Direction::Right => self
                .next_line(focus.block, focus.line)
                .map(|(block, line)| Point::new(block, line, 0))
                .unwrap_or(focus),
            Direction::Up => self
                .prev_line(focus.block, focus.line)
                .map(|(block, line)| {
                    Point::new(block, line, focus.offset.min(self.line_len(block, line)))
                })
                .unwrap_or(Point { offset: 0, ..focus }),
            Direction::Down => self
                .next_line(focus.block, focus.line)
                .map(|(block, line)| {
                    Point::new(block, line, focus.offset.min(self.line_len(block, line)))
                })
                .unwrap_or(Point {
                    offset: len,
                    ..focus
                }),
            Direction::LineStart => Point { offset: 0, ..focus },
            Direction::LineEnd => Point {
                offset: len,
                ..focus
            },
        };
        let anchor = if extend { selection.anchor } else { target };
        self.selection = Some(RangeSelection::new(anchor, target));
    }

    fn insert_list(&mut self, list_type: ListType) {
        let Some((first, last)) = self.selected_block_range() else {
            return;
        };

        // index of each replaced block's first line inside the new list
        let mut starts = Vec::with_capacity(last - first + 1);
        let mut items = Vec::new();
        for block in &self.blocks[first..=last] {
            starts.push(items.len());
            match block {
                Block::Paragraph { text } => items.push(ListItem::new(text.clone())),
                Block::List {
                    list_type: from,
                    items: existing,
                } => {
                    let keep_checks = *from == ListType::Check && list_type == ListType::Check;
                    items.extend(existing.iter().map(|item| ListItem {
                        text: item.text.clone(),
                        checked: keep_checks && item.checked,
                    }));
                }
            }
        }
        self.blocks
            .splice(first..=last, [Block::list(list_type, items)]);

        self.remap_selection(|p| {
            if p.block < first {
                p
            } else if p.block > last {
                Point {
                    block: p.block - (last - first),
                    ..p
                }
            } else {
                Point::new(first, starts[p.block - first] + p.line, p.offset)
            }
        });
    }

    fn remove_list(&mut self) {
        let Some((first, last)) = self.selected_block_range() else {
            return;
        };

        let mut starts = Vec::with_capacity(last - first + 1);
        let mut replacement = Vec::new();
        for block in &self.blocks[first..=last] {
            starts.push(first + replacement.len());
            match block {
                Block::Paragraph { .. } => replacement.push(block.clone()),
                Block::List { items, .. } => replacement
                    .extend(items.iter().map(|item| Block::paragraph(item.text.clone()))),
            }
        }
        let grown = replacement.len() - (last - first + 1);
        self.blocks.splice(first..=last, replacement);

        self.remap_selection(|p| {
            if p.block < first {
                p
            } else if p.block > last {
                Point {
                    block: p.block + grown,
                    ..p
                }
            } else {
                Point::new(starts[p.block - first] + p.line, 0, p.offset)
            }
        });
    }

    /// Delete `[start, end)` and return the caret position left behind.
    fn delete_range(&mut self, start: Point, end: Point) -> Point {
        if start >= end {
            return start;
        }

        let tail: String = self
            .line_text(end.block, end.line)
            .map(|text| text.chars().skip(end.offset).collect())
            .unwrap_or_default();

        if start.block == end.block {
            if let Block::List { items, .. } = &mut self.blocks[start.block]
                && end.line > start.line
            {
                items.drain(start.line + 1..=end.line);
            }
        } else {
            let end_block_emptied = match &mut self.blocks[end.block] {
                Block::Paragraph { .. } => true,
                Block::List { items, .. } => {
                    items.drain(..=end.line);
                    items.is_empty()
                }
            };
            let upper = if end_block_emptied {
                end.block + 1
            } else {
                end.block
            };
            self.blocks.drain(start.block + 1..upper);
            if let Block::List { items, .. } = &mut self.blocks[start.block] {
                items.truncate(start.line + 1);
            }
        }

        if let Some(text) = self.line_text_mut(start.block, start.line) {
            let at = byte_index(text, start.offset);
            text.truncate(at);
            text.push_str(&tail);
        }
        start
    }

    /// Split the line at `at`; the new caret sits at the start of the new line.
    fn split_at(&mut self, at: Point) -> Point {
        match &mut self.blocks[at.block] {
            Block::Paragraph { text } => {
                let rest = text.split_off(byte_index(text, at.offset));
                self.blocks.insert(at.block + 1, Block::paragraph(rest));
                Point::new(at.block + 1, 0, 0)
            }
            Block::List { items, .. } => {
                let item = &mut items[at.line];
                let rest = item.text.split_off(byte_index(&item.text, at.offset));
                items.insert(at.line + 1, ListItem::new(rest));
                Point::new(at.block, at.line + 1, 0)
            }
        }
    }

    /// Turn one list item into a paragraph, splitting its list around it.
    fn lift_item(&mut self, block: usize, line: usize) -> Point {
        let Some(Block::List { list_type, items }) = self.blocks.get_mut(block) else {
            return Point::new(block, line, 0);
        };
        let list_type = *list_type;
        let after = items.split_off(line + 1);
        let lifted = items.remove(line);
        let before = std::mem::take(items);

        let mut replacement = Vec::with_capacity(3);
        if !before.is_empty() {
            replacement.push(Block::list(list_type, before));
        }
        let paragraph = block + replacement.len();
        replacement.push(Block::paragraph(lifted.text));
        if !after.is_empty() {
            replacement.push(Block::list(list_type, after));
        }
        self.blocks.splice(block..=block, replacement);
        Point::new(paragraph, 0, 0)
    }

    fn selected_block_range(&self) -> Option<(usize, usize)> {
        self.selection
            .map(|selection| (selection.start().block, selection.end().block))
    }

    fn remap_selection(&mut self, remap: impl Fn(Point) -> Point) {
        if let Some(selection) = self.selection {
            let remapped = RangeSelection::new(remap(selection.anchor), remap(selection.focus));
            self.set_selection(Some(remapped));
        }
    }

    fn line_text_mut(&mut self, block: usize, line: usize) -> Option<&mut String> {
        self.blocks.get_mut(block).and_then(|b| b.line_text_mut(line))
    }

    fn line_len(&self, block: usize, line: usize) -> usize {
        self.line_text(block, line)
            .map(|text| text.chars().count())
            .unwrap_or(0)
    }

    fn line_addresses(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.blocks
            .iter()
            .enumerate()
            .flat_map(|(block, b)| (0..b.line_count()).map(move |line| (block, line)))
    }

    fn prev_line(&self, block: usize, line: usize) -> Option<(usize, usize)> {
        if line > 0 {
            Some((block, line - 1))
        } else if block > 0 {
            Some((block - 1, self.blocks[block - 1].line_count() - 1))
        } else {
            None
        }
    }

    fn next_line(&self, block: usize, line: usize) -> Option<(usize, usize)> {
        if line + 1 < self.blocks.get(block)?.line_count() {
            Some((block, line + 1))
        } else if block + 1 < self.blocks.len() {
            Some((block + 1, 0))
        } else {
            None
        }
    }

    fn last_point(&self) -> Point {
        let block = self.blocks.len() - 1;
        let line = self.blocks[block].line_count() - 1;
        Point::new(block, line, self.line_len(block, line))
    }

    fn clamp(&self, point: Point) -> Point {
        if point.block >= self.blocks.len() {
            return self.last_point();
        }
        let line = point.line.min(self.blocks[point.block].line_count() - 1);
        let offset = point.offset.min(self.line_len(point.block, line));
        Point::new(point.block, line, offset)
    }
}

impl EditorState for Document {
    fn selection(&self) -> Option<&RangeSelection> {
        self.selection.as_ref()
    }

    fn block_kind(&self, block: usize) -> Option<BlockKind> {
        self.blocks.get(block).map(Block::kind)
    }

    fn selected_list_items(&self) -> Vec<ListItemKey> {
        let Some(selection) = self.selection else {
            return Vec::new();
        };
        let (start, end) = (selection.start(), selection.end());

        let mut keys = Vec::new();
        for block in start.block..=end.block {
            if let Some(Block::List { items, .. }) = self.blocks.get(block) {
                let from = if block == start.block { start.line } else { 0 };
                let to = if block == end.block {
                    end.line.min(items.len() - 1)
                } else {
                    items.len() - 1
                };
                keys.extend((from..=to).map(|line| ListItemKey { block, line }));
            }
        }
        keys
    }

    fn is_checked(&self, item: ListItemKey) -> Option<bool> {
        match self.blocks.get(item.block)? {
            Block::List { items, .. } => items.get(item.line).map(|i| i.checked),
            Block::Paragraph { .. } => None,
        }
    }

    fn set_checked(&mut self, item: ListItemKey, checked: bool) -> bool {
        if let Some(Block::List { items, .. }) = self.blocks.get_mut(item.block)
            && let Some(list_item) = items.get_mut(item.line)
            && list_item.checked != checked
        {
            list_item.checked = checked;
            return true;
        }
        false
    }

    fn is_blank(&self) -> bool {
        self.line_addresses()
            .filter_map(|(block, line)| self.line_text(block, line))
            .all(|text| text.trim().is_empty())
    }
}

fn byte_index(text: &str, char_offset: usize) -> usize {
    text.char_indices()
        .nth(char_offset)
        .map(|(index, _)| index)
        .unwrap_or(text.len())
}
