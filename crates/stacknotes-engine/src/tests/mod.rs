use tempfile::TempDir;

use crate::editing::{Block, Document, NoteEditor, Point, RangeSelection};

/// Create a temporary data directory for file store tests
pub fn create_test_data_dir() -> TempDir {
    tempfile::tempdir().unwrap()
}

pub fn caret(block: usize, line: usize, offset: usize) -> RangeSelection {
    RangeSelection::caret(Point::new(block, line, offset))
}

/// Selection from `anchor` to `focus`, each given as `(block, line, offset)`
pub fn select(anchor: (usize, usize, usize), focus: (usize, usize, usize)) -> RangeSelection {
    RangeSelection::new(
        Point::new(anchor.0, anchor.1, anchor.2),
        Point::new(focus.0, focus.1, focus.2),
    )
}

pub fn document_with(blocks: Vec<Block>) -> Document {
    Document::from_blocks(blocks)
}

/// An editor holding `blocks` with `selection` already in place
pub fn editor_with(blocks: Vec<Block>, selection: RangeSelection) -> NoteEditor {
    let mut doc = Document::from_blocks(blocks);
    doc.set_selection(Some(selection));
    NoteEditor::with_document(doc)
}
