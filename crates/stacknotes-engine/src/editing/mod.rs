/*!
 * # Editing Module
 *
 * Everything that touches the content of a single editing region.
 *
 * ## Architecture Overview
 *
 * ### 1. Engine Boundary
 * - **`RichTextEngine`** is the only way the rest of the crate reaches a region:
 *   scoped `read`/`update` transactions, update listeners and `dispatch_command`
 * - **`EditorState`** is the read-only view handed out inside transactions;
 *   block classification is a capability query returning **`BlockKind`**
 *
 * ### 2. Immutable Committed States
 * - **`NoteEditor`** keeps the latest committed **`Document`** behind an `Rc`
 * - `update` edits a draft copy and commits it atomically, then notifies every
 *   listener before the caller regains control
 *
 * ### 3. Command-Based Editing
 * - Text edits are **`Cmd`** values applied with `Document::apply`
 * - Structural list edits are **`ListCommand`** values dispatched to the engine
 *
 * ### 4. List Toggling
 * - **`list_toggle`** plans toolbar actions from an `EditorState` and executes
 *   them through the engine boundary, including the checklist cycle
 *
 * ## Module Structure
 *
 * - **`engine`**: boundary traits and the selection/position types
 * - **`document`**: block model with text, selection and list operations
 * - **`editor`**: `NoteEditor`, the engine instance used by the workspace
 * - **`commands`**: `Cmd` and caret `Direction`
 * - **`list_toggle`**: bullet/number toggling and the checklist cycle
 * - **`snapshot`**: JSON snapshot format used for persistence
 *
 * ## Usage Pattern
 *
 * ```rust
 * use stacknotes_engine::editing::*;
 *
 * let editor = NoteEditor::new();
 * editor.focus();
 * editor.apply(Cmd::insert("buy milk"));
 *
 * // not a list -> unchecked -> checked -> plain text again
 * cycle_checklist(&editor);
 * assert_eq!(editor.state().outline(), "[ ] buy milk");
 * cycle_checklist(&editor);
 * assert_eq!(editor.state().outline(), "[x] buy milk");
 * ```
 */

// Module exports
pub mod commands;
pub mod document;
pub mod editor;
pub mod engine;
pub mod list_toggle;
pub mod snapshot;

// Public API re-exports
pub use commands::{Cmd, Direction};
pub use document::{Block, DisplayLine, Document, ListItem};
pub use editor::NoteEditor;
pub use engine::{
    BlockKind, EditorState, ListCommand, ListItemKey, ListType, ListenerId, Point,
    RangeSelection, RichTextEngine,
};
pub use list_toggle::{
    ChecklistPhase, ListAction, checklist_phase, cycle_checklist, plan_cycle, plan_toggle,
    selection_list_type, toggle_list,
};
pub use snapshot::{SNAPSHOT_VERSION, SnapshotError};
