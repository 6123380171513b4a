//! Converting a selection between paragraphs, bullet/number lists and
//! checklists.
//!
//! Planning is a pure function of an [`EditorState`]; execution issues the
//! planned [`ListAction`] through the [`RichTextEngine`] boundary. Both entry
//! points return whether they consumed the request, which is `false` when the
//! region holds no range selection.

use crate::editing::{EditorState, ListCommand, ListItemKey, ListType, RichTextEngine};

/// What a toolbar action resolved to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListAction {
    InsertList(ListType),
    RemoveList,
    /// Mark every listed item checked in one transaction
    CheckItems(Vec<ListItemKey>),
}

/// Aggregate state of the selection as seen by the checklist cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecklistPhase {
    NotList,
    Unchecked,
    FullyChecked,
}

/// List type of the top-level block holding the selection anchor
pub fn selection_list_type<S: EditorState>(state: &S) -> Option<ListType> {
    let selection = state.selection()?;
    state.block_kind(selection.anchor.block)?.list_type()
}

/// `None` without a selection, or when a checklist selection touches no items.
pub fn checklist_phase<S: EditorState>(state: &S) -> Option<ChecklistPhase> {
    state.selection()?;
    if selection_list_type(state) != Some(ListType::Check) {
        return Some(ChecklistPhase::NotList);
    }
    let items = state.selected_list_items();
    if items.is_empty() {
        return None;
    }
    // a single unchecked item outweighs any number of checked ones
    let any_unchecked = items
        .iter()
        .any(|item| state.is_checked(*item) == Some(false));
    Some(if any_unchecked {
        ChecklistPhase::Unchecked
    } else {
        ChecklistPhase::FullyChecked
    })
}

pub fn plan_toggle<S: EditorState>(target: ListType, state: &S) -> Option<ListAction> {
    state.selection()?;
    if selection_list_type(state) == Some(target) {
        Some(ListAction::RemoveList)
    } else {
        Some(ListAction::InsertList(target))
    }
}

pub fn plan_cycle<S: EditorState>(state: &S) -> Option<ListAction> {
    match checklist_phase(state)? {
        ChecklistPhase::NotList => Some(ListAction::InsertList(ListType::Check)),
        ChecklistPhase::Unchecked => Some(ListAction::CheckItems(state.selected_list_items())),
        ChecklistPhase::FullyChecked => Some(ListAction::RemoveList),
    }
}

/// Toggle `target` on the selection: remove the list if the selection already
/// sits in a `target` list, otherwise convert to `target`.
pub fn toggle_list<E: RichTextEngine>(target: ListType, engine: &E) -> bool {
    match engine.read(|state| plan_toggle(target, state)) {
        Some(action) => execute(engine, action),
        None => false,
    }
}

/// Advance the checklist cycle: not a list, unchecked, fully checked, removed.
pub fn cycle_checklist<E: RichTextEngine>(engine: &E) -> bool {
    match engine.read(plan_cycle::<E::State>) {
        Some(action) => execute(engine, action),
        None => false,
    }
}

fn execute<E: RichTextEngine>(engine: &E, action: ListAction) -> bool {
    match action {
        ListAction::InsertList(list_type) => {
            engine.dispatch_command(ListCommand::InsertList(list_type));
        }
        ListAction::RemoveList => {
            engine.dispatch_command(ListCommand::RemoveList);
        }
        ListAction::CheckItems(items) => engine.update(|state| {
            for item in items {
                state.set_checked(item, true);
            }
        }),
    }
    true
}
