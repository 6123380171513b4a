use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::editing::{
    EditorState, ListType, ListenerId, RichTextEngine, cycle_checklist, selection_list_type,
    toggle_list,
};
use crate::models::{ActiveRegistry, Subscription};

/// What the front-end renders for the toolbar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ToolbarState {
    pub enabled: bool,
    /// List type at the active region's selection anchor
    pub list_type: Option<ListType>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolbarAction {
    Checklist,
    Bullet,
    Number,
}

fn classify<S: EditorState>(state: &S) -> ToolbarState {
    ToolbarState {
        enabled: true,
        list_type: selection_list_type(state),
    }
}

struct Tracking<E> {
    editor: Option<Rc<E>>,
    listener: Option<ListenerId>,
    state: ToolbarState,
}

impl<E> Default for Tracking<E> {
    fn default() -> Self {
        Self {
            editor: None,
            listener: None,
            state: ToolbarState::default(),
        }
    }
}

/// One toolbar driving whichever region is active.
///
/// Follows the [`ActiveRegistry`]: on every switch it moves its update
/// listener to the newly active engine and reclassifies from that engine's
/// latest committed state.
pub struct Toolbar<E: RichTextEngine + 'static> {
    tracking: Rc<RefCell<Tracking<E>>>,
    _subscription: Subscription<E>,
}

impl<E: RichTextEngine + 'static> Toolbar<E> {
    pub fn new(registry: &ActiveRegistry<E>) -> Self {
        let tracking = Rc::new(RefCell::new(Tracking::default()));
        let weak = Rc::downgrade(&tracking);
        let subscription = registry.subscribe(move |handle| {
            if let Some(tracking) = weak.upgrade() {
                Self::follow(&tracking, handle.cloned());
            }
        });
        Self {
            tracking,
            _subscription: subscription,
        }
    }

    pub fn state(&self) -> ToolbarState {
        self.tracking.borrow().state
    }

    /// Run `action` against the active region; `false` when nothing is active
    /// or the region has no selection.
    pub fn trigger(&self, action: ToolbarAction) -> bool {
        let Some(editor) = self.tracking.borrow().editor.clone() else {
            return false;
        };
        match action {
            ToolbarAction::Checklist => cycle_checklist(&*editor),
            ToolbarAction::Bullet => toggle_list(ListType::Bullet, &*editor),
            ToolbarAction::Number => toggle_list(ListType::Number, &*editor),
        }
    }

    fn follow(tracking: &Rc<RefCell<Tracking<E>>>, editor: Option<Rc<E>>) {
        let previous = {
            let mut tracking = tracking.borrow_mut();
            (tracking.editor.take(), tracking.listener.take())
        };
        if let (Some(old), Some(id)) = previous {
            old.unregister_update_listener(id);
        }

        let Some(editor) = editor else {
            tracking.borrow_mut().state = ToolbarState::default();
            return;
        };

        let weak: Weak<RefCell<Tracking<E>>> = Rc::downgrade(tracking);
        let listener = editor.register_update_listener(move |state| {
            if let Some(tracking) = weak.upgrade() {
                tracking.borrow_mut().state = classify(state);
            }
        });
        let state = editor.read(classify::<E::State>);

        let mut tracking = tracking.borrow_mut();
        tracking.editor = Some(editor);
        tracking.listener = Some(listener);
        tracking.state = state;
    }
}

impl<E: RichTextEngine + 'static> Drop for Toolbar<E> {
    fn drop(&mut self) {
        let mut tracking = self.tracking.borrow_mut();
        if let (Some(editor), Some(id)) = (tracking.editor.take(), tracking.listener.take()) {
            editor.unregister_update_listener(id);
        }
    }
}
