use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::editing::{Cmd, Document, ListCommand, ListenerId, RichTextEngine};

type UpdateListener = Rc<RefCell<dyn FnMut(&Document)>>;

/// Reference engine instance for one editing region.
///
/// Committed states are immutable `Rc<Document>` values: `update` edits a
/// draft copy, commits it if it differs, then notifies listeners with the new
/// state. An `update` issued from inside a listener commits straight away but
/// its notification is delivered once the current round has finished, so no
/// listener is ever re-entered.
pub struct NoteEditor {
    committed: RefCell<Rc<Document>>,
    version: Cell<u64>,
    listeners: RefCell<Vec<(ListenerId, UpdateListener)>>,
    next_listener: Cell<u64>,
    notifying: Cell<bool>,
    pending: Cell<bool>,
}

impl Default for NoteEditor {
    fn default() -> Self {
        Self::new()
    }
}

impl NoteEditor {
    pub fn new() -> Self {
        Self::with_document(Document::new())
    }

    pub fn with_document(document: Document) -> Self {
        Self {
            committed: RefCell::new(Rc::new(document)),
            version: Cell::new(0),
            listeners: RefCell::new(Vec::new()),
            next_listener: Cell::new(0),
            notifying: Cell::new(false),
            pending: Cell::new(false),
        }
    }

    /// Latest committed state
    pub fn state(&self) -> Rc<Document> {
        Rc::clone(&self.committed.borrow())
    }

    /// Incremented on every committed change
    pub fn version(&self) -> u64 {
        self.version.get()
    }

    pub fn apply(&self, cmd: Cmd) -> bool {
        self.update(|doc| doc.apply(&cmd))
    }

    /// Give the region a caret if it has none (what focusing it does)
    pub fn focus(&self) {
        self.update(Document::ensure_selection);
    }

    /// Replace the document wholesale, keeping listeners.
    pub fn set_document(&self, document: Document) {
        self.update(|doc| *doc = document);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    fn is_registered(&self, id: ListenerId) -> bool {
        self.listeners.borrow().iter().any(|(lid, _)| *lid == id)
    }

    fn notify(&self) {
        if self.notifying.get() {
            self.pending.set(true);
            return;
        }
        self.notifying.set(true);
        loop {
            self.pending.set(false);
            let state = self.state();
            let listeners: Vec<(ListenerId, UpdateListener)> = self.listeners.borrow().clone();
            for (id, listener) in listeners {
                // listeners removed earlier in this round are skipped
                if !self.is_registered(id) {
                    continue;
                }
                let mut callback = listener.borrow_mut();
                (&mut *callback)(&state);
            }
            if !self.pending.get() {
                break;
            }
        }
        self.notifying.set(false);
    }
}

impl RichTextEngine for NoteEditor {
    type State = Document;

    fn read<R>(&self, f: impl FnOnce(&Document) -> R) -> R {
        let state = self.state();
        f(&state)
    }

    fn update<R>(&self, f: impl FnOnce(&mut Document) -> R) -> R {
        let current = self.state();
        let mut draft = (*current).clone();
        let result = f(&mut draft);
        if draft != *current {
            *self.committed.borrow_mut() = Rc::new(draft);
            self.version.set(self.version.get() + 1);
            self.notify();
        }
        result
    }

    fn register_update_listener(&self, listener: impl FnMut(&Document) + 'static) -> ListenerId {
        let id = ListenerId(self.next_listener.get());
        self.next_listener.set(id.0 + 1);
        let listener: UpdateListener = Rc::new(RefCell::new(listener));
        self.listeners.borrow_mut().push((id, listener));
        id
    }

    fn unregister_update_listener(&self, id: ListenerId) {
        self.listeners.borrow_mut().retain(|(lid, _)| *lid != id);
    }

    fn dispatch_command(&self, command: ListCommand) -> bool {
        self.update(|doc| doc.apply_list_command(command))
    }
}
