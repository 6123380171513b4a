use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::editing::{Cmd, Document, EditorState, ListenerId, NoteEditor, RichTextEngine};
use crate::io::autosave::{AutoSave, DEFAULT_AUTOSAVE_DELAY, SaveOutcome};
use crate::io::{PersistenceAdapter, parse_region_key, region_key};
use crate::models::{
    ActiveRegistry, Region, RegionId, RegionList, RegionListChange, Toolbar, ToolbarAction,
};

pub const DEFAULT_NAMESPACE: &str = "stacknotes";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceOptions {
    /// Key prefix for this workspace's snapshots
    pub namespace: String,
    pub autosave_delay: Duration,
}

impl Default for WorkspaceOptions {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            autosave_delay: DEFAULT_AUTOSAVE_DELAY,
        }
    }
}

/// One live region: its engine, save bookkeeping and our listener on it
struct Slot {
    editor: Rc<NoteEditor>,
    autosave: AutoSave,
    listener: ListenerId,
}

impl Drop for Slot {
    fn drop(&mut self) {
        self.editor.unregister_update_listener(self.listener);
    }
}

struct State {
    regions: RegionList,
    slots: BTreeMap<RegionId, Slot>,
}

/// Everything the per-region update listeners need to reach
struct Core<P> {
    store: P,
    options: WorkspaceOptions,
    registry: ActiveRegistry<NoteEditor>,
    state: RefCell<State>,
}

/// The stack of editing regions behind one toolbar.
///
/// Owns the region list, one [`NoteEditor`] per region, the
/// [`ActiveRegistry`] and the [`Toolbar`]. Every committed change in a region
/// updates the blank-slot bookkeeping, marks the region active when it holds
/// a selection, and restarts its save timer. Writes happen from
/// [`Workspace::tick`], [`Workspace::flush`] or on drop.
pub struct Workspace<P: PersistenceAdapter + 'static> {
    core: Rc<Core<P>>,
    toolbar: Toolbar<NoteEditor>,
}

impl<P: PersistenceAdapter + 'static> Workspace<P> {
    /// Restore every region saved under the namespace, or start with a single
    /// blank region.
    ///
    /// Unreadable or malformed snapshots are logged and their regions start
    /// blank.
    pub fn open(store: P, options: WorkspaceOptions) -> Self {
        let loaded = load_documents(&store, &options.namespace);
        let (regions, change) = RegionList::restore(
            loaded
                .iter()
                .map(|(id, doc)| Region::new(*id, doc.as_ref().is_none_or(|d| d.is_blank()))),
        );

        let registry = ActiveRegistry::new();
        let core = Rc::new(Core {
            store,
            options,
            registry,
            state: RefCell::new(State {
                regions: RegionList::new(),
                slots: BTreeMap::new(),
            }),
        });

        let mut documents: BTreeMap<RegionId, Document> = loaded
            .into_iter()
            .filter_map(|(id, doc)| doc.map(|doc| (id, doc)))
            .collect();
        let mut slots = BTreeMap::new();
        for id in regions.ids() {
            let document = documents.remove(&id);
            let mut slot = Core::create_slot(&core, id, document.clone().unwrap_or_default());
            if let Some(snapshot) = document.and_then(|doc| doc.to_snapshot().ok()) {
                slot.autosave.mark_saved(snapshot);
            }
            slots.insert(id, slot);
        }
        for id in &change.removed {
            core.remove_snapshot(*id);
        }

        log::info!(
            "Opened {} region(s) in namespace '{}'",
            regions.len(),
            core.options.namespace
        );
        *core.state.borrow_mut() = State { regions, slots };

        let toolbar = Toolbar::new(&core.registry);
        Self { core, toolbar }
    }

    pub fn options(&self) -> &WorkspaceOptions {
        &self.core.options
    }

    pub fn store(&self) -> &P {
        &self.core.store
    }

    pub fn registry(&self) -> &ActiveRegistry<NoteEditor> {
        &self.core.registry
    }

    pub fn toolbar(&self) -> &Toolbar<NoteEditor> {
        &self.toolbar
    }

    /// Regions in display order
    pub fn regions(&self) -> Vec<Region> {
        self.core.state.borrow().regions.regions().to_vec()
    }

    pub fn editor(&self, id: RegionId) -> Option<Rc<NoteEditor>> {
        self.core
            .state
            .borrow()
            .slots
            .get(&id)
            .map(|slot| Rc::clone(&slot.editor))
    }

    /// Every region with its editor, in display order
    pub fn editors(&self) -> Vec<(RegionId, Rc<NoteEditor>)> {
        let state = self.core.state.borrow();
        state
            .regions
            .ids()
            .filter_map(|id| state.slots.get(&id).map(|slot| (id, Rc::clone(&slot.editor))))
            .collect()
    }

    pub fn active_editor(&self) -> Option<Rc<NoteEditor>> {
        self.core.registry.active()
    }

    pub fn active_region(&self) -> Option<RegionId> {
        self.core.active_region()
    }

    /// Make `id` the active region and give it a caret
    pub fn focus(&self, id: RegionId) -> bool {
        let Some(editor) = self.editor(id) else {
            return false;
        };
        self.core.registry.set_active(Some(Rc::clone(&editor)));
        editor.focus();
        true
    }

    /// Focus the region after the active one, or the first region
    pub fn focus_next(&self) -> bool {
        self.focus_relative(1)
    }

    /// Focus the region before the active one, or the last region
    pub fn focus_previous(&self) -> bool {
        self.focus_relative(-1)
    }

    /// Apply a text command to the active region
    pub fn apply(&self, cmd: Cmd) -> bool {
        match self.active_editor() {
            Some(editor) => editor.apply(cmd),
            None => false,
        }
    }

    pub fn trigger(&self, action: ToolbarAction) -> bool {
        self.toolbar.trigger(action)
    }

    /// Write every region whose save timer has expired; returns the number of
    /// snapshots written.
    pub fn tick(&self, now: Instant) -> usize {
        self.core.save_each(|slot, document, store| slot.poll(now, document, store))
    }

    /// Earliest pending save deadline, for sizing the event loop's wait
    pub fn next_deadline(&self) -> Option<Instant> {
        self.core
            .state
            .borrow()
            .slots
            .values()
            .filter_map(|slot| slot.autosave.debouncer().deadline())
            .min()
    }

    pub fn has_pending_saves(&self) -> bool {
        self.core
            .state
            .borrow()
            .slots
            .values()
            .any(|slot| slot.autosave.is_pending())
    }

    /// Write every pending change now
    pub fn flush(&self) -> usize {
        self.core.save_each(|slot, document, store| slot.flush(document, store))
    }

    /// Flush pending saves and close the workspace
    pub fn shutdown(self) -> usize {
        self.flush()
    }

    fn focus_relative(&self, step: isize) -> bool {
        let active = self.active_region();
        let target = {
            let state = self.core.state.borrow();
            let regions = state.regions.regions();
            let index = match active.and_then(|id| state.regions.position(id)) {
                Some(index) => index.checked_add_signed(step),
                None if step >= 0 => Some(0),
                None => regions.len().checked_sub(1),
            };
            index.and_then(|index| regions.get(index)).map(|region| region.id)
        };
        target.is_some_and(|id| self.focus(id))
    }
}

impl<P: PersistenceAdapter + 'static> Drop for Workspace<P> {
    fn drop(&mut self) {
        let written = self.flush();
        if written > 0 {
            log::debug!("Flushed {} snapshot(s) on close", written);
        }
    }
}

impl<P: PersistenceAdapter + 'static> Core<P> {
    fn create_slot(core: &Rc<Self>, id: RegionId, document: Document) -> Slot {
        let editor = Rc::new(NoteEditor::with_document(document));
        let weak_core = Rc::downgrade(core);
        let weak_editor = Rc::downgrade(&editor);
        let listener = editor.register_update_listener(move |doc| {
            if let (Some(core), Some(editor)) = (weak_core.upgrade(), weak_editor.upgrade()) {
                Core::on_update(&core, id, &editor, doc);
            }
        });
        let key = region_key(&core.options.namespace, id);
        Slot {
            editor,
            autosave: AutoSave::new(key, core.options.autosave_delay),
            listener,
        }
    }

    fn on_update(core: &Rc<Self>, id: RegionId, editor: &Rc<NoteEditor>, doc: &Document) {
        let change = {
            let mut state = core.state.borrow_mut();
            if let Some(slot) = state.slots.get_mut(&id) {
                slot.autosave.mark_changed(Instant::now());
            }
            state.regions.on_emptiness_changed(id, doc.is_blank())
        };
        Core::apply_change(core, change);

        let still_present = core.state.borrow().slots.contains_key(&id);
        if still_present && doc.selection().is_some() {
            core.registry.set_active(Some(Rc::clone(editor)));
        }
    }

    fn apply_change(core: &Rc<Self>, change: RegionListChange) {
        if change.is_empty() {
            return;
        }

        for id in change.added {
            let slot = Core::create_slot(core, id, Document::new());
            core.state.borrow_mut().slots.insert(id, slot);
        }

        let mut pruned = Vec::new();
        for id in change.removed {
            if let Some(slot) = core.state.borrow_mut().slots.remove(&id) {
                pruned.push(slot);
            }
            core.remove_snapshot(id);
        }

        // a pruned active region hands focus to the surviving blank slot
        let active_pruned = core.registry.active().is_some_and(|active| {
            pruned
                .iter()
                .any(|slot| Rc::ptr_eq(&slot.editor, &active))
        });
        drop(pruned);
        if active_pruned {
            let last = {
                let state = core.state.borrow();
                state
                    .regions
                    .last()
                    .and_then(|region| state.slots.get(&region.id))
                    .map(|slot| Rc::clone(&slot.editor))
            };
            if let Some(editor) = last {
                core.registry.set_active(Some(Rc::clone(&editor)));
                editor.focus();
            }
        }
    }

    fn active_region(&self) -> Option<RegionId> {
        let active = self.registry.active()?;
        self.state
            .borrow()
            .slots
            .iter()
            .find(|(_, slot)| Rc::ptr_eq(&slot.editor, &active))
            .map(|(id, _)| *id)
    }

    fn remove_snapshot(&self, id: RegionId) {
        let key = region_key(&self.options.namespace, id);
        match self.store.remove(&key) {
            Ok(()) => log::debug!("Pruned region {}", id),
            Err(e) => log::warn!("Failed to remove {}: {}", key, e),
        }
    }

    fn save_each(&self, mut save: impl FnMut(&mut AutoSave, &Document, &P) -> SaveOutcome) -> usize {
        let mut state = self.state.borrow_mut();
        let mut written = 0;
        for slot in state.slots.values_mut() {
            let document = slot.editor.state();
            if save(&mut slot.autosave, &document, &self.store) == SaveOutcome::Saved {
                written += 1;
            }
        }
        written
    }
}

/// Snapshots stored under `namespace`, by region id; `None` where the snapshot
/// could not be read or parsed.
fn load_documents<P: PersistenceAdapter>(
    store: &P,
    namespace: &str,
) -> Vec<(RegionId, Option<Document>)> {
    let keys = match store.keys(namespace) {
        Ok(keys) => keys,
        Err(e) => {
            log::warn!("Failed to list snapshots in '{}': {}", namespace, e);
            return Vec::new();
        }
    };

    let mut loaded = Vec::new();
    for key in keys {
        let Some(id) = parse_region_key(&key) else {
            continue;
        };
        let document = match store.load(&key) {
            Ok(Some(raw)) => match Document::from_snapshot(&raw) {
                Ok(document) => Some(document),
                Err(e) => {
                    log::warn!("Ignoring malformed snapshot {}: {}", key, e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                log::warn!("Failed to read {}: {}", key, e);
                None
            }
        };
        loaded.push((id, document));
    }
    loaded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editing::{Block, ListType};
    use crate::io::{MemoryStore, StoreError};
    use crate::models::ToolbarState;
    use pretty_assertions::assert_eq;
    use relative_path::RelativePath;

    const DELAY: Duration = Duration::from_millis(500);

    fn options() -> WorkspaceOptions {
        WorkspaceOptions {
            namespace: "notes".to_string(),
            autosave_delay: DELAY,
        }
    }

    type TestWorkspace = Workspace<Rc<MemoryStore>>;

    fn open(store: &Rc<MemoryStore>) -> TestWorkspace {
        Workspace::open(Rc::clone(store), options())
    }

    fn shape(workspace: &TestWorkspace) -> Vec<(u64, bool)> {
        workspace
            .regions()
            .iter()
            .map(|region| (region.id.get(), region.is_empty))
            .collect()
    }

    fn type_into(workspace: &TestWorkspace, id: u64, text: &str) {
        assert!(workspace.focus(RegionId::new(id)));
        workspace.apply(Cmd::insert(text));
    }

    fn clear(workspace: &TestWorkspace, id: u64) {
        assert!(workspace.focus(RegionId::new(id)));
        workspace.apply(Cmd::SelectAll);
        workspace.apply(Cmd::DeleteBackward);
    }

    fn text_of(workspace: &TestWorkspace, id: u64) -> String {
        workspace
            .editor(RegionId::new(id))
            .map(|editor| editor.state().text())
            .unwrap_or_default()
    }

    #[test]
    fn test_fresh_workspace_has_one_blank_region() {
        let store = Rc::new(MemoryStore::new());

        let workspace = open(&store);

        assert_eq!(shape(&workspace), vec![(1, true)]);
        assert_eq!(workspace.active_region(), None);
        assert_eq!(workspace.toolbar().state(), ToolbarState::default());
        assert!(!workspace.apply(Cmd::insert("nowhere")));
    }

    #[test]
    fn test_typing_appends_blank_slot_and_activates_region() {
        let store = Rc::new(MemoryStore::new());
        let workspace = open(&store);

        type_into(&workspace, 1, "hello");

        assert_eq!(shape(&workspace), vec![(1, false), (2, true)]);
        assert_eq!(workspace.active_region(), Some(RegionId::new(1)));
        assert!(workspace.toolbar().state().enabled);
    }

    #[test]
    fn test_clearing_region_collapses_trailing_blanks() {
        let store = Rc::new(MemoryStore::new());
        let workspace = open(&store);
        type_into(&workspace, 1, "one");
        type_into(&workspace, 2, "two");
        assert_eq!(shape(&workspace), vec![(1, false), (2, false), (3, true)]);

        clear(&workspace, 2);

        assert_eq!(shape(&workspace), vec![(1, false), (2, true)]);
        assert_eq!(workspace.active_region(), Some(RegionId::new(2)));
        assert!(workspace.editor(RegionId::new(3)).is_none());
    }

    #[test]
    fn test_interior_region_stays_when_cleared() {
        let store = Rc::new(MemoryStore::new());
        let workspace = open(&store);
        type_into(&workspace, 1, "one");
        type_into(&workspace, 2, "two");

        clear(&workspace, 1);

        assert_eq!(shape(&workspace), vec![(1, true), (2, false), (3, true)]);
    }

    #[test]
    fn test_pruned_active_region_hands_focus_to_blank_slot() {
        // Given an interior blank region and a filled region after it
        let store = Rc::new(MemoryStore::new());
        let workspace = open(&store);
        type_into(&workspace, 1, "one");
        type_into(&workspace, 2, "two");
        clear(&workspace, 1);
        workspace.flush();
        assert!(store.get(RelativePath::new("notes/region-2")).is_some());

        // When the filled region is cleared too
        clear(&workspace, 2);

        // Then only the first blank survives, with focus and no stale snapshot
        assert_eq!(shape(&workspace), vec![(1, true)]);
        assert_eq!(workspace.active_region(), Some(RegionId::new(1)));
        assert_eq!(store.get(RelativePath::new("notes/region-2")), None);
    }

    #[test]
    fn test_burst_of_edits_is_written_once() {
        let store = Rc::new(MemoryStore::new());
        let workspace = open(&store);
        workspace.focus(RegionId::new(1));
        for ch in ["a", "b", "c", "d", "e"] {
            workspace.apply(Cmd::insert(ch));
        }

        let early = workspace.tick(Instant::now());
        let due = workspace.tick(Instant::now() + DELAY);
        let again = workspace.tick(Instant::now() + DELAY * 2);

        assert_eq!((early, due, again), (0, 1, 0));
        let saved = store.get(RelativePath::new("notes/region-1")).unwrap();
        assert_eq!(Document::from_snapshot(&saved).unwrap().text(), "abcde");
    }

    #[test]
    fn test_next_deadline_tracks_pending_saves() {
        let store = Rc::new(MemoryStore::new());
        let workspace = open(&store);
        assert_eq!(workspace.next_deadline(), None);

        type_into(&workspace, 1, "x");

        assert!(workspace.next_deadline().is_some());
        assert!(workspace.has_pending_saves());
        workspace.flush();
        assert_eq!(workspace.next_deadline(), None);
    }

    #[test]
    fn test_drop_flushes_pending_saves() {
        let store = Rc::new(MemoryStore::new());
        {
            let workspace = open(&store);
            type_into(&workspace, 1, "unsaved");
            assert!(store.is_empty());
        }

        let saved = store.get(RelativePath::new("notes/region-1")).unwrap();
        assert_eq!(Document::from_snapshot(&saved).unwrap().text(), "unsaved");
    }

    #[test]
    fn test_shutdown_reports_written_snapshots() {
        let store = Rc::new(MemoryStore::new());
        let workspace = open(&store);
        type_into(&workspace, 1, "one");
        type_into(&workspace, 2, "two");

        assert_eq!(workspace.shutdown(), 2);
    }

    #[test]
    fn test_reopen_restores_regions_with_trailing_blank() {
        let store = Rc::new(MemoryStore::new());
        {
            let workspace = open(&store);
            type_into(&workspace, 1, "alpha");
            type_into(&workspace, 2, "beta");
            workspace.trigger(ToolbarAction::Checklist);
        }

        let workspace = open(&store);

        assert_eq!(shape(&workspace), vec![(1, false), (2, false), (3, true)]);
        assert_eq!(text_of(&workspace, 1), "alpha");
        let second = workspace.editor(RegionId::new(2)).unwrap();
        assert_eq!(second.state().outline(), "[ ] beta");
        assert_eq!(workspace.active_region(), None);
    }

    #[test]
    fn test_reopen_without_edits_writes_nothing() {
        let store = Rc::new(MemoryStore::new());
        {
            let workspace = open(&store);
            type_into(&workspace, 1, "alpha");
        }
        let before = store.get(RelativePath::new("notes/region-1"));

        let workspace = open(&store);
        workspace.focus(RegionId::new(1));

        assert_eq!(workspace.flush(), 0);
        assert_eq!(store.get(RelativePath::new("notes/region-1")), before);
    }

    #[test]
    fn test_malformed_snapshot_starts_blank() {
        let store = Rc::new(MemoryStore::new());
        store.insert("notes/region-1", "not json at all");
        store.insert("notes/region-2", "[1, 2, 3]");
        store.insert(
            "notes/region-3",
            Document::from_blocks(vec![Block::paragraph("kept")])
                .to_snapshot()
                .unwrap(),
        );

        let workspace = open(&store);

        assert_eq!(
            shape(&workspace),
            vec![(1, true), (2, true), (3, false), (4, true)]
        );
        assert_eq!(text_of(&workspace, 1), "");
        assert_eq!(text_of(&workspace, 3), "kept");
    }

    #[test]
    fn test_surplus_trailing_blanks_are_pruned_on_open() {
        let store = Rc::new(MemoryStore::new());
        let blank = Document::new().to_snapshot().unwrap();
        store.insert(
            "notes/region-1",
            Document::from_blocks(vec![Block::paragraph("x")])
                .to_snapshot()
                .unwrap(),
        );
        store.insert("notes/region-2", blank.clone());
        store.insert("notes/region-3", blank);

        let workspace = open(&store);

        assert_eq!(shape(&workspace), vec![(1, false), (2, true)]);
        assert_eq!(store.get(RelativePath::new("notes/region-3")), None);
    }

    #[test]
    fn test_failed_write_leaves_state_untouched() {
        let store = Rc::new(MemoryStore::with_quota(16));
        let workspace = open(&store);
        type_into(&workspace, 1, "far more text than the quota allows");

        let written = workspace.tick(Instant::now() + DELAY);

        assert_eq!(written, 0);
        assert!(store.is_empty());
        assert_eq!(text_of(&workspace, 1), "far more text than the quota allows");
        assert!(matches!(
            store.save(RelativePath::new("notes/region-1"), &"x".repeat(17)),
            Err(StoreError::QuotaExceeded(_))
        ));
    }

    #[test]
    fn test_shutdown_writes_change_whose_save_failed() {
        let store = Rc::new(MemoryStore::with_quota(4));
        let workspace = open(&store);
        type_into(&workspace, 1, "important");
        assert_eq!(workspace.tick(Instant::now() + DELAY), 0);
        assert!(workspace.has_pending_saves());

        store.set_quota(None);
        let written = workspace.shutdown();

        assert_eq!(written, 1);
        let saved = store.get(RelativePath::new("notes/region-1")).unwrap();
        assert_eq!(Document::from_snapshot(&saved).unwrap().text(), "important");
    }

    #[test]
    fn test_toolbar_follows_focus() {
        let store = Rc::new(MemoryStore::new());
        let workspace = open(&store);
        type_into(&workspace, 1, "bullet");
        workspace.trigger(ToolbarAction::Bullet);
        type_into(&workspace, 2, "plain");

        let on_plain = workspace.toolbar().state().list_type;
        workspace.focus(RegionId::new(1));
        let on_bullet = workspace.toolbar().state().list_type;

        assert_eq!(on_plain, None);
        assert_eq!(on_bullet, Some(ListType::Bullet));
    }

    #[test]
    fn test_focus_next_and_previous() {
        let store = Rc::new(MemoryStore::new());
        let workspace = open(&store);
        type_into(&workspace, 1, "one");
        type_into(&workspace, 2, "two");

        assert!(workspace.focus_next());
        assert_eq!(workspace.active_region(), Some(RegionId::new(3)));
        assert!(!workspace.focus_next());
        assert!(workspace.focus_previous());
        assert!(workspace.focus_previous());
        assert_eq!(workspace.active_region(), Some(RegionId::new(1)));
        assert!(!workspace.focus_previous());
    }

    #[test]
    fn test_focus_next_without_active_region_starts_at_top() {
        let store = Rc::new(MemoryStore::new());
        let workspace = open(&store);

        assert!(workspace.focus_next());

        assert_eq!(workspace.active_region(), Some(RegionId::new(1)));
    }

    #[test]
    fn test_focus_unknown_region() {
        let store = Rc::new(MemoryStore::new());
        let workspace = open(&store);

        assert!(!workspace.focus(RegionId::new(42)));
    }
}
