//! End-to-end sessions against the file store

use std::time::{Duration, Instant};

use stacknotes_engine::{
    Cmd, Direction, FileStore, ListType, RegionId, ToolbarAction, Workspace, WorkspaceOptions,
};

fn options() -> WorkspaceOptions {
    WorkspaceOptions {
        namespace: "notes".to_string(),
        autosave_delay: Duration::from_millis(200),
    }
}

fn shape(workspace: &Workspace<FileStore>) -> Vec<(u64, bool)> {
    workspace
        .regions()
        .iter()
        .map(|region| (region.id.get(), region.is_empty))
        .collect()
}

#[test]
fn session_survives_restart() {
    let data_dir = tempfile::tempdir().unwrap();

    // First session: a shopping checklist and a plain note
    {
        let workspace = Workspace::open(FileStore::new(data_dir.path()), options());
        workspace.focus(RegionId::new(1));
        workspace.apply(Cmd::insert("milk\neggs"));
        workspace.apply(Cmd::SelectAll);
        assert!(workspace.trigger(ToolbarAction::Checklist));
        workspace.apply(Cmd::move_caret(Direction::Up));
        assert!(workspace.trigger(ToolbarAction::Checklist));

        assert!(workspace.focus_next());
        workspace.apply(Cmd::insert("call the plumber"));

        assert_eq!(shape(&workspace), vec![(1, false), (2, false), (3, true)]);
        let written = workspace.tick(Instant::now() + Duration::from_secs(1));
        assert_eq!(written, 2);
    }

    assert!(data_dir.path().join("notes/region-1.json").is_file());
    assert!(data_dir.path().join("notes/region-2.json").is_file());
    assert!(!data_dir.path().join("notes/region-3.json").exists());

    // Second session picks up where the first left off
    let workspace = Workspace::open(FileStore::new(data_dir.path()), options());
    assert_eq!(shape(&workspace), vec![(1, false), (2, false), (3, true)]);

    let shopping = workspace.editor(RegionId::new(1)).unwrap();
    assert_eq!(shopping.state().outline(), "[x] milk\n[ ] eggs");

    workspace.focus(RegionId::new(1));
    assert_eq!(workspace.toolbar().state().list_type, Some(ListType::Check));
}

#[test]
fn clearing_the_last_note_removes_its_file() {
    let data_dir = tempfile::tempdir().unwrap();
    {
        let workspace = Workspace::open(FileStore::new(data_dir.path()), options());
        workspace.focus(RegionId::new(1));
        workspace.apply(Cmd::insert("first"));
        workspace.focus(RegionId::new(2));
        workspace.apply(Cmd::insert("second"));
    }
    assert!(data_dir.path().join("notes/region-2.json").is_file());

    let workspace = Workspace::open(FileStore::new(data_dir.path()), options());
    workspace.focus(RegionId::new(1));
    workspace.apply(Cmd::SelectAll);
    workspace.apply(Cmd::DeleteBackward);
    workspace.focus(RegionId::new(2));
    workspace.apply(Cmd::SelectAll);
    workspace.apply(Cmd::DeleteBackward);

    assert_eq!(shape(&workspace), vec![(1, true)]);
    assert!(!data_dir.path().join("notes/region-2.json").exists());
}

#[test]
fn garbage_on_disk_does_not_stop_startup() {
    let data_dir = tempfile::tempdir().unwrap();
    let notes = data_dir.path().join("notes");
    std::fs::create_dir_all(&notes).unwrap();
    std::fs::write(notes.join("region-1.json"), "{\"version\": 99, \"blocks\": []}").unwrap();
    std::fs::write(notes.join("region-2.json"), "\u{0}\u{1}binary").unwrap();
    std::fs::write(notes.join("unrelated.json"), "{}").unwrap();

    let workspace = Workspace::open(FileStore::new(data_dir.path()), options());

    assert_eq!(shape(&workspace), vec![(1, true)]);
}
