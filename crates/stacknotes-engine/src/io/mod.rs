pub mod autosave;

use relative_path::{RelativePath, RelativePathBuf};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::models::RegionId;

const SNAPSHOT_EXTENSION: &str = "json";
const REGION_PREFIX: &str = "region-";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Storage quota exceeded writing {0}")]
    QuotaExceeded(RelativePathBuf),
}

/// Key/value storage for region snapshots.
///
/// Keys are relative paths of the form `<namespace>/region-<id>`.
pub trait PersistenceAdapter {
    /// `Ok(None)` when nothing is stored under `key`
    fn load(&self, key: &RelativePath) -> Result<Option<String>, StoreError>;

    fn save(&self, key: &RelativePath, snapshot: &str) -> Result<(), StoreError>;

    /// Removing an absent key is not an error
    fn remove(&self, key: &RelativePath) -> Result<(), StoreError>;

    /// Every stored key under `namespace`, sorted
    fn keys(&self, namespace: &str) -> Result<Vec<RelativePathBuf>, StoreError>;
}

impl<P: PersistenceAdapter + ?Sized> PersistenceAdapter for Rc<P> {
    fn load(&self, key: &RelativePath) -> Result<Option<String>, StoreError> {
        (**self).load(key)
    }

    fn save(&self, key: &RelativePath, snapshot: &str) -> Result<(), StoreError> {
        (**self).save(key, snapshot)
    }

    fn remove(&self, key: &RelativePath) -> Result<(), StoreError> {
        (**self).remove(key)
    }

    fn keys(&self, namespace: &str) -> Result<Vec<RelativePathBuf>, StoreError> {
        (**self).keys(namespace)
    }
}

pub fn region_key(namespace: &str, id: RegionId) -> RelativePathBuf {
    RelativePath::new(namespace).join(format!("{REGION_PREFIX}{id}"))
}

/// Inverse of [`region_key`]; `None` for keys that do not name a region
pub fn parse_region_key(key: &RelativePath) -> Option<RegionId> {
    key.file_name()?
        .strip_prefix(REGION_PREFIX)?
        .parse::<u64>()
        .ok()
        .map(RegionId::new)
}

/// Snapshots stored as `<root>/<namespace>/region-<id>.json`
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &RelativePath) -> PathBuf {
        key.with_extension(SNAPSHOT_EXTENSION).to_path(&self.root)
    }
}

impl PersistenceAdapter for FileStore {
    fn load(&self, key: &RelativePath) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    fn save(&self, key: &RelativePath, snapshot: &str) -> Result<(), StoreError> {
        let absolute_path = self.path_for(key);

        // Create parent directories if they don't exist
        if let Some(parent) = absolute_path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(&absolute_path, snapshot)?;
        Ok(())
    }

    fn remove(&self, key: &RelativePath) -> Result<(), StoreError> {
        match fs::remove_file(self.path_for(key)) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(StoreError::Io(e)),
            _ => Ok(()),
        }
    }

    fn keys(&self, namespace: &str) -> Result<Vec<RelativePathBuf>, StoreError> {
        let dir = RelativePath::new(namespace).to_path(&self.root);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::Io(e)),
        };

        let mut keys = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.is_file()
                && path.extension().is_some_and(|ext| ext == SNAPSHOT_EXTENSION)
                && let Some(stem) = path.file_stem().and_then(|stem| stem.to_str())
            {
                keys.push(RelativePath::new(namespace).join(stem));
            }
        }
        keys.sort();
        Ok(keys)
    }
}

/// In-memory store with an optional byte quota, for tests and ephemeral
/// sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<BTreeMap<RelativePathBuf, String>>,
    quota: Cell<Option<usize>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Saves fail once the stored snapshots would exceed `bytes`
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            entries: RefCell::default(),
            quota: Cell::new(Some(bytes)),
        }
    }

    pub fn set_quota(&self, quota: Option<usize>) {
        self.quota.set(quota);
    }

    /// Store raw content under `key`, bypassing the quota
    pub fn insert(&self, key: impl Into<RelativePathBuf>, content: impl Into<String>) {
        self.entries.borrow_mut().insert(key.into(), content.into());
    }

    pub fn get(&self, key: &RelativePath) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl PersistenceAdapter for MemoryStore {
    fn load(&self, key: &RelativePath) -> Result<Option<String>, StoreError> {
        Ok(self.get(key))
    }

    fn save(&self, key: &RelativePath, snapshot: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.borrow_mut();
        if let Some(quota) = self.quota.get() {
            let others: usize = entries
                .iter()
                .filter(|(stored, _)| stored.as_str() != key.as_str())
                .map(|(_, content)| content.len())
                .sum();
            if others + snapshot.len() > quota {
                return Err(StoreError::QuotaExceeded(key.to_owned()));
            }
        }
        entries.insert(key.to_owned(), snapshot.to_string());
        Ok(())
    }

    fn remove(&self, key: &RelativePath) -> Result<(), StoreError> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }

    fn keys(&self, namespace: &str) -> Result<Vec<RelativePathBuf>, StoreError> {
        let namespace = RelativePath::new(namespace);
        Ok(self
            .entries
            .borrow()
            .keys()
            .filter(|key| key.parent() == Some(namespace))
            .cloned()
            .collect())
    }
}
