//! Serialized form of a document, as handed to a [`crate::PersistenceAdapter`].
//!
//! A snapshot is a JSON object `{"version": 1, "blocks": [...]}`. The
//! selection is deliberately not part of it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::editing::{Block, Document};

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("snapshot is not a JSON object")]
    NotAnObject,
    #[error("unsupported snapshot version {0}")]
    UnsupportedVersion(u32),
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotRepr {
    version: u32,
    blocks: Vec<Block>,
}

impl Document {
    pub fn to_snapshot(&self) -> Result<String, SnapshotError> {
        let repr = SnapshotRepr {
            version: SNAPSHOT_VERSION,
            blocks: self.blocks().to_vec(),
        };
        Ok(serde_json::to_string(&repr)?)
    }

    pub fn from_snapshot(raw: &str) -> Result<Self, SnapshotError> {
        let value: serde_json::Value = serde_json::from_str(raw)?;
        if !value.is_object() {
            return Err(SnapshotError::NotAnObject);
        }
        let repr: SnapshotRepr = serde_json::from_value(value)?;
        if repr.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion(repr.version));
        }
        Ok(Document::from_blocks(repr.blocks))
    }
}
