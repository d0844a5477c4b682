use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::error::StampError;

/// Handle to a persisted stamped document: an opaque identifier plus the
/// location it can be retrieved from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRef {
    pub id: String,
    pub path: PathBuf,
}

/// Durable home for stamped output bytes. The core hands bytes over and
/// gets back a reference; retention policy belongs to the implementor.
pub trait ArtifactStore: Send + Sync {
    fn persist(&self, bytes: &[u8]) -> Result<ArtifactRef, StampError>;
}

/// Writes each artifact as `signed_<uuid>.pdf` under a fixed directory.
pub struct DirArtifactStore {
    dir: PathBuf,
}

impl DirArtifactStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self, StampError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)
            .map_err(|e| StampError::Storage(format!("create {}: {e}", dir.display())))?;
        Ok(Self { dir })
    }
}

impl ArtifactStore for DirArtifactStore {
    fn persist(&self, bytes: &[u8]) -> Result<ArtifactRef, StampError> {
        let id = Uuid::new_v4().to_string();
        let path = self.dir.join(format!("signed_{id}.pdf"));
        std::fs::write(&path, bytes)
            .map_err(|e| StampError::Storage(format!("write {}: {e}", path.display())))?;
        Ok(ArtifactRef { id, path })
    }
}
