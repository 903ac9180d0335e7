//! In-memory artifact store.
//!
//! Holds "generated" artifacts until the process exits. Ids are random v4
//! UUIDs so download URLs cannot be guessed from one another.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

use crate::error::{ServerError, ServerResult};

/// One stored artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArtifact {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

impl StoredArtifact {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
            created_at: Utc::now(),
        }
    }
}

/// Thread-safe map from id to artifact.
#[derive(Debug, Default)]
pub struct ArtifactStore {
    artifacts: RwLock<HashMap<Uuid, StoredArtifact>>,
}

impl ArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an artifact under a fresh id.
    pub fn insert(&self, artifact: StoredArtifact) -> ServerResult<Uuid> {
        let id = Uuid::new_v4();
        self.artifacts
            .write()
            .map_err(|_| ServerError::Internal("artifact store poisoned".to_string()))?
            .insert(id, artifact);
        Ok(id)
    }

    pub fn get(&self, id: &Uuid) -> ServerResult<Option<StoredArtifact>> {
        let artifacts = self
            .artifacts
            .read()
            .map_err(|_| ServerError::Internal("artifact store poisoned".to_string()))?;
        Ok(artifacts.get(id).cloned())
    }

    pub fn len(&self) -> usize {
        self.artifacts.read().map(|a| a.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let store = ArtifactStore::new();
        let id = store
            .insert(StoredArtifact::new("report-week.xlsx", "application/octet-stream", vec![1, 2, 3]))
            .unwrap();

        let artifact = store.get(&id).unwrap().unwrap();
        assert_eq!(artifact.file_name, "report-week.xlsx");
        assert_eq!(artifact.bytes, vec![1, 2, 3]);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_unknown_id() {
        let store = ArtifactStore::new();
        assert!(store.get(&Uuid::new_v4()).unwrap().is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_ids_are_unique() {
        let store = ArtifactStore::new();
        let a = store.insert(StoredArtifact::new("a", "text/plain", vec![])).unwrap();
        let b = store.insert(StoredArtifact::new("a", "text/plain", vec![])).unwrap();
        assert_ne!(a, b);
    }
}
