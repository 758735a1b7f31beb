// src/storage/memory.rs

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::SnapshotStore;
use crate::error::StorageError;
use crate::models::Snapshot;

/// Keeps the saved snapshot in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    saved: Mutex<Option<Snapshot>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// What the last successful `save` wrote.
    pub async fn saved(&self) -> Option<Snapshot> {
        self.saved.lock().await.clone()
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn load(&self) -> Result<Option<Snapshot>, StorageError> {
        Ok(self.saved.lock().await.clone())
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<(), StorageError> {
        *self.saved.lock().await = Some(snapshot.clone());
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
