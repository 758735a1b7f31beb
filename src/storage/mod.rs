// src/storage/mod.rs

use async_trait::async_trait;

use crate::error::StorageError;
use crate::models::Snapshot;

pub mod json_file;
pub mod memory;
pub mod postgres;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;
pub use postgres::PgSnapshotStore;

/// Durable home of the whole dataset.
///
/// `load` returns `None` when nothing was ever saved. `save` replaces the
/// stored snapshot as a unit.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn load(&self) -> Result<Option<Snapshot>, StorageError>;

    async fn save(&self, snapshot: &Snapshot) -> Result<(), StorageError>;

    /// Short label for logs.
    fn describe(&self) -> String;
}
