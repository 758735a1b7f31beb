// src/storage/json_file.rs

use std::fs;
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tempfile::NamedTempFile;

use super::SnapshotStore;
use crate::error::StorageError;
use crate::models::Snapshot;

const SNAPSHOT_FILE: &str = "snapshot.json";

/// One pretty-printed JSON document inside a data directory.
///
/// Each save writes its own temp file in the same directory, fsyncs it and
/// renames it over the previous document. Renames are serialized, and a save
/// whose caller stopped waiting never reaches the rename.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
    rename_lock: Arc<Mutex<()>>,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            rename_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(SNAPSHOT_FILE)
    }
}

#[async_trait]
impl SnapshotStore for JsonFileStore {
    async fn load(&self) -> Result<Option<Snapshot>, StorageError> {
        let bytes = match tokio::fs::read(self.path()).await {
            Ok(b) => b,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec_pretty(snapshot)?;
        let len = bytes.len();

        let abandoned = Arc::new(AtomicBool::new(false));
        let mut guard = AbandonOnDrop {
            flag: abandoned.clone(),
            armed: true,
        };

        let dir = self.dir.clone();
        let path = self.path();
        let rename_lock = self.rename_lock.clone();
        let written = tokio::task::spawn_blocking(move || {
            write_atomically(&dir, &path, &bytes, &rename_lock, &abandoned)
        })
        .await;
        guard.armed = false;

        written.map_err(io::Error::other)??;
        tracing::debug!(path = %self.path().display(), bytes = len, "snapshot written");
        Ok(())
    }

    fn describe(&self) -> String {
        format!("json:{}", self.path().display())
    }
}

/// Writes `bytes` to a fresh temp file in `dir`, fsyncs it and renames it to
/// `path`. Returns `false` without touching `path` when `abandoned` is set by
/// the time the rename lock is held.
fn write_atomically(
    dir: &Path,
    path: &Path,
    bytes: &[u8],
    rename_lock: &Mutex<()>,
    abandoned: &AtomicBool,
) -> io::Result<bool> {
    fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;

    let _held = rename_lock.lock().unwrap_or_else(PoisonError::into_inner);
    if abandoned.load(Ordering::SeqCst) {
        // dropping `tmp` removes the temp file
        return Ok(false);
    }
    tmp.persist(path).map_err(|e| e.error)?;
    sync_dir(dir)?;
    Ok(true)
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> io::Result<()> {
    fs::File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}

/// Marks an in-flight save as abandoned when its future is dropped before the
/// blocking write reported back, e.g. on a storage timeout.
struct AbandonOnDrop {
    flag: Arc<AtomicBool>,
    armed: bool,
}

impl Drop for AbandonOnDrop {
    fn drop(&mut self) {
        if self.armed {
            self.flag.store(true, Ordering::SeqCst);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::default_catalog;

    fn files_in(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn missing_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested"));
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_creates_the_directory_and_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("data");
        let store = JsonFileStore::new(&data);
        let (services, staff) = default_catalog();
        let snap = Snapshot {
            services,
            staff,
            ..Snapshot::default()
        };

        store.save(&snap).await.unwrap();
        store.save(&snap).await.unwrap();
        assert_eq!(files_in(&data), vec![SNAPSHOT_FILE.to_string()]);
        assert_eq!(store.load().await.unwrap(), Some(snap));

        let raw = fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("\"start\": \"09:00\""));
    }

    #[test]
    fn abandoned_write_never_replaces_the_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SNAPSHOT_FILE);
        let lock = Mutex::new(());

        fs::write(&path, b"{}").unwrap();
        let written = write_atomically(dir.path(), &path, b"{\"clients\":[]}", &lock, &AtomicBool::new(true))
            .unwrap();
        assert!(!written);
        assert_eq!(fs::read(&path).unwrap(), b"{}");
        assert_eq!(files_in(dir.path()), vec![SNAPSHOT_FILE.to_string()]);

        let written = write_atomically(dir.path(), &path, b"{\"clients\":[]}", &lock, &AtomicBool::new(false))
            .unwrap();
        assert!(written);
        assert_eq!(fs::read(&path).unwrap(), b"{\"clients\":[]}");
    }

    #[test]
    fn dropping_an_unfinished_save_marks_it_abandoned() {
        let flag = Arc::new(AtomicBool::new(false));

        drop(AbandonOnDrop {
            flag: flag.clone(),
            armed: false,
        });
        assert!(!flag.load(Ordering::SeqCst));

        drop(AbandonOnDrop {
            flag: flag.clone(),
            armed: true,
        });
        assert!(flag.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn timed_out_save_leaves_the_last_confirmed_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        let confirmed = Snapshot::default();
        store.save(&confirmed).await.unwrap();

        let (services, staff) = default_catalog();
        let rejected = Snapshot {
            services,
            staff,
            ..Snapshot::default()
        };
        // hold the rename lock so the write cannot finish before the timeout
        let held = store.rename_lock.lock().unwrap();
        let res = tokio::time::timeout(std::time::Duration::from_millis(50), store.save(&rejected)).await;
        assert!(res.is_err());
        drop(held);

        // let the blocking write observe the abandon flag
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        assert_eq!(store.load().await.unwrap(), Some(confirmed));
        assert_eq!(files_in(dir.path()), vec![SNAPSHOT_FILE.to_string()]);
    }

    #[tokio::test]
    async fn corrupt_document_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        fs::write(store.path(), b"{ not json").unwrap();
        assert!(matches!(store.load().await, Err(StorageError::Json(_))));
    }
}
