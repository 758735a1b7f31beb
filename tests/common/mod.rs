#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use medspa_scheduler::models::{BookingRequest, NewClient, Snapshot};
use medspa_scheduler::storage::{MemoryStore, SnapshotStore};
use medspa_scheduler::{SpaStore, StorageError, StoreOptions};

/// 2026-10-19, a Monday. STF001 works 09:00-17:00.
pub fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
}

pub fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

pub fn booking(client: &str, service: &str, staff: &str, time: NaiveTime) -> BookingRequest {
    BookingRequest {
        client_id: client.into(),
        service_id: service.into(),
        staff_id: staff.into(),
        date: monday(),
        time,
        notes: String::new(),
    }
}

pub fn new_client(name: &str, phone: &str) -> NewClient {
    NewClient {
        name: name.into(),
        phone: phone.into(),
        ..NewClient::default()
    }
}

pub fn options() -> StoreOptions {
    StoreOptions {
        storage_timeout: Duration::from_millis(200),
        seed_default_catalog: true,
    }
}

/// Seeded store on a memory backend with one client, CL0001.
pub async fn seeded_store() -> (SpaStore, Arc<MemoryStore>) {
    let backend = Arc::new(MemoryStore::new());
    let store = SpaStore::open(backend.clone(), options()).await.unwrap();
    store
        .add_client(new_client("Ana Lopez", "305-555-0100"))
        .await
        .unwrap();
    (store, backend)
}

/// Memory backend whose saves can be made to fail or hang on demand.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    pub fail_saves: AtomicBool,
    pub hang_saves: AtomicBool,
    pub saves: AtomicUsize,
}

impl FlakyStore {
    pub fn set_failing(&self, on: bool) {
        self.fail_saves.store(on, Ordering::SeqCst);
    }

    pub fn set_hanging(&self, on: bool) {
        self.hang_saves.store(on, Ordering::SeqCst);
    }

    pub async fn saved(&self) -> Option<Snapshot> {
        self.inner.saved().await
    }
}

#[async_trait]
impl SnapshotStore for FlakyStore {
    async fn load(&self) -> Result<Option<Snapshot>, StorageError> {
        self.inner.load().await
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<(), StorageError> {
        if self.hang_saves.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(std::io::Error::other("disk full").into());
        }
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.inner.save(snapshot).await
    }

    fn describe(&self) -> String {
        "flaky".to_string()
    }
}
