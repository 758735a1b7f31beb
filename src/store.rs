// src/store.rs

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::RwLock;

use crate::availability;
use crate::catalog;
use crate::clients;
use crate::config::Config;
use crate::error::{Result, SchedulingError, StorageError};
use crate::ledger;
use crate::models::{
    Appointment, AppointmentFilter, AppointmentStatus, AvailabilityQuery, BookingRequest,
    CallerBooking, CallerBookingRequest, Client, DailySchedule, NewClient, Service, SlotOffer,
    Snapshot, StaffAvailability, StaffMember,
};
use crate::storage::SnapshotStore;

#[derive(Clone, Debug)]
pub struct StoreOptions {
    pub storage_timeout: Duration,
    pub seed_default_catalog: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            storage_timeout: Duration::from_millis(2000),
            seed_default_catalog: true,
        }
    }
}

impl From<&Config> for StoreOptions {
    fn from(cfg: &Config) -> Self {
        Self {
            storage_timeout: cfg.storage_timeout,
            seed_default_catalog: cfg.seed_default_catalog,
        }
    }
}

/// Owner of the in-memory snapshot.
///
/// Every mutation holds the write lock across validate, mutate, save and
/// commit. The mutation runs on a clone; the clone replaces the live snapshot
/// only after the backend confirmed the save, so memory always equals the
/// last durable state. Reads take the read lock and wait behind a writer.
pub struct SpaStore {
    state: RwLock<Snapshot>,
    backend: Arc<dyn SnapshotStore>,
    storage_timeout: Duration,
}

impl SpaStore {
    pub async fn open(backend: Arc<dyn SnapshotStore>, options: StoreOptions) -> Result<Self> {
        let loaded = bounded("load", options.storage_timeout, backend.load())
            .await
            .inspect_err(|e| tracing::error!(backend = %backend.describe(), error = %e, "snapshot load failed"))?;

        let fresh = loaded.is_none();
        let snapshot = loaded.unwrap_or_default();
        tracing::info!(
            backend = %backend.describe(),
            fresh,
            services = snapshot.services.len(),
            staff = snapshot.staff.len(),
            clients = snapshot.clients.len(),
            appointments = snapshot.appointments.len(),
            "snapshot loaded"
        );

        let store = Self {
            state: RwLock::new(snapshot),
            backend,
            storage_timeout: options.storage_timeout,
        };
        if options.seed_default_catalog {
            store.seed_default_catalog().await?;
        }
        Ok(store)
    }

    pub async fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        let backend = cfg.open_backend().await?;
        Ok(Self::open(backend, StoreOptions::from(cfg)).await?)
    }

    /// Writes the default services and staff when the catalog is empty.
    /// Returns whether anything was written.
    pub async fn seed_default_catalog(&self) -> Result<bool> {
        self.mutate("seed_catalog", |snap, _| {
            if !snap.services.is_empty() || !snap.staff.is_empty() {
                return Ok(false);
            }
            let (services, staff) = catalog::default_catalog();
            snap.services = services;
            snap.staff = staff;
            Ok(true)
        })
        .await
    }

    /* ============================================================
       Catalog
       ============================================================ */

    pub async fn services(&self, category: Option<&str>) -> Vec<Service> {
        self.read(|s| catalog::services(s, category).into_iter().cloned().collect::<Vec<_>>())
            .await
    }

    pub async fn service(&self, service_id: &str) -> Result<Service> {
        self.read(|s| catalog::service(s, service_id).cloned()).await
    }

    pub async fn search_service(&self, query: &str) -> Option<Service> {
        self.read(|s| catalog::search_service(s, query).cloned()).await
    }

    pub async fn staff(&self, specialty: Option<&str>) -> Vec<StaffMember> {
        self.read(|s| catalog::staff(s, specialty).into_iter().cloned().collect::<Vec<_>>())
            .await
    }

    pub async fn staff_member(&self, staff_id: &str) -> Result<StaffMember> {
        self.read(|s| catalog::staff_member(s, staff_id).cloned()).await
    }

    /* ============================================================
       Clients
       ============================================================ */

    pub async fn client(&self, client_id: &str) -> Result<Client> {
        self.read(|s| clients::get(s, client_id).cloned()).await
    }

    pub async fn find_client_by_phone(&self, phone: &str) -> Option<Client> {
        self.read(|s| clients::find_by_phone(s, phone).cloned()).await
    }

    pub async fn search_clients(&self, query: &str) -> Vec<Client> {
        self.read(|s| clients::search(s, query).into_iter().cloned().collect::<Vec<_>>())
            .await
    }

    pub async fn client_history(&self, client_id: &str) -> Result<Vec<Appointment>> {
        self.read(|s| {
            clients::history(s, client_id).map(|appts| appts.into_iter().cloned().collect::<Vec<_>>())
        })
        .await
    }

    pub async fn add_client(&self, new: NewClient) -> Result<Client> {
        let client = self.mutate("add_client", |snap, now| clients::add(snap, new, now)).await?;
        tracing::info!(client_id = %client.id, "client registered");
        Ok(client)
    }

    pub async fn archive_client(&self, client_id: &str) -> Result<Client> {
        let client = self
            .mutate("archive_client", |snap, _| clients::archive(snap, client_id))
            .await?;
        tracing::info!(client_id = %client.id, "client archived");
        Ok(client)
    }

    pub async fn restore_client(&self, client_id: &str) -> Result<Client> {
        let client = self
            .mutate("restore_client", |snap, _| clients::restore(snap, client_id))
            .await?;
        tracing::info!(client_id = %client.id, "client restored");
        Ok(client)
    }

    /* ============================================================
       Availability
       ============================================================ */

    pub async fn availability(&self, query: &AvailabilityQuery) -> Result<Vec<StaffAvailability>> {
        self.read(|s| availability::availability(s, query)).await
    }

    pub async fn open_slots(&self, query: &AvailabilityQuery, limit: usize) -> Result<Vec<SlotOffer>> {
        self.read(|s| {
            availability::open_slots(s, query, availability::DEFAULT_SLOT_STEP_MINUTES, limit)
        })
        .await
    }

    /* ============================================================
       Appointments
       ============================================================ */

    pub async fn book(&self, req: BookingRequest) -> Result<Appointment> {
        let appt = self.mutate("book", |snap, now| ledger::book(snap, req, now)).await?;
        tracing::info!(
            appointment_id = %appt.id,
            client_id = %appt.client_id,
            staff_id = %appt.staff_id,
            date = %appt.date,
            time = %appt.time.format("%H:%M"),
            "appointment booked"
        );
        Ok(appt)
    }

    pub async fn book_for_caller(&self, req: CallerBookingRequest) -> Result<CallerBooking> {
        let booked = self
            .mutate("book_for_caller", |snap, now| ledger::book_for_caller(snap, req, now))
            .await?;
        tracing::info!(
            appointment_id = %booked.appointment.id,
            client_id = %booked.client.id,
            new_client = booked.new_client,
            staff_id = %booked.appointment.staff_id,
            "caller booking confirmed"
        );
        Ok(booked)
    }

    pub async fn update_status(
        &self,
        appointment_id: &str,
        status: AppointmentStatus,
        notes: Option<&str>,
    ) -> Result<Appointment> {
        let appt = self
            .mutate("update_status", |snap, now| {
                ledger::update_status(snap, appointment_id, status, notes, now)
            })
            .await?;
        tracing::info!(appointment_id = %appt.id, status = %appt.status, "appointment status updated");
        Ok(appt)
    }

    pub async fn cancel(&self, appointment_id: &str, reason: Option<&str>) -> Result<Appointment> {
        let appt = self
            .mutate("cancel", |snap, now| ledger::cancel(snap, appointment_id, reason, now))
            .await?;
        tracing::info!(appointment_id = %appt.id, "appointment cancelled");
        Ok(appt)
    }

    pub async fn appointment(&self, appointment_id: &str) -> Result<Appointment> {
        self.read(|s| ledger::get(s, appointment_id).cloned()).await
    }

    pub async fn appointments(&self, filter: &AppointmentFilter) -> Vec<Appointment> {
        self.read(|s| ledger::list(s, filter).into_iter().cloned().collect::<Vec<_>>())
            .await
    }

    pub async fn list_by_date(&self, date: NaiveDate) -> Vec<Appointment> {
        self.read(|s| ledger::list_by_date(s, date).into_iter().cloned().collect::<Vec<_>>())
            .await
    }

    pub async fn list_by_client(&self, client_id: &str) -> Vec<Appointment> {
        self.read(|s| ledger::list_by_client(s, client_id).into_iter().cloned().collect::<Vec<_>>())
            .await
    }

    pub async fn list_by_status(&self, status: AppointmentStatus) -> Vec<Appointment> {
        self.read(|s| ledger::list_by_status(s, status).into_iter().cloned().collect::<Vec<_>>())
            .await
    }

    pub async fn daily_schedule(&self, date: NaiveDate) -> DailySchedule {
        self.read(|s| ledger::daily_schedule(s, date)).await
    }

    pub async fn upcoming_for_staff(&self, staff_id: &str) -> Result<Vec<Appointment>> {
        self.read(|s| {
            ledger::upcoming_for_staff(s, staff_id)
                .map(|appts| appts.into_iter().cloned().collect::<Vec<_>>())
        })
        .await
    }

    /// Copy of the live snapshot.
    pub async fn snapshot(&self) -> Snapshot {
        self.read(Snapshot::clone).await
    }

    /* ============================================================
       Single-writer plumbing
       ============================================================ */

    async fn read<T>(&self, f: impl FnOnce(&Snapshot) -> T) -> T {
        let guard = self.state.read().await;
        tracing::debug!("snapshot read");
        f(&guard)
    }

    async fn mutate<T>(
        &self,
        op: &'static str,
        f: impl FnOnce(&mut Snapshot, DateTime<Utc>) -> Result<T>,
    ) -> Result<T> {
        let mut guard = self.state.write().await;
        let mut working = guard.clone();

        let out = f(&mut working, Utc::now()).inspect_err(|e| {
            tracing::warn!(op, code = e.code(), error = %e, "operation rejected");
        })?;

        if working == *guard {
            return Ok(out);
        }

        bounded("save", self.storage_timeout, self.backend.save(&working))
            .await
            .inspect_err(|e| {
                tracing::error!(op, backend = %self.backend.describe(), error = %e, "snapshot save failed, change discarded");
            })?;

        *guard = working;
        Ok(out)
    }
}

async fn bounded<T>(
    op: &'static str,
    after: Duration,
    fut: impl Future<Output = std::result::Result<T, StorageError>>,
) -> std::result::Result<T, SchedulingError> {
    match tokio::time::timeout(after, fut).await {
        Ok(res) => res.map_err(SchedulingError::from),
        Err(_) => Err(StorageError::Timeout { op, after }.into()),
    }
}
