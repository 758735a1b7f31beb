// src/lib.rs

//! Appointment scheduling core for a medical spa.
//!
//! Catalog (services, staff), client registry, appointment ledger and the
//! availability engine, all operating on one [`models::Snapshot`]. The
//! [`store::SpaStore`] owns the live snapshot, serializes writers and persists
//! every change through a [`storage::SnapshotStore`] before it becomes visible.

pub mod availability;
pub mod catalog;
pub mod clients;
pub mod config;
pub mod error;
pub mod ledger;
pub mod models;
pub mod storage;
pub mod store;

pub use error::{ErrorKind, Result, SchedulingError, StorageError};
pub use store::{SpaStore, StoreOptions};
