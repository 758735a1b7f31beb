// src/error.rs

use std::time::Duration;

use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use thiserror::Error;

use crate::models::{AppointmentStatus, TimeRange};

pub type Result<T> = std::result::Result<T, SchedulingError>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot encoding error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("db error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("storage {op} timed out after {}ms", .after.as_millis())]
    Timeout { op: &'static str, after: Duration },
}

#[derive(Debug, Error)]
pub enum SchedulingError {
    #[error("client {0} not found")]
    ClientNotFound(String),
    #[error("service {0} not found")]
    ServiceNotFound(String),
    #[error("staff member {0} not found")]
    StaffNotFound(String),
    #[error("appointment {0} not found")]
    AppointmentNotFound(String),
    #[error("{staff_id} is not free on {date} from {} to {}", .start.format("%H:%M"), .end.format("%H:%M"))]
    SlotConflict {
        staff_id: String,
        date: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
        alternatives: Vec<TimeRange>,
    },
    #[error("staff member {staff_id} does not perform {category} services")]
    SpecialtyMismatch { staff_id: String, category: String },
    #[error("appointment {appointment_id} cannot move from {from} to {to}")]
    InvalidTransition {
        appointment_id: String,
        from: AppointmentStatus,
        to: AppointmentStatus,
    },
    #[error("phone {phone} already belongs to client {existing_client_id}")]
    DuplicatePhone {
        phone: String,
        existing_client_id: String,
    },
    #[error("{0}")]
    Validation(String),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Coarse classification callers can match on without caring about payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    NotFound,
    SlotConflict,
    SpecialtyMismatch,
    InvalidTransition,
    DuplicatePhone,
    Validation,
    Storage,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorObject,
}

#[derive(Debug, Serialize)]
pub struct ErrorObject {
    pub code: String,
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub alternatives: Vec<TimeRange>,
}

impl SchedulingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SchedulingError::ClientNotFound(_)
            | SchedulingError::ServiceNotFound(_)
            | SchedulingError::StaffNotFound(_)
            | SchedulingError::AppointmentNotFound(_) => ErrorKind::NotFound,
            SchedulingError::SlotConflict { .. } => ErrorKind::SlotConflict,
            SchedulingError::SpecialtyMismatch { .. } => ErrorKind::SpecialtyMismatch,
            SchedulingError::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            SchedulingError::DuplicatePhone { .. } => ErrorKind::DuplicatePhone,
            SchedulingError::Validation(_) => ErrorKind::Validation,
            SchedulingError::Storage(_) => ErrorKind::Storage,
        }
    }

    /// Stable code for transports; never changes with the message text.
    pub fn code(&self) -> &'static str {
        match self {
            SchedulingError::ClientNotFound(_) => "CLIENT_NOT_FOUND",
            SchedulingError::ServiceNotFound(_) => "SERVICE_NOT_FOUND",
            SchedulingError::StaffNotFound(_) => "STAFF_NOT_FOUND",
            SchedulingError::AppointmentNotFound(_) => "APPOINTMENT_NOT_FOUND",
            SchedulingError::SlotConflict { .. } => "SLOT_CONFLICT",
            SchedulingError::SpecialtyMismatch { .. } => "SPECIALTY_MISMATCH",
            SchedulingError::InvalidTransition { .. } => "INVALID_TRANSITION",
            SchedulingError::DuplicatePhone { .. } => "DUPLICATE_PHONE",
            SchedulingError::Validation(_) => "VALIDATION_ERROR",
            SchedulingError::Storage(StorageError::Timeout { .. }) => "STORAGE_TIMEOUT",
            SchedulingError::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// Alternatives suggested alongside a slot conflict; empty for every other error.
    pub fn alternatives(&self) -> &[TimeRange] {
        match self {
            SchedulingError::SlotConflict { alternatives, .. } => alternatives,
            _ => &[],
        }
    }

    pub fn to_error_response(&self) -> ErrorResponse {
        ErrorResponse {
            error: ErrorObject {
                code: self.code().to_string(),
                kind: self.kind(),
                message: self.to_string(),
                alternatives: self.alternatives().to_vec(),
            },
        }
    }
}
