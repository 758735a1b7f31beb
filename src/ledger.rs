// src/ledger.rs

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

use crate::availability;
use crate::catalog;
use crate::clients;
use crate::error::{Result, SchedulingError};
use crate::models::{
    Appointment, AppointmentFilter, AppointmentStatus, BookingRequest, CallerBooking,
    CallerBookingRequest, DailySchedule, NewClient, Service, Snapshot,
};

/* ============================================================
   Booking
   ============================================================ */

/// Validates and records a new appointment in `snap`.
///
/// Checks run in a fixed order: client, service, staff, specialty, slot. The
/// specialty check comes before the slot check so an unqualified staff member
/// is reported as such even on an empty day.
pub fn book(snap: &mut Snapshot, req: BookingRequest, now: DateTime<Utc>) -> Result<Appointment> {
    clients::get_active(snap, &req.client_id)?;
    let service = catalog::service(snap, &req.service_id)?;
    let staff = catalog::staff_member(snap, &req.staff_id)?;

    if service.duration_minutes == 0 {
        return Err(SchedulingError::Validation(format!(
            "service {} has no duration",
            service.id
        )));
    }
    availability::ensure_specialty(staff, service)?;
    availability::check_slot(snap, staff, service, req.date, req.time)?;

    let appointment = Appointment {
        id: snap.next_appointment_id(),
        client_id: req.client_id,
        service_id: req.service_id,
        staff_id: req.staff_id,
        date: req.date,
        time: req.time,
        duration_minutes: service.duration_minutes,
        price_cents: service.price_cents,
        status: AppointmentStatus::Scheduled,
        notes: req.notes.trim().to_string(),
        cancellation_reason: None,
        created_at: now,
        updated_at: None,
    };
    snap.appointments.push(appointment.clone());
    Ok(appointment)
}

/// Booking for a phone caller: fuzzy service lookup, client recognized by
/// phone (registered when unknown), staff picked when not named.
///
/// Runs against a working copy; if anything fails the caller discards it, so
/// a failed booking never leaves a freshly registered client behind.
pub fn book_for_caller(
    snap: &mut Snapshot,
    req: CallerBookingRequest,
    now: DateTime<Utc>,
) -> Result<CallerBooking> {
    let service = catalog::search_service(snap, &req.service_query)
        .cloned()
        .ok_or_else(|| SchedulingError::ServiceNotFound(req.service_query.trim().to_string()))?;

    let (client, new_client) = match clients::find_by_phone(snap, &req.client_phone).cloned() {
        Some(existing) => (existing, false),
        None => {
            let registered = clients::add(
                snap,
                NewClient {
                    name: req.client_name,
                    phone: req.client_phone,
                    email: req.client_email,
                    ..NewClient::default()
                },
                now,
            )?;
            (registered, true)
        }
    };

    let staff_id = match req.staff_id {
        Some(id) => id,
        None => pick_staff(snap, &service, req.date, req.time)?,
    };

    let appointment = book(
        snap,
        BookingRequest {
            client_id: client.id.clone(),
            service_id: service.id,
            staff_id,
            date: req.date,
            time: req.time,
            notes: req.notes.unwrap_or_else(|| "Booked by phone".to_string()),
        },
        now,
    )?;

    Ok(CallerBooking {
        appointment,
        client,
        new_client,
    })
}

/// First qualified staff member (catalog order) free for the whole visit.
/// When nobody is free, the first qualified member's conflict is returned so
/// the caller still gets alternatives.
fn pick_staff(snap: &Snapshot, service: &Service, date: NaiveDate, time: NaiveTime) -> Result<String> {
    let qualified = catalog::qualified_staff(snap, &service.category);
    let mut first_conflict = None;

    for staff in qualified {
        match availability::check_slot(snap, staff, service, date, time) {
            Ok(()) => return Ok(staff.id.clone()),
            Err(e) => {
                first_conflict.get_or_insert(e);
            }
        }
    }

    Err(first_conflict.unwrap_or_else(|| {
        SchedulingError::Validation(format!(
            "no staff member performs {} services",
            service.category
        ))
    }))
}

/* ============================================================
   Status transitions
   ============================================================ */

/// Moves a scheduled appointment to a terminal status.
///
/// Completing credits the client with one visit and the price recorded at
/// booking time.
pub fn update_status(
    snap: &mut Snapshot,
    appointment_id: &str,
    status: AppointmentStatus,
    notes: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Appointment> {
    let current = get(snap, appointment_id)?;
    if !current.status.can_transition_to(status) {
        return Err(SchedulingError::InvalidTransition {
            appointment_id: appointment_id.to_string(),
            from: current.status,
            to: status,
        });
    }
    // nothing is touched until every reference resolves
    if status == AppointmentStatus::Completed {
        clients::get(snap, &current.client_id)?;
    }

    let appt = get_mut(snap, appointment_id)?;
    appt.status = status;
    appt.updated_at = Some(now);
    if let Some(n) = notes.map(str::trim).filter(|n| !n.is_empty()) {
        appt.notes = n.to_string();
    }
    let updated = appt.clone();

    if status == AppointmentStatus::Completed {
        let client = clients::get_mut(snap, &updated.client_id)?;
        client.total_visits += 1;
        client.total_spent_cents += updated.price_cents;
    }
    Ok(updated)
}

pub fn cancel(
    snap: &mut Snapshot,
    appointment_id: &str,
    reason: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Appointment> {
    update_status(snap, appointment_id, AppointmentStatus::Cancelled, None, now)?;

    let appt = get_mut(snap, appointment_id)?;
    appt.cancellation_reason = reason
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string);
    Ok(appt.clone())
}

/* ============================================================
   Reads
   ============================================================ */

pub fn get<'a>(snap: &'a Snapshot, appointment_id: &str) -> Result<&'a Appointment> {
    snap.appointment(appointment_id)
        .ok_or_else(|| SchedulingError::AppointmentNotFound(appointment_id.to_string()))
}

/// Appointments matching every set field of `filter`, in booking order.
pub fn list<'a>(snap: &'a Snapshot, filter: &AppointmentFilter) -> Vec<&'a Appointment> {
    snap.appointments.iter().filter(|a| filter.matches(a)).collect()
}

pub fn list_by_date(snap: &Snapshot, date: NaiveDate) -> Vec<&Appointment> {
    list(
        snap,
        &AppointmentFilter {
            date: Some(date),
            ..AppointmentFilter::default()
        },
    )
}

pub fn list_by_client<'a>(snap: &'a Snapshot, client_id: &str) -> Vec<&'a Appointment> {
    list(
        snap,
        &AppointmentFilter {
            client_id: Some(client_id.to_string()),
            ..AppointmentFilter::default()
        },
    )
}

pub fn list_by_status(snap: &Snapshot, status: AppointmentStatus) -> Vec<&Appointment> {
    list(
        snap,
        &AppointmentFilter {
            status: Some(status),
            ..AppointmentFilter::default()
        },
    )
}

/// Scheduled appointments of one date by start time, with the revenue they would bring.
pub fn daily_schedule(snap: &Snapshot, date: NaiveDate) -> DailySchedule {
    let mut appointments: Vec<Appointment> = snap
        .appointments
        .iter()
        .filter(|a| a.date == date && a.status == AppointmentStatus::Scheduled)
        .cloned()
        .collect();
    appointments.sort_by(|a, b| (a.time, &a.staff_id).cmp(&(b.time, &b.staff_id)));

    DailySchedule {
        date,
        expected_revenue_cents: appointments.iter().map(|a| a.price_cents).sum(),
        appointments,
    }
}

pub fn upcoming_for_staff<'a>(snap: &'a Snapshot, staff_id: &str) -> Result<Vec<&'a Appointment>> {
    catalog::staff_member(snap, staff_id)?;
    let mut appts: Vec<&Appointment> = snap
        .appointments
        .iter()
        .filter(|a| a.staff_id == staff_id && a.status == AppointmentStatus::Scheduled)
        .collect();
    appts.sort_by_key(|a| (a.date, a.time));
    Ok(appts)
}

fn get_mut<'a>(snap: &'a mut Snapshot, appointment_id: &str) -> Result<&'a mut Appointment> {
    snap.appointments
        .iter_mut()
        .find(|a| a.id == appointment_id)
        .ok_or_else(|| SchedulingError::AppointmentNotFound(appointment_id.to_string()))
}
