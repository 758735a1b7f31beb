// src/availability.rs
//
// Free-time computation. Everything here is a pure function over a snapshot
// borrow; nothing writes.

use chrono::{NaiveDate, NaiveTime};

use crate::catalog;
use crate::error::{Result, SchedulingError};
use crate::models::{
    Appointment, AvailabilityQuery, Service, SlotOffer, Snapshot, StaffAvailability, StaffMember,
    TimeRange, minute_of_day, time_at_minute,
};

/// How many alternatives a slot conflict suggests.
pub const MAX_ALTERNATIVES: usize = 3;

/// Grid used when listing bookable start times.
pub const DEFAULT_SLOT_STEP_MINUTES: u32 = 30;

/// Visit length assumed when listing open slots without a service.
pub const DEFAULT_VISIT_MINUTES: u32 = 60;

/// Cap on listed open slots.
pub const DEFAULT_OPEN_SLOT_LIMIT: usize = 10;

const LAST_MINUTE: u32 = 24 * 60 - 1;

pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| SchedulingError::Validation("date must be YYYY-MM-DD".into()))
}

pub fn parse_time(raw: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .map_err(|_| SchedulingError::Validation("time must be HH:MM (24-hour)".into()))
}

/// Free gaps of `staff` on `date`, ascending.
///
/// The working window for the date's weekday is walked against every
/// non-cancelled appointment of that staff member on that date. Gaps shorter
/// than `min_minutes` are dropped; empty gaps are never returned.
pub fn free_gaps(
    staff: &StaffMember,
    date: NaiveDate,
    appointments: &[Appointment],
    min_minutes: Option<u32>,
) -> Vec<TimeRange> {
    let Some(window) = staff.hours_on(date) else {
        return Vec::new();
    };
    let (window_start, window_end) = (minute_of_day(window.start), minute_of_day(window.end));

    let mut booked: Vec<(u32, u32)> = appointments
        .iter()
        .filter(|a| a.staff_id == staff.id && a.date == date && a.status.blocks_slot())
        .map(|a| (a.start_minute(), a.end_minute()))
        .collect();
    booked.sort_unstable();

    let mut raw: Vec<(u32, u32)> = Vec::new();
    let mut cursor = window_start;
    for (start, end) in booked {
        if cursor >= window_end {
            break;
        }
        if start > cursor {
            raw.push((cursor, start.min(window_end)));
        }
        cursor = cursor.max(end);
    }
    if cursor < window_end {
        raw.push((cursor, window_end));
    }

    let min = min_minutes.unwrap_or(1).max(1);
    raw.into_iter()
        .filter(|(s, e)| e - s >= min)
        .filter_map(|(s, e)| {
            Some(TimeRange {
                start: time_at_minute(s)?,
                end: time_at_minute(e)?,
            })
        })
        .collect()
}

/// Availability for one date, per staff member.
///
/// With a staff id only that member is reported. Otherwise every member able
/// to perform the given service, or the whole staff when no service is named.
pub fn availability(snap: &Snapshot, query: &AvailabilityQuery) -> Result<Vec<StaffAvailability>> {
    let service = query
        .service_id
        .as_deref()
        .map(|id| catalog::service(snap, id))
        .transpose()?;

    let members: Vec<&StaffMember> = match (query.staff_id.as_deref(), service) {
        (Some(staff_id), service) => {
            let member = catalog::staff_member(snap, staff_id)?;
            if let Some(svc) = service {
                ensure_specialty(member, svc)?;
            }
            vec![member]
        }
        (None, Some(svc)) => catalog::qualified_staff(snap, &svc.category),
        (None, None) => snap.staff.iter().collect(),
    };

    let min_minutes = service.map(|s| s.duration_minutes);
    Ok(members
        .into_iter()
        .map(|m| StaffAvailability {
            staff_id: m.id.clone(),
            staff_name: m.name.clone(),
            working_hours: m.hours_on(query.date),
            free: free_gaps(m, query.date, &snap.appointments, min_minutes),
        })
        .collect())
}

pub fn ensure_specialty(staff: &StaffMember, service: &Service) -> Result<()> {
    if staff.has_specialty(&service.category) {
        Ok(())
    } else {
        Err(SchedulingError::SpecialtyMismatch {
            staff_id: staff.id.clone(),
            category: service.category.clone(),
        })
    }
}

/// Accepts `[time, time + duration)` only if it fits inside one free gap.
/// A rejection carries the nearest gaps that could host the service instead.
pub fn check_slot(
    snap: &Snapshot,
    staff: &StaffMember,
    service: &Service,
    date: NaiveDate,
    time: NaiveTime,
) -> Result<()> {
    let start = minute_of_day(time);
    let end = start + service.duration_minutes;
    let gaps = free_gaps(staff, date, &snap.appointments, Some(service.duration_minutes));

    if gaps.iter().any(|g| g.contains(start, end)) {
        return Ok(());
    }

    Err(SchedulingError::SlotConflict {
        staff_id: staff.id.clone(),
        date,
        start: time,
        end: time_at_minute(end.min(LAST_MINUTE)).unwrap_or(time),
        alternatives: nearest_gaps(&gaps, start, service.duration_minutes, MAX_ALTERNATIVES),
    })
}

/// Up to `limit` gaps closest to `start_minute`, returned in time order.
///
/// Distance is measured to the closest start inside the gap that still leaves
/// room for `duration` minutes.
pub fn nearest_gaps(
    gaps: &[TimeRange],
    start_minute: u32,
    duration: u32,
    limit: usize,
) -> Vec<TimeRange> {
    let mut ranked: Vec<(u32, TimeRange)> = gaps
        .iter()
        .filter(|g| g.minutes() >= duration)
        .map(|g| {
            let first = minute_of_day(g.start);
            let last = minute_of_day(g.end) - duration;
            let distance = if start_minute < first {
                first - start_minute
            } else if start_minute > last {
                start_minute - last
            } else {
                0
            };
            (distance, *g)
        })
        .collect();

    ranked.sort_by_key(|(d, g)| (*d, g.start));
    ranked.truncate(limit);
    ranked.sort_by_key(|(_, g)| g.start);
    ranked.into_iter().map(|(_, g)| g).collect()
}

/// Bookable start times across the staff selected by `query`, staff by staff,
/// capped at `limit`. Without a service the visit length is
/// [`DEFAULT_VISIT_MINUTES`].
pub fn open_slots(
    snap: &Snapshot,
    query: &AvailabilityQuery,
    step: u32,
    limit: usize,
) -> Result<Vec<SlotOffer>> {
    let duration = match query.service_id.as_deref() {
        Some(id) => catalog::service(snap, id)?.duration_minutes,
        None => DEFAULT_VISIT_MINUTES,
    };

    let mut offers = Vec::new();
    for staff in availability(snap, query)? {
        let remaining = limit - offers.len();
        if remaining == 0 {
            break;
        }
        offers.extend(
            slot_starts(&staff.free, duration, step, remaining)
                .into_iter()
                .map(|time| SlotOffer {
                    time,
                    staff_id: staff.staff_id.clone(),
                    staff_name: staff.staff_name.clone(),
                }),
        );
    }
    Ok(offers)
}

/// Bookable start times on a `step`-minute grid anchored at each gap start.
pub fn slot_starts(gaps: &[TimeRange], duration: u32, step: u32, limit: usize) -> Vec<NaiveTime> {
    let step = step.max(1);
    let mut out = Vec::new();

    for gap in gaps {
        let end = minute_of_day(gap.end);
        let mut cursor = minute_of_day(gap.start);
        while cursor + duration <= end {
            if out.len() == limit {
                return out;
            }
            if let Some(t) = time_at_minute(cursor) {
                out.push(t);
            }
            cursor += step;
        }
    }
    out
}
