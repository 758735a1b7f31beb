// src/models.rs

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};

/* -------------------------
   Catalog
--------------------------*/

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    pub name: String,
    pub category: String,
    pub duration_minutes: u32,
    pub price_cents: i64,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingDay {
    pub day: Weekday,
    #[serde(with = "hhmm")]
    pub start: NaiveTime,
    #[serde(with = "hhmm")]
    pub end: NaiveTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffMember {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub role: String,
    pub specialties: Vec<String>,
    pub working_hours: Vec<WorkingDay>,
}

impl StaffMember {
    pub fn has_specialty(&self, category: &str) -> bool {
        self.specialties.iter().any(|s| s.eq_ignore_ascii_case(category))
    }

    /// Working window for the weekday of `date`, if the staff member works that day.
    pub fn hours_on(&self, date: NaiveDate) -> Option<TimeRange> {
        use chrono::Datelike;

        let weekday = date.weekday();
        self.working_hours
            .iter()
            .find(|w| w.day == weekday)
            .filter(|w| w.end > w.start)
            .map(|w| TimeRange {
                start: w.start,
                end: w.end,
            })
    }
}

/* -------------------------
   Clients
--------------------------*/

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: String,
    pub phone: String,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub emergency_contact: String,
    #[serde(default)]
    pub medical_notes: String,
    #[serde(default)]
    pub total_visits: u32,
    #[serde(default)]
    pub total_spent_cents: i64,
    #[serde(default)]
    pub archived: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewClient {
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub email: String,
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub emergency_contact: String,
    #[serde(default)]
    pub medical_notes: String,
}

/* -------------------------
   Appointments
--------------------------*/

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AppointmentStatus {
    Scheduled,
    Completed,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, AppointmentStatus::Scheduled)
    }

    /// Only a scheduled appointment may move, and only to a terminal status.
    pub fn can_transition_to(self, next: AppointmentStatus) -> bool {
        matches!(self, AppointmentStatus::Scheduled) && next.is_terminal()
    }

    /// Whether an appointment in this status still occupies its time range.
    pub fn blocks_slot(self) -> bool {
        !matches!(self, AppointmentStatus::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::NoShow => "no-show",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AppointmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "scheduled" => Ok(AppointmentStatus::Scheduled),
            "completed" => Ok(AppointmentStatus::Completed),
            "cancelled" | "canceled" => Ok(AppointmentStatus::Cancelled),
            "no-show" | "no_show" | "noshow" => Ok(AppointmentStatus::NoShow),
            other => Err(format!(
                "invalid status '{other}', must be one of: scheduled, completed, cancelled, no-show"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: String,
    pub client_id: String,
    pub service_id: String,
    pub staff_id: String,
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
    pub duration_minutes: u32, // copied from the service when booked
    pub price_cents: i64,      // same
    pub status: AppointmentStatus,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub cancellation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Appointment {
    pub fn start_minute(&self) -> u32 {
        minute_of_day(self.time)
    }

    pub fn end_minute(&self) -> u32 {
        self.start_minute() + self.duration_minutes
    }
}

/* -------------------------
   Requests / results
--------------------------*/

#[derive(Debug, Clone, Deserialize)]
pub struct BookingRequest {
    pub client_id: String,
    pub service_id: String,
    pub staff_id: String,
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
    #[serde(default)]
    pub notes: String,
}

/// Booking as it arrives from a phone caller: the service is named loosely and
/// the client is recognized by phone number instead of id.
#[derive(Debug, Clone, Deserialize)]
pub struct CallerBookingRequest {
    pub service_query: String,
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
    pub client_name: String,
    pub client_phone: String,
    #[serde(default)]
    pub client_email: String,
    pub staff_id: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CallerBooking {
    pub appointment: Appointment,
    pub client: Client,
    pub new_client: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AvailabilityQuery {
    pub date: NaiveDate,
    pub staff_id: Option<String>,
    pub service_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppointmentFilter {
    pub date: Option<NaiveDate>,
    pub client_id: Option<String>,
    pub staff_id: Option<String>,
    pub status: Option<AppointmentStatus>,
}

impl AppointmentFilter {
    pub fn matches(&self, a: &Appointment) -> bool {
        self.date.is_none_or(|d| a.date == d)
            && self.client_id.as_deref().is_none_or(|c| a.client_id == c)
            && self.staff_id.as_deref().is_none_or(|s| a.staff_id == s)
            && self.status.is_none_or(|s| a.status == s)
    }
}

/// Half-open time interval `[start, end)` within one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    #[serde(with = "hhmm")]
    pub start: NaiveTime,
    #[serde(with = "hhmm")]
    pub end: NaiveTime,
}

impl TimeRange {
    pub fn minutes(&self) -> u32 {
        minute_of_day(self.end).saturating_sub(minute_of_day(self.start))
    }

    pub fn contains(&self, start_minute: u32, end_minute: u32) -> bool {
        minute_of_day(self.start) <= start_minute && end_minute <= minute_of_day(self.end)
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}",
            self.start.format("%H:%M"),
            self.end.format("%H:%M")
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StaffAvailability {
    pub staff_id: String,
    pub staff_name: String,
    pub working_hours: Option<TimeRange>,
    pub free: Vec<TimeRange>,
}

/// One bookable start time, as read out to a caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotOffer {
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
    pub staff_id: String,
    pub staff_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DailySchedule {
    pub date: NaiveDate,
    pub appointments: Vec<Appointment>,
    pub expected_revenue_cents: i64,
}

/* -------------------------
   Snapshot
--------------------------*/

/// The whole dataset. Storage backends load and save it as one unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub services: Vec<Service>,
    #[serde(default)]
    pub staff: Vec<StaffMember>,
    #[serde(default)]
    pub clients: Vec<Client>,
    #[serde(default)]
    pub appointments: Vec<Appointment>,
}

impl Snapshot {
    pub fn service(&self, id: &str) -> Option<&Service> {
        self.services.iter().find(|s| s.id == id)
    }

    pub fn staff_member(&self, id: &str) -> Option<&StaffMember> {
        self.staff.iter().find(|s| s.id == id)
    }

    pub fn client(&self, id: &str) -> Option<&Client> {
        self.clients.iter().find(|c| c.id == id)
    }

    pub fn appointment(&self, id: &str) -> Option<&Appointment> {
        self.appointments.iter().find(|a| a.id == id)
    }

    pub fn next_client_id(&self) -> String {
        format!("CL{:04}", next_seq(self.clients.iter().map(|c| c.id.as_str()), "CL"))
    }

    pub fn next_appointment_id(&self) -> String {
        format!(
            "APT{:04}",
            next_seq(self.appointments.iter().map(|a| a.id.as_str()), "APT")
        )
    }
}

fn next_seq<'a>(ids: impl Iterator<Item = &'a str>, prefix: &str) -> u64 {
    ids.filter_map(|id| id.strip_prefix(prefix)?.parse::<u64>().ok())
        .max()
        .unwrap_or(0)
        + 1
}

/* -------------------------
   Helpers
--------------------------*/

pub fn minute_of_day(t: NaiveTime) -> u32 {
    t.hour() * 60 + t.minute()
}

/// Inverse of [`minute_of_day`]; `None` past the end of the day.
pub fn time_at_minute(minute: u32) -> Option<NaiveTime> {
    NaiveTime::from_hms_opt(minute / 60, minute % 60, 0)
}

/// Times travel as `HH:MM`; seconds are accepted on input and dropped.
pub mod hhmm {
    use chrono::{NaiveTime, Timelike};
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(t: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&t.format("%H:%M"))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(d)?;
        let raw = raw.trim();
        NaiveTime::parse_from_str(raw, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
            .map(|t| t.with_second(0).unwrap_or(t))
            .map_err(|_| D::Error::custom(format!("time must be HH:MM, got '{raw}'")))
    }
}
