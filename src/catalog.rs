// src/catalog.rs

use chrono::{NaiveTime, Weekday};

use crate::error::{Result, SchedulingError};
use crate::models::{Service, Snapshot, StaffMember, WorkingDay};

pub fn services<'a>(snap: &'a Snapshot, category: Option<&str>) -> Vec<&'a Service> {
    snap.services
        .iter()
        .filter(|s| category.is_none_or(|c| s.category.eq_ignore_ascii_case(c.trim())))
        .collect()
}

pub fn service<'a>(snap: &'a Snapshot, service_id: &str) -> Result<&'a Service> {
    snap.service(service_id)
        .ok_or_else(|| SchedulingError::ServiceNotFound(service_id.to_string()))
}

pub fn staff<'a>(snap: &'a Snapshot, specialty: Option<&str>) -> Vec<&'a StaffMember> {
    snap.staff
        .iter()
        .filter(|s| specialty.is_none_or(|sp| s.has_specialty(sp.trim())))
        .collect()
}

pub fn staff_member<'a>(snap: &'a Snapshot, staff_id: &str) -> Result<&'a StaffMember> {
    snap.staff_member(staff_id)
        .ok_or_else(|| SchedulingError::StaffNotFound(staff_id.to_string()))
}

/// Staff allowed to perform services of `category`, in catalog order.
pub fn qualified_staff<'a>(snap: &'a Snapshot, category: &str) -> Vec<&'a StaffMember> {
    staff(snap, Some(category))
}

/// Loose lookup for spoken requests like "botox" or "facial".
/// Name matches win over category matches.
pub fn search_service<'a>(snap: &'a Snapshot, query: &str) -> Option<&'a Service> {
    let q = query.trim().to_lowercase();
    if q.is_empty() {
        return None;
    }

    snap.services
        .iter()
        .find(|s| s.name.to_lowercase().contains(&q))
        .or_else(|| {
            snap.services
                .iter()
                .find(|s| s.category.to_lowercase().contains(&q))
        })
}

/* -------------------------
   Default catalog
--------------------------*/

pub fn default_catalog() -> (Vec<Service>, Vec<StaffMember>) {
    let svc = |id: &str, name: &str, category: &str, minutes: u32, dollars: i64, desc: &str| Service {
        id: id.into(),
        name: name.into(),
        category: category.into(),
        duration_minutes: minutes,
        price_cents: dollars * 100,
        description: desc.into(),
    };

    let services = vec![
        svc("SVC001", "Botox Treatment", "Injectables", 30, 400, "Wrinkle reduction with Botox injections"),
        svc("SVC002", "Dermal Fillers", "Injectables", 45, 650, "Volume restoration with hyaluronic acid fillers"),
        svc("SVC003", "Hydrafacial", "Facials", 60, 250, "Deep cleansing and hydration facial treatment"),
        svc("SVC004", "Laser Hair Removal", "Laser Treatments", 30, 300, "Permanent hair reduction using laser technology"),
        svc("SVC005", "Chemical Peel", "Skin Treatments", 45, 200, "Skin resurfacing treatment for improved texture and tone"),
        svc("SVC006", "Microneedling", "Skin Treatments", 60, 350, "Collagen induction therapy for skin rejuvenation"),
        svc("SVC007", "CoolSculpting", "Body Contouring", 90, 800, "Non-invasive fat reduction treatment"),
    ];

    let staff = vec![
        StaffMember {
            id: "STF001".into(),
            name: "Dr. Maria Rodriguez".into(),
            role: "Medical Director".into(),
            specialties: vec!["Injectables".into(), "Laser Treatments".into()],
            working_hours: week(
                &[Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri],
                (9, 0),
                (17, 0),
            ),
        },
        StaffMember {
            id: "STF002".into(),
            name: "Sarah Johnson".into(),
            role: "Licensed Aesthetician".into(),
            specialties: vec!["Facials".into(), "Skin Treatments".into()],
            working_hours: week(
                &[Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri, Weekday::Sat],
                (10, 0),
                (18, 0),
            ),
        },
        StaffMember {
            id: "STF003".into(),
            name: "Jennifer Martinez".into(),
            role: "Nurse Practitioner".into(),
            specialties: vec!["Injectables".into(), "Body Contouring".into()],
            working_hours: week(
                &[Weekday::Mon, Weekday::Wed, Weekday::Fri, Weekday::Sat],
                (9, 0),
                (17, 0),
            ),
        },
    ];

    (services, staff)
}

fn week(days: &[Weekday], start: (u32, u32), end: (u32, u32)) -> Vec<WorkingDay> {
    let at = |(h, m): (u32, u32)| NaiveTime::from_hms_opt(h, m, 0).unwrap_or(NaiveTime::MIN);
    days.iter()
        .map(|&day| WorkingDay {
            day,
            start: at(start),
            end: at(end),
        })
        .collect()
}
