// src/clients.rs

use chrono::{DateTime, Utc};

use crate::error::{Result, SchedulingError};
use crate::models::{Appointment, Client, NewClient, Snapshot};

/// Phones compare by digits only, without a leading US country code:
/// "(305) 555-0100" == "305.555.0100" == "+1 305 555 0100".
pub fn normalize_phone(raw: &str) -> String {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    match digits.strip_prefix('1') {
        Some(national) if digits.len() == 11 => national.to_string(),
        _ => digits,
    }
}

pub fn get<'a>(snap: &'a Snapshot, client_id: &str) -> Result<&'a Client> {
    snap.client(client_id)
        .ok_or_else(|| SchedulingError::ClientNotFound(client_id.to_string()))
}

/// Like [`get`], but archived clients count as unknown.
pub fn get_active<'a>(snap: &'a Snapshot, client_id: &str) -> Result<&'a Client> {
    get(snap, client_id).and_then(|c| {
        if c.archived {
            Err(SchedulingError::ClientNotFound(client_id.to_string()))
        } else {
            Ok(c)
        }
    })
}

pub fn find_by_phone<'a>(snap: &'a Snapshot, phone: &str) -> Option<&'a Client> {
    let wanted = normalize_phone(phone);
    if wanted.is_empty() {
        return None;
    }
    snap.clients
        .iter()
        .find(|c| !c.archived && normalize_phone(&c.phone) == wanted)
}

/// Case-insensitive substring match on name or email, sorted by name.
pub fn search<'a>(snap: &'a Snapshot, query: &str) -> Vec<&'a Client> {
    let q = query.trim().to_lowercase();
    let mut found: Vec<&Client> = snap
        .clients
        .iter()
        .filter(|c| !c.archived)
        .filter(|c| {
            q.is_empty() || c.name.to_lowercase().contains(&q) || c.email.to_lowercase().contains(&q)
        })
        .collect();
    found.sort_by(|a, b| a.name.cmp(&b.name));
    found
}

/// The client's appointments, newest first.
pub fn history<'a>(snap: &'a Snapshot, client_id: &str) -> Result<Vec<&'a Appointment>> {
    get(snap, client_id)?;
    let mut appts: Vec<&Appointment> = snap
        .appointments
        .iter()
        .filter(|a| a.client_id == client_id)
        .collect();
    appts.sort_by(|a, b| (b.date, b.time).cmp(&(a.date, a.time)));
    Ok(appts)
}

pub fn add(snap: &mut Snapshot, new: NewClient, now: DateTime<Utc>) -> Result<Client> {
    let name = new.name.trim();
    if name.is_empty() {
        return Err(SchedulingError::Validation("client name is required".into()));
    }
    if normalize_phone(&new.phone).is_empty() {
        return Err(SchedulingError::Validation("client phone is required".into()));
    }
    ensure_phone_free(snap, &new.phone, None)?;

    let client = Client {
        id: snap.next_client_id(),
        name: name.to_string(),
        email: new.email.trim().to_string(),
        phone: new.phone.trim().to_string(),
        date_of_birth: new.date_of_birth,
        address: new.address,
        emergency_contact: new.emergency_contact,
        medical_notes: new.medical_notes,
        total_visits: 0,
        total_spent_cents: 0,
        archived: false,
        created_at: now,
    };
    snap.clients.push(client.clone());
    Ok(client)
}

pub fn archive(snap: &mut Snapshot, client_id: &str) -> Result<Client> {
    let client = get_mut(snap, client_id)?;
    client.archived = true;
    Ok(client.clone())
}

/// Fails with DuplicatePhone when another active client took the number meanwhile.
pub fn restore(snap: &mut Snapshot, client_id: &str) -> Result<Client> {
    let phone = get(snap, client_id)?.phone.clone();
    ensure_phone_free(snap, &phone, Some(client_id))?;

    let client = get_mut(snap, client_id)?;
    client.archived = false;
    Ok(client.clone())
}

pub(crate) fn get_mut<'a>(snap: &'a mut Snapshot, client_id: &str) -> Result<&'a mut Client> {
    snap.clients
        .iter_mut()
        .find(|c| c.id == client_id)
        .ok_or_else(|| SchedulingError::ClientNotFound(client_id.to_string()))
}

fn ensure_phone_free(snap: &Snapshot, phone: &str, except: Option<&str>) -> Result<()> {
    match find_by_phone(snap, phone) {
        Some(existing) if Some(existing.id.as_str()) != except => Err(SchedulingError::DuplicatePhone {
            phone: phone.trim().to_string(),
            existing_client_id: existing.id.clone(),
        }),
        _ => Ok(()),
    }
}
