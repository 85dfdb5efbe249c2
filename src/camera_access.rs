use std::collections::HashMap;

use chrono::{NaiveDateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{CameraAccessEntry, Caregiver, NewCameraAccessEntry, Patient};
use crate::patients;
use crate::schema::{camera_access, caregivers, patients as patients_table};

#[derive(Debug, Error)]
pub enum CameraAccessError {
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
}

pub type CameraAccessResult<T> = Result<T, CameraAccessError>;

/// Viewing permission for one caregiver on one patient's live feed.
/// Anything that is not explicitly "granted" normalizes to `Revoked`, so an
/// unknown or mangled status can never open the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessStatus {
    Granted,
    Revoked,
}

impl AccessStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AccessStatus::Granted => "granted",
            AccessStatus::Revoked => "revoked",
        }
    }

    pub fn from_input(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "granted" => AccessStatus::Granted,
            _ => AccessStatus::Revoked,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RequestOutcome {
    pub entry: CameraAccessEntry,
    pub already_pending: bool,
}

/// One row of the staff approval queue. Caregivers without an explicit
/// permission row appear with the revoked defaults.
#[derive(Debug, Clone)]
pub struct QueueEntry {
    pub patient_id: String,
    pub caregiver_id: Uuid,
    pub display_name: String,
    pub status: AccessStatus,
    pub pending_request: bool,
    pub requested_at: Option<NaiveDateTime>,
    pub updated_at: NaiveDateTime,
    pub camera_url: Option<String>,
}

/// Insert-if-absent with the fail-closed defaults. Safe to call on every
/// account creation and every request attempt.
pub fn ensure_entry(
    conn: &mut PgConnection,
    patient_id: &str,
    caregiver_id: Uuid,
    display_name: &str,
) -> CameraAccessResult<()> {
    let new_entry = NewCameraAccessEntry {
        patient_id: patient_id.to_string(),
        caregiver_id,
        display_name: display_name.to_string(),
        status: AccessStatus::Revoked.as_str().to_string(),
        pending_request: false,
    };

    diesel::insert_into(camera_access::table)
        .values(&new_entry)
        .on_conflict((camera_access::patient_id, camera_access::caregiver_id))
        .do_nothing()
        .execute(conn)?;

    Ok(())
}

/// Records a caregiver's viewing request. If a request is already pending the
/// row is returned untouched with `already_pending = true` -- repeated client
/// polling must not refresh `requested_at` or re-notify staff.
pub fn record_request(
    conn: &mut PgConnection,
    patient_id: &str,
    caregiver_id: Uuid,
    display_name: &str,
) -> CameraAccessResult<RequestOutcome> {
    conn.transaction::<RequestOutcome, CameraAccessError, _>(|conn| {
        ensure_entry(conn, patient_id, caregiver_id, display_name)?;

        let entry: CameraAccessEntry = camera_access::table
            .find((patient_id, caregiver_id))
            .for_update()
            .first(conn)?;

        if entry.pending_request {
            return Ok(RequestOutcome {
                entry,
                already_pending: true,
            });
        }

        let now = Utc::now().naive_utc();
        diesel::update(camera_access::table.find((patient_id, caregiver_id)))
            .set((
                camera_access::pending_request.eq(true),
                camera_access::requested_at.eq(now),
                camera_access::display_name.eq(display_name),
                camera_access::updated_at.eq(now),
            ))
            .execute(conn)?;

        let entry = camera_access::table
            .find((patient_id, caregiver_id))
            .first(conn)?;
        Ok(RequestOutcome {
            entry,
            already_pending: false,
        })
    })
}

/// Staff decision. Always clears the pending overlay, whatever the prior
/// state was.
pub fn set_status(
    conn: &mut PgConnection,
    patient_id: &str,
    caregiver_id: Uuid,
    display_name: &str,
    status: AccessStatus,
) -> CameraAccessResult<CameraAccessEntry> {
    conn.transaction::<CameraAccessEntry, CameraAccessError, _>(|conn| {
        ensure_entry(conn, patient_id, caregiver_id, display_name)?;

        let now = Utc::now().naive_utc();
        diesel::update(camera_access::table.find((patient_id, caregiver_id)))
            .set((
                camera_access::status.eq(status.as_str()),
                camera_access::pending_request.eq(false),
                camera_access::requested_at.eq(None::<NaiveDateTime>),
                camera_access::display_name.eq(display_name),
                camera_access::updated_at.eq(now),
            ))
            .execute(conn)?;

        let entry = camera_access::table
            .find((patient_id, caregiver_id))
            .first(conn)?;
        Ok(entry)
    })
}

/// The staff approval queue: every caregiver-patient pair, pending requests
/// first, then most recent activity. Caregivers with no explicit row default
/// to revoked.
pub fn queue(conn: &mut PgConnection) -> CameraAccessResult<Vec<QueueEntry>> {
    let caregiver_rows: Vec<Caregiver> = caregivers::table.load(conn)?;
    let access_rows: Vec<CameraAccessEntry> = camera_access::table.load(conn)?;
    let patient_rows: Vec<Patient> = patients_table::table.load(conn)?;

    let access_map: HashMap<(String, Uuid), CameraAccessEntry> = access_rows
        .into_iter()
        .map(|entry| ((entry.patient_id.clone(), entry.caregiver_id), entry))
        .collect();
    let camera_urls: HashMap<String, Option<String>> = patient_rows
        .into_iter()
        .map(|patient| (patient.id, patients::camera_url(&patient.metadata)))
        .collect();

    let mut entries: Vec<QueueEntry> = caregiver_rows
        .into_iter()
        .map(|caregiver| {
            let camera_url = camera_urls
                .get(&caregiver.patient_id)
                .cloned()
                .unwrap_or(None);
            match access_map.get(&(caregiver.patient_id.clone(), caregiver.id)) {
                Some(entry) => QueueEntry {
                    patient_id: entry.patient_id.clone(),
                    caregiver_id: entry.caregiver_id,
                    display_name: entry.display_name.clone(),
                    status: AccessStatus::from_input(&entry.status),
                    pending_request: entry.pending_request,
                    requested_at: entry.requested_at,
                    updated_at: entry.updated_at,
                    camera_url,
                },
                None => QueueEntry {
                    patient_id: caregiver.patient_id,
                    caregiver_id: caregiver.id,
                    display_name: caregiver.display_name,
                    status: AccessStatus::Revoked,
                    pending_request: false,
                    requested_at: None,
                    updated_at: caregiver.created_at,
                    camera_url,
                },
            }
        })
        .collect();

    entries.sort_by(|a, b| {
        b.pending_request
            .cmp(&a.pending_request)
            .then_with(|| activity_at(b).cmp(&activity_at(a)))
    });

    Ok(entries)
}

fn activity_at(entry: &QueueEntry) -> NaiveDateTime {
    entry.requested_at.unwrap_or(entry.updated_at)
}
