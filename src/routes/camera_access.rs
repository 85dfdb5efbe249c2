use axum::{
    extract::{Path, State},
    Json,
};
use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::{
    auth::{AuthenticatedCaregiver, StaffAuth},
    camera_access::{self, AccessStatus},
    error::{AppError, AppResult},
    models::CameraAccessEntry,
    notifications::{self, NotificationUpsert, Severity},
    schema::caregivers,
    state::AppState,
};

#[derive(Serialize)]
pub struct AccessSnapshot {
    pub patient_id: String,
    pub caregiver_id: Uuid,
    pub display_name: String,
    pub status: &'static str,
    pub pending_request: bool,
    pub requested_at: Option<NaiveDateTime>,
    pub updated_at: NaiveDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub already_pending: Option<bool>,
}

impl AccessSnapshot {
    fn from_entry(entry: &CameraAccessEntry, already_pending: Option<bool>) -> Self {
        Self {
            patient_id: entry.patient_id.clone(),
            caregiver_id: entry.caregiver_id,
            display_name: entry.display_name.clone(),
            status: AccessStatus::from_input(&entry.status).as_str(),
            pending_request: entry.pending_request,
            requested_at: entry.requested_at,
            updated_at: entry.updated_at,
            already_pending,
        }
    }
}

#[derive(Serialize)]
pub struct QueueSnapshot {
    pub patient_id: String,
    pub caregiver_id: Uuid,
    pub display_name: String,
    pub status: &'static str,
    pub pending_request: bool,
    pub requested_at: Option<NaiveDateTime>,
    pub updated_at: NaiveDateTime,
    pub camera_url: Option<String>,
}

#[derive(Deserialize)]
pub struct SetAccessStatusRequest {
    pub patient_id: String,
    pub status: String,
    pub display_name: String,
}

pub async fn request_access(
    State(state): State<AppState>,
    caregiver: AuthenticatedCaregiver,
) -> AppResult<Json<AccessSnapshot>> {
    let mut conn = state.db()?;
    let outcome = camera_access::record_request(
        &mut conn,
        &caregiver.patient_id,
        caregiver.caregiver_id,
        &caregiver.display_name,
    )?;

    // A fresh request surfaces in the staff feed; repeated polling while one
    // is already pending must not touch the feed at all.
    if !outcome.already_pending {
        let fingerprint =
            notifications::camera_request_fingerprint(&caregiver.patient_id, caregiver.caregiver_id);
        notifications::upsert_notification(
            &mut conn,
            NotificationUpsert {
                fingerprint: Some(&fingerprint),
                title: "Camera access requested",
                message: &format!(
                    "{} requested camera access for patient {}",
                    caregiver.display_name, caregiver.patient_id
                ),
                severity: Severity::Info,
                source: "camera-access",
                metadata: Some(json!({
                    "patient_id": caregiver.patient_id,
                    "caregiver_id": caregiver.caregiver_id,
                })),
                occurred_at: None,
            },
            state.config.notification_feed_cap,
        )?;
    }

    Ok(Json(AccessSnapshot::from_entry(
        &outcome.entry,
        Some(outcome.already_pending),
    )))
}

pub async fn list_queue(
    _staff: StaffAuth,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<QueueSnapshot>>> {
    let mut conn = state.db()?;
    let entries = camera_access::queue(&mut conn)?;

    let response = entries
        .into_iter()
        .map(|entry| QueueSnapshot {
            patient_id: entry.patient_id,
            caregiver_id: entry.caregiver_id,
            display_name: entry.display_name,
            status: entry.status.as_str(),
            pending_request: entry.pending_request,
            requested_at: entry.requested_at,
            updated_at: entry.updated_at,
            camera_url: entry.camera_url,
        })
        .collect();

    Ok(Json(response))
}

pub async fn set_access_status(
    _staff: StaffAuth,
    State(state): State<AppState>,
    Path(caregiver_id): Path<Uuid>,
    Json(payload): Json<SetAccessStatusRequest>,
) -> AppResult<Json<AccessSnapshot>> {
    if payload.patient_id.trim().is_empty() {
        return Err(AppError::bad_request("patient_id must not be empty"));
    }
    if payload.status.trim().is_empty() {
        return Err(AppError::bad_request("status must not be empty"));
    }
    if payload.display_name.trim().is_empty() {
        return Err(AppError::bad_request("display_name must not be empty"));
    }

    let mut conn = state.db()?;

    let known = caregivers::table
        .find(caregiver_id)
        .filter(caregivers::patient_id.eq(payload.patient_id.trim()))
        .select(caregivers::id)
        .first::<Uuid>(&mut conn)
        .optional()?;
    if known.is_none() {
        return Err(AppError::not_found());
    }

    let status = AccessStatus::from_input(&payload.status);
    let entry = camera_access::set_status(
        &mut conn,
        payload.patient_id.trim(),
        caregiver_id,
        payload.display_name.trim(),
        status,
    )?;

    tracing::info!(
        patient_id = %entry.patient_id,
        caregiver_id = %entry.caregiver_id,
        status = status.as_str(),
        "camera access status updated"
    );

    Ok(Json(AccessSnapshot::from_entry(&entry, None)))
}
