use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::{
    auth::StaffAuth,
    error::{AppError, AppResult},
    invitations,
    state::AppState,
};

#[derive(Deserialize)]
pub struct CreateInvitationRequest {
    pub patient_id: String,
    pub display_label: Option<String>,
    pub role_label: Option<String>,
    pub ttl_hours: Option<i64>,
}

#[derive(Serialize)]
pub struct CreatedInvitation {
    pub code: String,
    pub pin: String,
    pub expires_at: NaiveDateTime,
}

/// Public projection of an invitation. The PIN hash stays server-side; the
/// client only learns whether a PIN will be asked for.
#[derive(Serialize)]
pub struct InvitationDetails {
    pub patient_id: String,
    pub display_label: Option<String>,
    pub role_label: Option<String>,
    pub expires_at: NaiveDateTime,
    pub pin_required: bool,
}

pub async fn create_invitation(
    _staff: StaffAuth,
    State(state): State<AppState>,
    Json(payload): Json<CreateInvitationRequest>,
) -> AppResult<(StatusCode, Json<CreatedInvitation>)> {
    if payload.patient_id.trim().is_empty() {
        return Err(AppError::bad_request("patient_id must not be empty"));
    }

    let ttl_hours = payload
        .ttl_hours
        .unwrap_or(state.config.invitation_ttl_hours);
    if ttl_hours <= 0 {
        return Err(AppError::bad_request("ttl_hours must be positive"));
    }

    let mut conn = state.db()?;
    let issued = invitations::issue_invitation(
        &mut conn,
        payload.patient_id.trim(),
        payload.display_label.as_deref(),
        payload.role_label.as_deref(),
        ttl_hours,
        state.config.invitation_pin_length,
    )?;

    tracing::info!(
        patient_id = %issued.invitation.patient_id,
        expires_at = %issued.invitation.expires_at,
        "invitation issued"
    );

    Ok((
        StatusCode::CREATED,
        Json(CreatedInvitation {
            code: issued.invitation.code,
            pin: issued.pin,
            expires_at: issued.invitation.expires_at,
        }),
    ))
}

pub async fn get_invitation(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> AppResult<Json<InvitationDetails>> {
    let mut conn = state.db()?;
    let invitation = invitations::load_open_invitation(&mut conn, &code)?;

    Ok(Json(InvitationDetails {
        patient_id: invitation.patient_id,
        display_label: invitation.display_label,
        role_label: invitation.role_label,
        expires_at: invitation.expires_at,
        pin_required: invitation.pin_hash.is_some(),
    }))
}
