use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    accounts::{self, Registration},
    auth::AuthenticatedCaregiver,
    error::{AppError, AppResult},
    models::Caregiver,
    state::AppState,
};

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub code: String,
    pub name: String,
    pub phone: String,
    pub password: String,
    pub pin: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub phone: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub caregiver: CaregiverSummary,
}

#[derive(Serialize)]
pub struct CaregiverSummary {
    pub id: Uuid,
    pub patient_id: String,
    pub display_name: String,
    pub phone: String,
}

impl From<&Caregiver> for CaregiverSummary {
    fn from(caregiver: &Caregiver) -> Self {
        Self {
            id: caregiver.id,
            patient_id: caregiver.patient_id.clone(),
            display_name: caregiver.display_name.clone(),
            phone: caregiver.phone.clone(),
        }
    }
}

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<SessionResponse>)> {
    for (field, value) in [
        ("code", &payload.code),
        ("name", &payload.name),
        ("phone", &payload.phone),
        ("password", &payload.password),
    ] {
        if value.trim().is_empty() {
            return Err(AppError::bad_request(format!("{field} must not be empty")));
        }
    }

    let mut conn = state.db()?;
    let caregiver = accounts::register_from_invitation(
        &mut conn,
        Registration {
            code: payload.code.trim(),
            name: payload.name.trim(),
            phone: payload.phone.trim(),
            password: &payload.password,
            pin: payload.pin.as_deref().map(str::trim),
        },
    )?;

    tracing::info!(
        caregiver_id = %caregiver.id,
        patient_id = %caregiver.patient_id,
        "caregiver account created from invitation"
    );

    let response = session_response(&state, &caregiver)?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<SessionResponse>> {
    if payload.phone.trim().is_empty() || payload.password.is_empty() {
        return Err(AppError::bad_request("phone and password must not be empty"));
    }

    let mut conn = state.db()?;
    let caregiver = accounts::login(&mut conn, payload.phone.trim(), &payload.password)?;

    let response = session_response(&state, &caregiver)?;
    Ok(Json(response))
}

pub async fn me(caregiver: AuthenticatedCaregiver) -> Json<AuthenticatedCaregiver> {
    Json(caregiver)
}

fn session_response(state: &AppState, caregiver: &Caregiver) -> AppResult<SessionResponse> {
    let token = state
        .jwt
        .generate_token(caregiver.id, &caregiver.patient_id, &caregiver.display_name)
        .map_err(AppError::from)?;

    Ok(SessionResponse {
        token,
        token_type: "Bearer".to_string(),
        expires_in: state.config.jwt_expiry_minutes * 60,
        caregiver: CaregiverSummary::from(caregiver),
    })
}
