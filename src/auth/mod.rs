pub mod jwt;
pub mod password;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::headers::{authorization::Bearer, Authorization};
use axum_extra::TypedHeader;
use serde::{Deserialize, Serialize};

use crate::{error::AppError, state::AppState};

pub const STAFF_KEY_HEADER: &str = "x-staff-key";

/// Caregiver session resolved from the bearer token. Scoped to exactly one
/// (patient, caregiver) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticatedCaregiver {
    pub caregiver_id: uuid::Uuid,
    pub patient_id: String,
    pub display_name: String,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedCaregiver {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AppError::unauthorized())?;

        let claims = state
            .jwt
            .verify_token(bearer.token())
            .map_err(|_| AppError::unauthorized())?;

        Ok(AuthenticatedCaregiver {
            caregiver_id: claims.sub,
            patient_id: claims.patient_id,
            display_name: claims.name,
        })
    }
}

/// Either side of the care relationship. The message log accepts both, so
/// this tries the staff key first and falls back to the caregiver token.
#[derive(Debug, Clone)]
pub enum Actor {
    Staff,
    Caregiver(AuthenticatedCaregiver),
}

#[async_trait]
impl FromRequestParts<AppState> for Actor {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(supplied) = parts
            .headers
            .get(STAFF_KEY_HEADER)
            .and_then(|value| value.to_str().ok())
        {
            if supplied == state.config.staff_api_key {
                return Ok(Actor::Staff);
            }
            return Err(AppError::unauthorized());
        }

        AuthenticatedCaregiver::from_request_parts(parts, state)
            .await
            .map(Actor::Caregiver)
    }
}

/// Marker extractor for staff endpoints, validated against the shared
/// `STAFF_API_KEY`.
#[derive(Debug, Clone, Copy)]
pub struct StaffAuth;

#[async_trait]
impl FromRequestParts<AppState> for StaffAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let supplied = parts
            .headers
            .get(STAFF_KEY_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(AppError::unauthorized)?;

        if supplied != state.config.staff_api_key {
            return Err(AppError::unauthorized());
        }

        Ok(StaffAuth)
    }
}
