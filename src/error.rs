use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt::Display;

pub type AppResult<T> = Result<T, AppError>;

/// HTTP-facing error with a stable machine-checkable code alongside the
/// human-readable message. Internal errors never leak their detail to the
/// client.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl AppError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "invalid_request", message)
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "unauthorized", "unauthorized")
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", "resource not found")
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, "conflict", message)
    }

    /// Time-bound resource past its window. Kept distinct from `gone` so
    /// clients can explain "link expired" vs "link already used".
    pub fn expired(message: impl Into<String>) -> Self {
        Self::new(StatusCode::GONE, "expired", message)
    }

    pub fn gone(message: impl Into<String>) -> Self {
        Self::new(StatusCode::GONE, "gone", message)
    }

    pub fn internal<E: Display>(error: E) -> Self {
        tracing::error!(error = %error, "internal error");
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            "internal server error",
        )
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status;
        let body = Json(ErrorResponse {
            error: self.message,
            code: self.code,
        });
        (status, body).into_response()
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: &'static str,
}

impl From<crate::invitations::InvitationError> for AppError {
    fn from(value: crate::invitations::InvitationError) -> Self {
        use crate::invitations::InvitationError;
        match value {
            InvitationError::NotFound => AppError::not_found(),
            InvitationError::Expired => AppError::expired("invitation expired"),
            InvitationError::AlreadyClaimed => AppError::gone("invitation already used"),
            InvitationError::PinRequired | InvitationError::PinMismatch => {
                AppError::unauthorized()
            }
            InvitationError::Database(err) => AppError::from(err),
            InvitationError::Hash(err) => AppError::internal(err),
        }
    }
}

impl From<crate::accounts::AccountError> for AppError {
    fn from(value: crate::accounts::AccountError) -> Self {
        use crate::accounts::AccountError;
        match value {
            AccountError::Invitation(err) => AppError::from(err),
            AccountError::PhoneTaken => AppError::conflict("phone number already registered"),
            AccountError::InvalidCredentials => AppError::unauthorized(),
            AccountError::Database(err) => AppError::from(err),
            AccountError::Hash(err) => AppError::internal(err),
        }
    }
}

impl From<crate::camera_access::CameraAccessError> for AppError {
    fn from(value: crate::camera_access::CameraAccessError) -> Self {
        use crate::camera_access::CameraAccessError;
        match value {
            CameraAccessError::Database(err) => AppError::from(err),
        }
    }
}

impl From<crate::notifications::NotificationError> for AppError {
    fn from(value: crate::notifications::NotificationError) -> Self {
        use crate::notifications::NotificationError;
        match value {
            NotificationError::Database(err) => AppError::from(err),
        }
    }
}

impl From<diesel::result::Error> for AppError {
    fn from(value: diesel::result::Error) -> Self {
        match value {
            diesel::result::Error::NotFound => AppError::not_found(),
            _ => AppError::internal(value),
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(value: jsonwebtoken::errors::Error) -> Self {
        AppError::internal(value)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(value: anyhow::Error) -> Self {
        AppError::internal(value)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        AppError::internal(value)
    }
}
