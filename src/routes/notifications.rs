use axum::{extract::State, http::StatusCode, Json};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::StaffAuth,
    error::{AppError, AppResult},
    models::Notification,
    notifications::{self, NotificationUpsert, Severity},
    state::AppState,
};

#[derive(Serialize)]
pub struct NotificationView {
    pub id: Uuid,
    pub fingerprint: Option<String>,
    pub title: String,
    pub message: String,
    pub severity: String,
    pub source: String,
    pub read: bool,
    pub read_at: Option<NaiveDateTime>,
    pub metadata: serde_json::Value,
    pub occurrences: i32,
    pub last_triggered_at: NaiveDateTime,
    pub created_at: NaiveDateTime,
}

impl From<Notification> for NotificationView {
    fn from(row: Notification) -> Self {
        Self {
            id: row.id,
            fingerprint: row.fingerprint,
            title: row.title,
            message: row.message,
            severity: row.severity,
            source: row.source,
            read: row.read,
            read_at: row.read_at,
            metadata: row.metadata,
            occurrences: row.occurrences,
            last_triggered_at: row.last_triggered_at,
            created_at: row.created_at,
        }
    }
}

#[derive(Deserialize)]
pub struct UpsertNotificationRequest {
    pub fingerprint: Option<String>,
    pub title: String,
    pub message: String,
    pub severity: Option<String>,
    pub source: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub occurred_at: Option<NaiveDateTime>,
}

#[derive(Deserialize)]
pub struct MarkReadRequest {
    pub ids: Option<Vec<Uuid>>,
}

#[derive(Serialize)]
pub struct MarkReadResponse {
    pub changed: bool,
}

pub async fn list_notifications(
    _staff: StaffAuth,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<NotificationView>>> {
    let mut conn = state.db()?;
    let rows = notifications::list_feed(&mut conn, state.config.notification_feed_cap)?;
    Ok(Json(rows.into_iter().map(NotificationView::from).collect()))
}

pub async fn upsert_notification(
    _staff: StaffAuth,
    State(state): State<AppState>,
    Json(payload): Json<UpsertNotificationRequest>,
) -> AppResult<(StatusCode, Json<NotificationView>)> {
    if payload.title.trim().is_empty() {
        return Err(AppError::bad_request("title must not be empty"));
    }
    if payload.message.trim().is_empty() {
        return Err(AppError::bad_request("message must not be empty"));
    }

    let severity = Severity::from_input(payload.severity.as_deref().unwrap_or("info"));
    let source = payload.source.as_deref().unwrap_or("system");

    let mut conn = state.db()?;
    let row = notifications::upsert_notification(
        &mut conn,
        NotificationUpsert {
            fingerprint: payload.fingerprint.as_deref(),
            title: payload.title.trim(),
            message: payload.message.trim(),
            severity,
            source,
            metadata: payload.metadata,
            occurred_at: payload.occurred_at,
        },
        state.config.notification_feed_cap,
    )?;

    Ok((StatusCode::CREATED, Json(NotificationView::from(row))))
}

pub async fn mark_notifications_read(
    _staff: StaffAuth,
    State(state): State<AppState>,
    Json(payload): Json<MarkReadRequest>,
) -> AppResult<Json<MarkReadResponse>> {
    let mut conn = state.db()?;
    let changed = notifications::mark_read(&mut conn, payload.ids.as_deref())?;
    Ok(Json(MarkReadResponse { changed }))
}
