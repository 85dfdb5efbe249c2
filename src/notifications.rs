use chrono::{NaiveDateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{NewNotification, Notification};
use crate::schema::notifications;

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
}

pub type NotificationResult<T> = Result<T, NotificationError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }

    pub fn from_input(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "critical" => Severity::Critical,
            "warning" => Severity::Warning,
            _ => Severity::Info,
        }
    }
}

#[derive(Debug)]
pub struct NotificationUpsert<'a> {
    pub fingerprint: Option<&'a str>,
    pub title: &'a str,
    pub message: &'a str,
    pub severity: Severity,
    pub source: &'a str,
    pub metadata: Option<serde_json::Value>,
    pub occurred_at: Option<NaiveDateTime>,
}

/// Fingerprint-keyed upsert. A repeat occurrence of a fingerprint refreshes
/// the existing row in place (and resets the read flag) instead of inserting
/// a second one, so the feed shows one entry per underlying event with an
/// occurrence counter. Rows without a fingerprint are never deduplicated.
pub fn upsert_notification(
    conn: &mut PgConnection,
    upsert: NotificationUpsert<'_>,
    feed_cap: i64,
) -> NotificationResult<Notification> {
    conn.transaction::<Notification, NotificationError, _>(|conn| {
        let now = Utc::now().naive_utc();
        let triggered_at = upsert.occurred_at.unwrap_or(now);

        if let Some(fingerprint) = upsert.fingerprint {
            let existing: Option<Notification> = notifications::table
                .filter(notifications::fingerprint.eq(fingerprint))
                .for_update()
                .first(conn)
                .optional()?;

            if let Some(row) = existing {
                diesel::update(notifications::table.find(row.id))
                    .set((
                        notifications::title.eq(upsert.title),
                        notifications::message.eq(upsert.message),
                        notifications::severity.eq(upsert.severity.as_str()),
                        notifications::source.eq(upsert.source),
                        notifications::metadata
                            .eq(upsert.metadata.unwrap_or_else(|| row.metadata.clone())),
                        notifications::read.eq(false),
                        notifications::read_at.eq(None::<NaiveDateTime>),
                        notifications::occurrences.eq(row.occurrences + 1),
                        notifications::last_triggered_at.eq(triggered_at),
                        notifications::updated_at.eq(now),
                    ))
                    .execute(conn)?;

                let refreshed = notifications::table.find(row.id).first(conn)?;
                return Ok(refreshed);
            }
        }

        let new_notification = NewNotification {
            id: Uuid::new_v4(),
            fingerprint: upsert.fingerprint.map(|value| value.to_string()),
            title: upsert.title.to_string(),
            message: upsert.message.to_string(),
            severity: upsert.severity.as_str().to_string(),
            source: upsert.source.to_string(),
            metadata: upsert.metadata.unwrap_or_else(|| serde_json::json!({})),
            occurrences: 1,
            last_triggered_at: triggered_at,
        };

        diesel::insert_into(notifications::table)
            .values(&new_notification)
            .execute(conn)?;

        truncate_feed(conn, feed_cap)?;

        let inserted = notifications::table.find(new_notification.id).first(conn)?;
        Ok(inserted)
    })
}

/// Drops the oldest rows beyond the retention cap.
fn truncate_feed(conn: &mut PgConnection, feed_cap: i64) -> QueryResult<()> {
    let stale_ids: Vec<Uuid> = notifications::table
        .select(notifications::id)
        .order(notifications::created_at.desc())
        .offset(feed_cap.max(1))
        .load(conn)?;

    if !stale_ids.is_empty() {
        diesel::delete(notifications::table.filter(notifications::id.eq_any(&stale_ids)))
            .execute(conn)?;
    }

    Ok(())
}

pub fn list_feed(conn: &mut PgConnection, feed_cap: i64) -> NotificationResult<Vec<Notification>> {
    let rows = notifications::table
        .order(notifications::last_triggered_at.desc())
        .limit(feed_cap.max(1))
        .load(conn)?;
    Ok(rows)
}

/// Marks the given notifications read, or every unread one when no ids are
/// supplied. Returns whether any row actually changed, so callers can skip
/// redundant refreshes.
pub fn mark_read(conn: &mut PgConnection, ids: Option<&[Uuid]>) -> NotificationResult<bool> {
    let now = Utc::now().naive_utc();
    let changes = (
        notifications::read.eq(true),
        notifications::read_at.eq(now),
        notifications::updated_at.eq(now),
    );

    let updated = match ids {
        Some(ids) => diesel::update(
            notifications::table
                .filter(notifications::read.eq(false))
                .filter(notifications::id.eq_any(ids)),
        )
        .set(changes)
        .execute(conn)?,
        None => diesel::update(notifications::table.filter(notifications::read.eq(false)))
            .set(changes)
            .execute(conn)?,
    };

    Ok(updated > 0)
}

/// Fingerprint for a caregiver's camera-access request, scoped so it can
/// never collide with clinical-alert fingerprints.
pub fn camera_request_fingerprint(patient_id: &str, caregiver_id: Uuid) -> String {
    format!("camera-request:{patient_id}:{caregiver_id}")
}
