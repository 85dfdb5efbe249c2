use chrono::NaiveDateTime;
use diesel::prelude::*;
use uuid::Uuid;

use crate::schema::*;

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = patients)]
pub struct Patient {
    pub id: String,
    pub display_name: String,
    pub metadata: serde_json::Value,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = patients)]
pub struct NewPatient {
    pub id: String,
    pub display_name: String,
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = caregivers)]
#[diesel(belongs_to(Patient))]
pub struct Caregiver {
    pub id: Uuid,
    pub patient_id: String,
    pub display_name: String,
    pub phone: String,
    pub password_hash: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = caregivers)]
pub struct NewCaregiver {
    pub id: Uuid,
    pub patient_id: String,
    pub display_name: String,
    pub phone: String,
    pub password_hash: String,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = invitations)]
#[diesel(primary_key(code))]
#[diesel(belongs_to(Patient))]
pub struct Invitation {
    pub code: String,
    pub patient_id: String,
    pub display_label: Option<String>,
    pub role_label: Option<String>,
    pub pin_hash: Option<String>,
    pub status: String,
    pub expires_at: NaiveDateTime,
    pub claimed_at: Option<NaiveDateTime>,
    pub claimed_by: Option<Uuid>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = invitations)]
pub struct NewInvitation {
    pub code: String,
    pub patient_id: String,
    pub display_label: Option<String>,
    pub role_label: Option<String>,
    pub pin_hash: Option<String>,
    pub status: String,
    pub expires_at: NaiveDateTime,
}

#[derive(Debug, Clone, Queryable, Associations)]
#[diesel(table_name = camera_access)]
#[diesel(belongs_to(Patient))]
#[diesel(primary_key(patient_id, caregiver_id))]
pub struct CameraAccessEntry {
    pub patient_id: String,
    pub caregiver_id: Uuid,
    pub display_name: String,
    pub status: String,
    pub pending_request: bool,
    pub requested_at: Option<NaiveDateTime>,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = camera_access)]
pub struct NewCameraAccessEntry {
    pub patient_id: String,
    pub caregiver_id: Uuid,
    pub display_name: String,
    pub status: String,
    pub pending_request: bool,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = notifications)]
pub struct Notification {
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
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = notifications)]
pub struct NewNotification {
    pub id: Uuid,
    pub fingerprint: Option<String>,
    pub title: String,
    pub message: String,
    pub severity: String,
    pub source: String,
    pub metadata: serde_json::Value,
    pub occurrences: i32,
    pub last_triggered_at: NaiveDateTime,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = messages)]
#[diesel(belongs_to(Patient))]
pub struct Message {
    pub id: Uuid,
    pub patient_id: String,
    pub sender_kind: String,
    pub sender_name: String,
    pub body: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = messages)]
pub struct NewMessage {
    pub id: Uuid,
    pub patient_id: String,
    pub sender_kind: String,
    pub sender_name: String,
    pub body: String,
}
