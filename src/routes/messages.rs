use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::Actor,
    error::{AppError, AppResult},
    models::{Message, NewMessage},
    patients,
    schema::messages,
    state::AppState,
};

pub const SENDER_CAREGIVER: &str = "caregiver";
pub const SENDER_STAFF: &str = "staff";

#[derive(Deserialize)]
pub struct PostMessageRequest {
    pub body: String,
    pub sender_name: Option<String>,
}

#[derive(Serialize)]
pub struct MessageView {
    pub id: Uuid,
    pub patient_id: String,
    pub sender_kind: String,
    pub sender_name: String,
    pub body: String,
    pub created_at: NaiveDateTime,
}

impl From<Message> for MessageView {
    fn from(row: Message) -> Self {
        Self {
            id: row.id,
            patient_id: row.patient_id,
            sender_kind: row.sender_kind,
            sender_name: row.sender_name,
            body: row.body,
            created_at: row.created_at,
        }
    }
}

pub async fn list_messages(
    State(state): State<AppState>,
    actor: Actor,
    Path(patient_id): Path<String>,
) -> AppResult<Json<Vec<MessageView>>> {
    require_patient_scope(&actor, &patient_id)?;

    let mut conn = state.db()?;
    let rows: Vec<Message> = messages::table
        .filter(messages::patient_id.eq(&patient_id))
        .order(messages::created_at.asc())
        .load(&mut conn)?;

    Ok(Json(rows.into_iter().map(MessageView::from).collect()))
}

pub async fn post_message(
    State(state): State<AppState>,
    actor: Actor,
    Path(patient_id): Path<String>,
    Json(payload): Json<PostMessageRequest>,
) -> AppResult<(StatusCode, Json<MessageView>)> {
    require_patient_scope(&actor, &patient_id)?;

    if payload.body.trim().is_empty() {
        return Err(AppError::bad_request("body must not be empty"));
    }

    let (sender_kind, sender_name) = match &actor {
        Actor::Staff => (
            SENDER_STAFF,
            payload
                .sender_name
                .as_deref()
                .unwrap_or(SENDER_STAFF)
                .to_string(),
        ),
        Actor::Caregiver(caregiver) => (SENDER_CAREGIVER, caregiver.display_name.clone()),
    };

    let mut conn = state.db()?;
    patients::upsert_patient(&mut conn, &patient_id, &patient_id)
        .map_err(AppError::from)?;

    let new_message = NewMessage {
        id: Uuid::new_v4(),
        patient_id: patient_id.clone(),
        sender_kind: sender_kind.to_string(),
        sender_name,
        body: payload.body.trim().to_string(),
    };

    diesel::insert_into(messages::table)
        .values(&new_message)
        .execute(&mut conn)?;

    let row: Message = messages::table.find(new_message.id).first(&mut conn)?;
    Ok((StatusCode::CREATED, Json(MessageView::from(row))))
}

fn require_patient_scope(actor: &Actor, patient_id: &str) -> AppResult<()> {
    match actor {
        Actor::Staff => Ok(()),
        Actor::Caregiver(caregiver) if caregiver.patient_id == patient_id => Ok(()),
        Actor::Caregiver(_) => Err(AppError::unauthorized()),
    }
}
