use chrono::{Duration as ChronoDuration, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use rand::rngs::OsRng;
use rand::{Rng, RngCore};
use thiserror::Error;
use uuid::Uuid;

use crate::auth::password;
use crate::models::{Invitation, NewInvitation};
use crate::patients;
use crate::schema::invitations;

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_CLAIMED: &str = "claimed";
pub const STATUS_EXPIRED: &str = "expired";

#[derive(Debug, Error)]
pub enum InvitationError {
    #[error("invitation not found")]
    NotFound,
    #[error("invitation expired")]
    Expired,
    #[error("invitation already used")]
    AlreadyClaimed,
    #[error("a PIN is required for this invitation")]
    PinRequired,
    #[error("invalid PIN")]
    PinMismatch,
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
    #[error("hashing error: {0}")]
    Hash(anyhow::Error),
}

pub type InvitationResult<T> = Result<T, InvitationError>;

/// Returned once, at creation time. The PIN is never stored or exposed in
/// plaintext anywhere else.
#[derive(Debug)]
pub struct IssuedInvitation {
    pub invitation: Invitation,
    pub pin: String,
}

pub fn issue_invitation(
    conn: &mut PgConnection,
    patient_id: &str,
    display_label: Option<&str>,
    role_label: Option<&str>,
    ttl_hours: i64,
    pin_length: usize,
) -> InvitationResult<IssuedInvitation> {
    let code = generate_code();
    let pin = generate_pin(pin_length);
    let pin_hash = password::hash_secret(&pin).map_err(InvitationError::Hash)?;
    let expires_at = (Utc::now() + ChronoDuration::hours(ttl_hours)).naive_utc();

    let invitation = conn.transaction::<Invitation, InvitationError, _>(|conn| {
        patients::upsert_patient(conn, patient_id, display_label.unwrap_or(patient_id))?;

        let new_invitation = NewInvitation {
            code: code.clone(),
            patient_id: patient_id.to_string(),
            display_label: display_label.map(|value| value.to_string()),
            role_label: role_label.map(|value| value.to_string()),
            pin_hash: Some(pin_hash),
            status: STATUS_PENDING.to_string(),
            expires_at,
        };

        diesel::insert_into(invitations::table)
            .values(&new_invitation)
            .execute(conn)?;

        let invitation = invitations::table.find(&code).first(conn)?;
        Ok(invitation)
    })?;

    Ok(IssuedInvitation { invitation, pin })
}

/// Loads an invitation that is still open for claiming, locking the row.
///
/// A pending invitation whose expiry has passed is transitioned to expired
/// here, inside the same transaction as the read, so two concurrent reads
/// cannot double-write the transition. Claimed and expired rows are kept for
/// later lookups rather than deleted.
pub fn load_open_invitation(conn: &mut PgConnection, code: &str) -> InvitationResult<Invitation> {
    conn.transaction::<Invitation, InvitationError, _>(|conn| {
        let invitation = invitations::table
            .find(code)
            .for_update()
            .first::<Invitation>(conn)
            .optional()?
            .ok_or(InvitationError::NotFound)?;

        match invitation.status.as_str() {
            STATUS_CLAIMED => Err(InvitationError::AlreadyClaimed),
            STATUS_EXPIRED => Err(InvitationError::Expired),
            _ => {
                let now = Utc::now().naive_utc();
                if now > invitation.expires_at {
                    diesel::update(invitations::table.find(code))
                        .set((
                            invitations::status.eq(STATUS_EXPIRED),
                            invitations::updated_at.eq(now),
                        ))
                        .execute(conn)?;
                    return Err(InvitationError::Expired);
                }
                Ok(invitation)
            }
        }
    })
}

pub fn verify_pin(invitation: &Invitation, pin: Option<&str>) -> InvitationResult<()> {
    let Some(pin_hash) = invitation.pin_hash.as_deref() else {
        return Ok(());
    };

    let supplied = pin.ok_or(InvitationError::PinRequired)?;
    let matches = password::verify_secret(supplied, pin_hash).map_err(InvitationError::Hash)?;
    if !matches {
        return Err(InvitationError::PinMismatch);
    }
    Ok(())
}

/// Marks a pending invitation claimed by the given caregiver. The status
/// filter makes the transition single-shot: if a concurrent claim got there
/// first, zero rows match and the caller sees `AlreadyClaimed`.
pub fn mark_claimed(
    conn: &mut PgConnection,
    code: &str,
    caregiver_id: Uuid,
) -> InvitationResult<Invitation> {
    let now = Utc::now().naive_utc();

    let updated = diesel::update(
        invitations::table
            .find(code)
            .filter(invitations::status.eq(STATUS_PENDING)),
    )
    .set((
        invitations::status.eq(STATUS_CLAIMED),
        invitations::claimed_at.eq(now),
        invitations::claimed_by.eq(caregiver_id),
        invitations::updated_at.eq(now),
    ))
    .execute(conn)?;

    if updated == 0 {
        return Err(InvitationError::AlreadyClaimed);
    }

    let invitation = invitations::table.find(code).first(conn)?;
    Ok(invitation)
}

fn generate_code() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn generate_pin(length: usize) -> String {
    let mut rng = OsRng;
    (0..length.max(1))
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}
