use diesel::pg::PgConnection;
use diesel::prelude::*;
use thiserror::Error;
use uuid::Uuid;

use crate::auth::password;
use crate::camera_access::{self, CameraAccessError};
use crate::invitations::{self, InvitationError};
use crate::models::{Caregiver, NewCaregiver};
use crate::patients;
use crate::schema::caregivers;

#[derive(Debug, Error)]
pub enum AccountError {
    #[error(transparent)]
    Invitation(#[from] InvitationError),
    #[error("phone number already registered")]
    PhoneTaken,
    #[error("invalid phone or password")]
    InvalidCredentials,
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
    #[error("hashing error: {0}")]
    Hash(anyhow::Error),
}

impl From<CameraAccessError> for AccountError {
    fn from(value: CameraAccessError) -> Self {
        match value {
            CameraAccessError::Database(err) => AccountError::Database(err),
        }
    }
}

pub type AccountResult<T> = Result<T, AccountError>;

#[derive(Debug)]
pub struct Registration<'a> {
    pub code: &'a str,
    pub name: &'a str,
    pub phone: &'a str,
    pub password: &'a str,
    pub pin: Option<&'a str>,
}

/// Converts a valid invitation claim into a caregiver account.
///
/// Everything runs in one transaction: invitation validation (which locks the
/// row), the patient upsert, the caregiver insert, the camera-access row, and
/// the claim itself. Any failure rolls the whole claim back, so a rejected
/// PIN leaves the invitation pending and claimable.
pub fn register_from_invitation(
    conn: &mut PgConnection,
    registration: Registration<'_>,
) -> AccountResult<Caregiver> {
    conn.transaction::<Caregiver, AccountError, _>(|conn| {
        let invitation = invitations::load_open_invitation(conn, registration.code)?;
        invitations::verify_pin(&invitation, registration.pin)?;

        let phone_taken = caregivers::table
            .filter(caregivers::phone.eq(registration.phone))
            .select(caregivers::id)
            .first::<Uuid>(conn)
            .optional()?
            .is_some();
        if phone_taken {
            return Err(AccountError::PhoneTaken);
        }

        let password_hash =
            password::hash_secret(registration.password).map_err(AccountError::Hash)?;

        patients::upsert_patient(
            conn,
            &invitation.patient_id,
            invitation
                .display_label
                .as_deref()
                .unwrap_or(&invitation.patient_id),
        )?;

        let new_caregiver = NewCaregiver {
            id: Uuid::new_v4(),
            patient_id: invitation.patient_id.clone(),
            display_name: registration.name.to_string(),
            phone: registration.phone.to_string(),
            password_hash,
        };

        match diesel::insert_into(caregivers::table)
            .values(&new_caregiver)
            .execute(conn)
        {
            Ok(_) => {}
            Err(diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                _,
            )) => {
                // Lost a race with a concurrent registration on the same phone.
                return Err(AccountError::PhoneTaken);
            }
            Err(err) => return Err(AccountError::from(err)),
        }

        camera_access::ensure_entry(
            conn,
            &invitation.patient_id,
            new_caregiver.id,
            registration.name,
        )?;

        invitations::mark_claimed(conn, registration.code, new_caregiver.id)?;

        let caregiver = caregivers::table.find(new_caregiver.id).first(conn)?;
        Ok(caregiver)
    })
}

/// Phone + password login. Unknown phone and wrong password produce the same
/// error, so the endpoint does not confirm which phone numbers exist.
pub fn login(conn: &mut PgConnection, phone: &str, password_input: &str) -> AccountResult<Caregiver> {
    let caregiver: Caregiver = caregivers::table
        .filter(caregivers::phone.eq(phone))
        .first(conn)
        .optional()?
        .ok_or(AccountError::InvalidCredentials)?;

    let valid = password::verify_secret(password_input, &caregiver.password_hash)
        .map_err(AccountError::Hash)?;
    if !valid {
        return Err(AccountError::InvalidCredentials);
    }

    Ok(caregiver)
}
