use diesel::pg::PgConnection;
use diesel::prelude::*;

use crate::models::NewPatient;
use crate::schema::patients;

/// Patients are created lazily, on the first invitation or message that
/// references them. An existing row is left untouched so a later write never
/// clobbers the stored display name or metadata.
pub fn upsert_patient(
    conn: &mut PgConnection,
    patient_id: &str,
    display_name: &str,
) -> QueryResult<()> {
    let new_patient = NewPatient {
        id: patient_id.to_string(),
        display_name: display_name.to_string(),
        metadata: serde_json::json!({}),
    };

    diesel::insert_into(patients::table)
        .values(&new_patient)
        .on_conflict(patients::id)
        .do_nothing()
        .execute(conn)?;

    Ok(())
}

pub fn camera_url(metadata: &serde_json::Value) -> Option<String> {
    metadata
        .get("camera_url")
        .and_then(|value| value.as_str())
        .map(|value| value.to_string())
}
