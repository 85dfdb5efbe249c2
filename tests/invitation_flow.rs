mod common;

use anyhow::Result;
use axum::http::StatusCode;
use common::{acquire_db_lock, body_to_json, TestApp};
use serde_json::json;

#[tokio::test]
async fn invitation_lifecycle_claim_once() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    let (code, pin) = app.create_invitation("BABY-01", 1).await?;

    let response = app.get(&format!("/api/invitations/{code}"), None).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let details = body_to_json(response.into_body()).await?;
    assert_eq!(details["patient_id"], "BABY-01");
    assert_eq!(details["pin_required"], true);

    app.register_caregiver(&code, &pin, "Amina", "0711111111", "hunter2-long")
        .await?;
    assert_eq!(app.invitation_status(&code).await?, "claimed");

    // The code is single-use: a second claim must fail and must not create a
    // second caregiver.
    let response = app
        .post_json(
            "/api/auth/register",
            &json!({
                "code": code,
                "name": "Imposter",
                "phone": "0722222222",
                "password": "another-pass",
                "pin": pin,
            }),
            None,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::GONE);
    let body = body_to_json(response.into_body()).await?;
    assert_eq!(body["code"], "gone");

    let response = app.get(&format!("/api/invitations/{code}"), None).await?;
    assert_eq!(response.status(), StatusCode::GONE);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn wrong_pin_leaves_invitation_claimable() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    let (code, pin) = app.create_invitation("BABY-02", 1).await?;
    let wrong_pin = if pin == "000000" { "000001" } else { "000000" };

    let response = app
        .post_json(
            "/api/auth/register",
            &json!({
                "code": code,
                "name": "Amina",
                "phone": "0733333333",
                "password": "hunter2-long",
                "pin": wrong_pin,
            }),
            None,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(app.invitation_status(&code).await?, "pending");

    // The failed attempt rolled back completely, so the correct PIN still
    // claims the invitation.
    app.register_caregiver(&code, &pin, "Amina", "0733333333", "hunter2-long")
        .await?;
    assert_eq!(app.invitation_status(&code).await?, "claimed");

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn expired_invitation_transitions_lazily_on_read() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    let (code, pin) = app.create_invitation("BABY-03", 1).await?;
    app.force_expire_invitation(&code).await?;

    let response = app.get(&format!("/api/invitations/{code}"), None).await?;
    assert_eq!(response.status(), StatusCode::GONE);
    let body = body_to_json(response.into_body()).await?;
    assert_eq!(body["code"], "expired");

    // The read itself performed the pending -> expired transition; the row is
    // kept rather than deleted.
    assert_eq!(app.invitation_status(&code).await?, "expired");

    let response = app
        .post_json(
            "/api/auth/register",
            &json!({
                "code": code,
                "name": "Late",
                "phone": "0744444444",
                "password": "hunter2-long",
                "pin": pin,
            }),
            None,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::GONE);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn unknown_code_is_not_found() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    let response = app.get("/api/invitations/no-such-code", None).await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_to_json(response.into_body()).await?;
    assert_eq!(body["code"], "not_found");

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn invitation_creation_requires_staff_key_and_patient_id() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    let response = app
        .post_json("/api/invitations", &json!({ "patient_id": "BABY-04" }), None)
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .staff_post_json("/api/invitations", &json!({ "patient_id": "  " }))
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    app.cleanup().await?;
    Ok(())
}
