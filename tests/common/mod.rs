use std::env;

use anyhow::{anyhow, ensure, Context, Result};
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use chrono::{Duration as ChronoDuration, Utc};
use cradlelink::auth::jwt::JwtService;
use cradlelink::config::AppConfig;
use cradlelink::db::{self, PgPool};
use cradlelink::routes;
use cradlelink::state::AppState;
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::PgConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use http_body_util::BodyExt;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tower::util::ServiceExt;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

static DB_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

pub const STAFF_KEY: &str = "test-staff-key";

pub struct TestApp {
    pub state: AppState,
    router: Router,
}

impl TestApp {
    pub async fn new() -> Result<Self> {
        let database_url = env::var("TEST_DATABASE_URL")
            .context("TEST_DATABASE_URL must be set for integration tests")?;

        let config = AppConfig {
            database_url: database_url.clone(),
            database_max_pool_size: db::DEFAULT_MAX_POOL_SIZE,
            server_host: "127.0.0.1".to_string(),
            server_port: 0,
            jwt_secret: "test-secret".to_string(),
            jwt_issuer: "test-issuer".to_string(),
            jwt_audience: "test-audience".to_string(),
            jwt_expiry_minutes: 60,
            staff_api_key: STAFF_KEY.to_string(),
            invitation_ttl_hours: 72,
            invitation_pin_length: 6,
            notification_feed_cap: 5,
            cors_allowed_origin: None,
        };

        let pool = db::init_pool_with_size(&config.database_url, config.database_max_pool_size)?;
        prepare_database(&pool).await?;

        let jwt = JwtService::from_config(&config)?;
        let state = AppState::new(pool.clone(), config, jwt);
        let router = routes::create_router(state.clone());

        Ok(Self { state, router })
    }

    pub async fn cleanup(&self) -> Result<()> {
        let pool = self.state.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<()> {
            let mut conn = pool
                .get()
                .map_err(|err| anyhow!("failed to get cleanup connection: {err}"))?;
            truncate_all(&mut conn)?;
            Ok(())
        })
        .await
        .context("cleanup task panicked")?
    }

    /// Issues an invitation through the staff endpoint and returns
    /// `(code, pin)`.
    #[allow(dead_code)]
    pub async fn create_invitation(&self, patient_id: &str, ttl_hours: i64) -> Result<(String, String)> {
        #[derive(Serialize)]
        struct CreatePayload<'a> {
            patient_id: &'a str,
            display_label: Option<&'a str>,
            ttl_hours: i64,
        }

        let response = self
            .staff_post_json(
                "/api/invitations",
                &CreatePayload {
                    patient_id,
                    display_label: Some("Incubator 3"),
                    ttl_hours,
                },
            )
            .await?;
        ensure!(
            response.status() == StatusCode::CREATED,
            "invitation creation failed with status {}",
            response.status()
        );

        #[derive(Deserialize)]
        struct CreatedInvitation {
            code: String,
            pin: String,
        }
        let body = body_to_vec(response.into_body()).await?;
        let parsed: CreatedInvitation = serde_json::from_slice(&body)?;
        Ok((parsed.code, parsed.pin))
    }

    /// Claims an invitation as a new caregiver and returns the session token.
    #[allow(dead_code)]
    pub async fn register_caregiver(
        &self,
        code: &str,
        pin: &str,
        name: &str,
        phone: &str,
        password: &str,
    ) -> Result<String> {
        #[derive(Serialize)]
        struct RegisterPayload<'a> {
            code: &'a str,
            name: &'a str,
            phone: &'a str,
            password: &'a str,
            pin: &'a str,
        }

        let response = self
            .post_json(
                "/api/auth/register",
                &RegisterPayload {
                    code,
                    name,
                    phone,
                    password,
                    pin,
                },
                None,
            )
            .await?;
        ensure!(
            response.status() == StatusCode::CREATED,
            "registration failed with status {}",
            response.status()
        );

        let body = body_to_vec(response.into_body()).await?;
        #[derive(Deserialize)]
        struct SessionResponse {
            token: String,
        }
        let parsed: SessionResponse = serde_json::from_slice(&body)?;
        Ok(parsed.token)
    }

    #[allow(dead_code)]
    pub async fn login_token(&self, phone: &str, password: &str) -> Result<String> {
        #[derive(Serialize)]
        struct LoginPayload<'a> {
            phone: &'a str,
            password: &'a str,
        }

        let response = self
            .post_json("/api/auth/login", &LoginPayload { phone, password }, None)
            .await?;

        ensure!(
            response.status() == StatusCode::OK,
            "login failed with status {}",
            response.status()
        );

        let body = body_to_vec(response.into_body()).await?;
        #[derive(Deserialize)]
        struct SessionResponse {
            token: String,
        }
        let parsed: SessionResponse = serde_json::from_slice(&body)?;
        Ok(parsed.token)
    }

    #[allow(dead_code)]
    pub async fn invitation_status(&self, code: &str) -> Result<String> {
        let code = code.to_string();
        self.with_conn(move |conn| {
            use cradlelink::schema::invitations::dsl;
            let status = dsl::invitations
                .find(&code)
                .select(dsl::status)
                .first::<String>(conn)
                .context("failed to load invitation status")?;
            Ok(status)
        })
        .await
    }

    /// Rewinds an invitation's expiry into the past while leaving its status
    /// untouched, to exercise the lazy expire-on-read path.
    #[allow(dead_code)]
    pub async fn force_expire_invitation(&self, code: &str) -> Result<()> {
        let code = code.to_string();
        self.with_conn(move |conn| {
            use cradlelink::schema::invitations::dsl;
            let past = (Utc::now() - ChronoDuration::hours(2)).naive_utc();
            diesel::update(dsl::invitations.find(&code))
                .set(dsl::expires_at.eq(past))
                .execute(conn)
                .context("failed to rewind invitation expiry")?;
            Ok(())
        })
        .await
    }

    #[allow(dead_code)]
    pub async fn notification_count(&self) -> Result<i64> {
        self.with_conn(|conn| {
            use cradlelink::schema::notifications::dsl;
            let count = dsl::notifications
                .count()
                .get_result::<i64>(conn)
                .context("failed to count notifications")?;
            Ok(count)
        })
        .await
    }

    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        self.send_json(Method::POST, path, payload, token, None).await
    }

    pub async fn staff_post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
    ) -> Result<hyper::Response<Body>> {
        self.send_json(Method::POST, path, payload, None, Some(STAFF_KEY))
            .await
    }

    #[allow(dead_code)]
    pub async fn staff_put_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
    ) -> Result<hyper::Response<Body>> {
        self.send_json(Method::PUT, path, payload, None, Some(STAFF_KEY))
            .await
    }

    #[allow(dead_code)]
    pub async fn get(&self, path: &str, token: Option<&str>) -> Result<hyper::Response<Body>> {
        let mut builder = Request::builder().method(Method::GET).uri(path);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = builder.body(Body::empty())?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    #[allow(dead_code)]
    pub async fn staff_get(&self, path: &str) -> Result<hyper::Response<Body>> {
        let request = Request::builder()
            .method(Method::GET)
            .uri(path)
            .header("x-staff-key", STAFF_KEY)
            .body(Body::empty())?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    async fn send_json<T: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        payload: &T,
        token: Option<&str>,
        staff_key: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        let body = serde_json::to_vec(payload)?;
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        if let Some(key) = staff_key {
            builder = builder.header("x-staff-key", key);
        }
        let request = builder.body(Body::from(body))?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut PgConnection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.state.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool
                .get()
                .map_err(|err| anyhow!("failed to get database connection: {err}"))?;
            f(&mut conn)
        })
        .await
        .context("connection task panicked")?
    }
}

pub async fn acquire_db_lock() -> tokio::sync::MutexGuard<'static, ()> {
    DB_LOCK.lock().await
}

pub async fn body_to_vec(body: Body) -> Result<Vec<u8>> {
    let collected = body
        .collect()
        .await
        .map_err(|err| anyhow!("failed to read response body: {err}"))?;
    Ok(collected.to_bytes().to_vec())
}

pub async fn body_to_json(body: Body) -> Result<serde_json::Value> {
    let bytes = body_to_vec(body).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

async fn prepare_database(pool: &PgPool) -> Result<()> {
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || -> Result<()> {
        let mut conn = pool
            .get()
            .map_err(|err| anyhow!("failed to acquire connection: {err}"))?;
        conn.run_pending_migrations(MIGRATIONS)
            .map_err(|err| anyhow!("failed to run migrations: {err}"))?;
        truncate_all(&mut conn)?;
        Ok(())
    })
    .await
    .context("migration task panicked")?
}

fn truncate_all(conn: &mut PgConnection) -> Result<()> {
    conn.batch_execute(
        "TRUNCATE TABLE messages, notifications, camera_access, invitations, caregivers, patients RESTART IDENTITY CASCADE;",
    )
    .context("failed to truncate tables")?;
    Ok(())
}
