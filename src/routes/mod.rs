use axum::http::HeaderValue;
use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub mod auth;
pub mod camera_access;
pub mod health;
pub mod invitations;
pub mod messages;
pub mod notifications;

pub fn create_router(state: AppState) -> Router<()> {
    let cors = if let Some(origins) = state.config.cors_allowed_origin.as_ref() {
        let headers: Vec<HeaderValue> = origins
            .split(',')
            .filter_map(|value| {
                let trimmed = value.trim();
                (!trimmed.is_empty()).then(|| {
                    trimmed
                        .parse::<HeaderValue>()
                        .expect("invalid CORS allowed origin")
                })
            })
            .collect();

        let allow_origin = AllowOrigin::list(headers);

        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods(tower_http::cors::AllowMethods::mirror_request())
            .allow_headers(tower_http::cors::AllowHeaders::mirror_request())
            .allow_credentials(true)
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::mirror_request())
            .allow_methods(tower_http::cors::AllowMethods::mirror_request())
            .allow_headers(tower_http::cors::AllowHeaders::mirror_request())
            .allow_credentials(true)
    };

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/me", get(auth::me));

    let invitation_routes = Router::new()
        .route("/", post(invitations::create_invitation))
        .route("/:code", get(invitations::get_invitation));

    let camera_access_routes = Router::new()
        .route("/request", post(camera_access::request_access))
        .route("/queue", get(camera_access::list_queue))
        .route("/:caregiver_id", put(camera_access::set_access_status));

    let notification_routes = Router::new()
        .route(
            "/",
            get(notifications::list_notifications).post(notifications::upsert_notification),
        )
        .route("/read", post(notifications::mark_notifications_read));

    let message_routes = Router::new().route(
        "/:patient_id/messages",
        get(messages::list_messages).post(messages::post_message),
    );

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/invitations", invitation_routes)
        .nest("/api/camera-access", camera_access_routes)
        .nest("/api/notifications", notification_routes)
        .nest("/api/patients", message_routes)
        .route("/api/health", get(health::health_check))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
