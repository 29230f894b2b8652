//! Axum router configuration with middleware.
//!
//! Session management and contact routes live under `/api/`; per-session
//! status and presence routes embed the session name in the path, matching
//! the upstream chat-network API conventions.
//! Middleware: CORS, tracing.

use axum::Router;
use axum::routing::{delete, get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Session lifecycle
        .route("/sessions", get(handlers::session::list_sessions))
        .route("/sessions/start", post(handlers::session::start_session))
        .route("/sessions/stop", post(handlers::session::stop_session))
        .route("/sessions/restart", post(handlers::session::restart_session))
        .route("/sessions/{name}", get(handlers::session::get_session))
        .route("/sessions/{name}", delete(handlers::session::delete_session))
        .route("/sessions/{name}/auth/qr", get(handlers::session::get_auth_code))
        // Contacts (session via query parameter)
        .route("/contacts", get(handlers::contacts::get_contact))
        .route("/contacts/all", get(handlers::contacts::get_all_contacts))
        .route(
            "/contacts/check-exists",
            get(handlers::contacts::check_number_exists),
        )
        .route("/contacts/about", get(handlers::contacts::get_contact_about))
        .route(
            "/contacts/profile-picture",
            get(handlers::contacts::get_profile_picture),
        )
        .route("/contacts/block", post(handlers::contacts::block_contact))
        .route("/contacts/unblock", post(handlers::contacts::unblock_contact))
        // Status broadcasts (session in path)
        .route("/{session}/status/text", post(handlers::status::send_text_status))
        .route("/{session}/status/image", post(handlers::status::send_image_status))
        .route("/{session}/status/voice", post(handlers::status::send_voice_status))
        .route("/{session}/status/video", post(handlers::status::send_video_status))
        .route("/{session}/status/delete", post(handlers::status::delete_status))
        // Presence (session in path)
        .route("/{session}/presence", post(handlers::presence::set_presence))
        .route(
            "/{session}/presence/{contact}",
            get(handlers::presence::get_presence),
        )
        .route(
            "/{session}/presence/{contact}/subscribe",
            post(handlers::presence::subscribe_presence),
        );

    Router::new()
        .nest("/api", api_routes)
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health - Simple health check endpoint (no auth required).
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
