//! Axum router configuration with middleware.
//!
//! All routes are under `/api/v1/`.
//! Middleware: CORS, tracing.

use axum::Router;
use axum::routing::{get, patch, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers::session;
use crate::state::AppState;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/team-sessions", post(session::create_session))
        .route("/teams/{team_id}/sessions", get(session::list_team_sessions))
        .route("/teams/{team_id}/bots", get(session::list_team_bots))
        .route(
            "/team-sessions/{id}",
            get(session::get_session).delete(session::delete_session),
        )
        // Planning
        .route(
            "/team-sessions/{id}/planning-message",
            post(session::append_planning_message),
        )
        .route(
            "/team-sessions/{id}/planning/bot-question",
            post(session::generate_bot_question),
        )
        .route(
            "/team-sessions/{id}/finalize-planning",
            post(session::finalize_planning),
        )
        // Execution
        .route("/team-sessions/{id}/execute", post(session::execute))
        // Review
        .route(
            "/team-sessions/{id}/review-message",
            post(session::append_review_message),
        )
        .route(
            "/team-sessions/{id}/suggestion",
            post(session::add_suggestion),
        )
        .route(
            "/team-sessions/{id}/suggestion/{suggestion_id}",
            patch(session::set_suggestion_status),
        )
        .route(
            "/team-sessions/{id}/complete",
            post(session::complete_session),
        )
        .route("/health", get(health_check));

    Router::new()
        .nest("/api/v1", api_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
