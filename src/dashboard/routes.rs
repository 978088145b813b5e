use axum::{
    routing::{get, post, put},
    Router,
};

use super::handlers;
use super::server::AppState;

/// Create API router with all endpoints
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/servers",
            get(handlers::list_servers).post(handlers::register_server),
        )
        .route("/servers/:identifier/status", put(handlers::set_server_status))
        .route("/claude/restart", post(handlers::restart_claude))
}
