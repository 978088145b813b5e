use anyhow::{Context, Result};
use axum::{
    extract::{Path, State},
    http::{header, Method, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::get,
    Router,
};
use rust_embed::RustEmbed;
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::manager::ServerManager;

/// Default port of the web interface
pub const DEFAULT_PORT: u16 = 8000;

/// Web page assets compiled into the binary
#[derive(RustEmbed)]
#[folder = "static/"]
struct StaticAssets;

/// Server state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub manager: ServerManager,
    pub port: u16,
}

/// Web interface server instance
pub struct DashboardServer {
    port: u16,
    manager: ServerManager,
}

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: String,
    service: String,
    version: String,
    port: u16,
}

impl DashboardServer {
    pub fn new(port: u16, manager: ServerManager) -> Self {
        Self { port, manager }
    }

    /// Bind and serve until the process is stopped
    pub async fn run(self) -> Result<()> {
        let state = AppState {
            manager: self.manager,
            port: self.port,
        };
        let app = create_router(state);

        let addr = format!("127.0.0.1:{}", self.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind to {}", addr))?;

        tracing::info!("MCP Manager web interface listening on http://{}", addr);

        axum::serve(listener, app).await.context("Server error")?;

        Ok(())
    }
}

/// Create the Axum router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    use super::routes;

    let api_routes = Router::new()
        .route("/health", get(health_handler))
        .merge(routes::api_routes());

    Router::new()
        .route("/", get(serve_index))
        .route("/static/*path", get(serve_static))
        .nest("/api", api_routes)
        .fallback(not_found_handler)
        .with_state(state)
        .layer(
            ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods([Method::GET, Method::POST, Method::PUT])
                    .allow_headers(Any),
            ),
        )
}

async fn serve_index() -> Response {
    match StaticAssets::get("index.html") {
        Some(file) => Html(file.data.into_owned()).into_response(),
        None => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Html("<h1>Error: index.html not found</h1>".to_string()),
        )
            .into_response(),
    }
}

async fn serve_static(Path(path): Path<String>) -> Response {
    match StaticAssets::get(&path) {
        Some(file) => {
            let mime = mime_guess::from_path(&path).first_or_octet_stream();
            (
                [(header::CONTENT_TYPE, mime.as_ref().to_string())],
                file.data.into_owned(),
            )
                .into_response()
        },
        None => not_found_handler().await.into_response(),
    }
}

/// Health check handler. `daemon::check_health` matches on service and port.
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "mcp-manager".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        port: state.port,
    })
}

/// 404 Not Found handler
async fn not_found_handler() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({
            "code": "NOT_FOUND",
            "message": "Not found"
        })),
    )
}
