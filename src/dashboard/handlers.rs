use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    Form,
};

use super::models::*;
use super::server::AppState;
use crate::error::ManagerError;

/// HTTP status for each failure kind. NotFound and Ambiguous stay distinct.
pub fn status_for(error: &ManagerError) -> StatusCode {
    match error {
        ManagerError::NotFound(_) => StatusCode::NOT_FOUND,
        ManagerError::Ambiguous(_) | ManagerError::DuplicateName(_) => StatusCode::CONFLICT,
        ManagerError::CommandInvalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ManagerError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        ManagerError::UnsupportedPlatform(_) => StatusCode::NOT_IMPLEMENTED,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(error: ManagerError) -> Response {
    let status = status_for(&error);
    if status.is_server_error() {
        crate::log_error!(error, "dashboard request");
    } else {
        tracing::warn!("Request rejected: {}", error);
    }

    (
        status,
        Json(ApiError {
            code: error.to_error_code().to_string(),
            message: error.to_string(),
        }),
    )
        .into_response()
}

/// List every server in the inventory
pub async fn list_servers(State(state): State<AppState>) -> impl IntoResponse {
    let servers = state.manager.list_servers();
    (StatusCode::OK, Json(ApiResponse { data: servers }))
}

/// Register a server from the web form
pub async fn register_server(
    State(state): State<AppState>,
    Form(form): Form<RegisterServerForm>,
) -> Response {
    let result = match form.into_new_server() {
        Ok(new_server) => state.manager.register_server(new_server).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(server) => (StatusCode::CREATED, Json(ApiResponse { data: server })).into_response(),
        Err(e) => error_response(e),
    }
}

/// Enable or disable a server in Claude Desktop
///
/// The body is parsed by hand so that every malformed payload is a 400.
pub async fn set_server_status(
    State(state): State<AppState>,
    Path(identifier): Path<String>,
    body: Bytes,
) -> Response {
    let request: SetStatusRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(_) => {
            return error_response(ManagerError::InvalidInput(
                "Invalid request body. Expected {\"enabled\": true|false}".to_string(),
            ))
        },
    };

    match state.manager.set_enabled(&identifier, request.enabled).await {
        Ok(outcome) => (StatusCode::OK, Json(ApiResponse { data: outcome })).into_response(),
        Err(e) => error_response(e),
    }
}

/// Restart the Claude Desktop application
pub async fn restart_claude(State(state): State<AppState>) -> Response {
    match state.manager.restart_claude().await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(ApiResponse {
                data: RestartResponse {
                    status: "success".to_string(),
                    action: outcome.action().to_string(),
                    message: outcome.message().to_string(),
                },
            }),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}
