use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures::FutureExt;
use serde_json::{json, Value};

use crate::dispatch::panic_message;
use crate::server::Server;
use crate::types::{ErrorKind, JsonRpcRequest, McpResponse, RpcError};

/// Body sent when handling a request fails outside the JSON-RPC layer.
pub const INTERNAL_SERVER_ERROR_MESSAGE: &str = "Internal server error";

/// Create an Axum router for the MCP server.
///
/// Stateless: every `POST /mcp` carries one complete JSON-RPC request and
/// gets its answer in the response body. No session ids are issued.
pub fn http_router(server: Server) -> Router {
    Router::new()
        .route("/mcp", post(handle_mcp))
        .route("/healthz", get(handle_healthz))
        .with_state(Arc::new(server))
}

async fn handle_healthz() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

async fn handle_mcp(State(server): State<Arc<Server>>, body: Bytes) -> Response {
    let req = match decode_request(&body) {
        Ok(req) => req,
        Err(err) => {
            tracing::warn!(code = err.code, message = %err.message, "rejected mcp request");
            return (StatusCode::BAD_REQUEST, Json(McpResponse::error(None, err))).into_response();
        }
    };

    tracing::debug!(method = %req.method, "mcp request");
    respond(server.handle(req)).await
}

/// Turn the outcome of handling one request into an HTTP response.
///
/// Handler panics are already contained by the dispatcher; this catches
/// anything that escapes the router itself and answers with HTTP 500.
async fn respond(handling: impl Future<Output = McpResponse>) -> Response {
    match AssertUnwindSafe(handling).catch_unwind().await {
        // Notification: return 202 with no body.
        Ok(resp) if resp.is_notification() => (StatusCode::ACCEPTED, Body::empty()).into_response(),
        Ok(resp) => Json(resp).into_response(),
        Err(panic) => {
            tracing::error!(panic = panic_message(&*panic), "error handling mcp request");
            internal_error_response()
        }
    }
}

/// Parse a request body into a JSON-RPC request, producing the JSON-RPC
/// error to send back when that fails.
fn decode_request(body: &[u8]) -> Result<JsonRpcRequest, RpcError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| RpcError::new(ErrorKind::ParseError, format!("Parse error: {}", e)))?;
    serde_json::from_value(value)
        .map_err(|e| RpcError::new(ErrorKind::InvalidRequest, format!("Invalid Request: {}", e)))
}

/// HTTP 500 carrying a JSON-RPC internal error with a null id.
pub fn internal_error_response() -> Response {
    let body = McpResponse::error(
        None,
        RpcError::new(ErrorKind::InternalError, INTERNAL_SERVER_ERROR_MESSAGE),
    );
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}
