use std::sync::Arc;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use serde_json::{Map, Value};

/// JSON-RPC 2.0 error codes.
pub const ERR_CODE_PARSE: i32 = -32700;
pub const ERR_CODE_INVALID_REQ: i32 = -32600;
pub const ERR_CODE_NO_METHOD: i32 = -32601;
pub const ERR_CODE_BAD_PARAMS: i32 = -32602;
pub const ERR_CODE_INTERNAL: i32 = -32603;

/// Latest MCP protocol version this server speaks.
pub const PROTOCOL_VERSION: &str = "2025-06-18";

/// Protocol versions accepted during `initialize` negotiation, newest first.
pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &["2025-06-18", "2025-03-26", "2024-11-05"];

// ── Request ──

/// Inbound JSON-RPC 2.0 request.
///
/// `id` is `None` only when the member is absent (a notification). An
/// explicit `"id": null` decodes as `Some(Value::Null)` so it can be rejected.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    #[serde(default, deserialize_with = "present_id")]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

fn present_id<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

// ── Errors on the wire ──

/// Protocol-level failure classes.
///
/// These never reach tool semantics: a call that produces one of these
/// either never got to a handler, or the handler faulted and the detail
/// was hidden behind [`ErrorKind::InternalError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    InternalError,
}

impl ErrorKind {
    pub fn code(self) -> i32 {
        match self {
            ErrorKind::ParseError => ERR_CODE_PARSE,
            ErrorKind::InvalidRequest => ERR_CODE_INVALID_REQ,
            ErrorKind::MethodNotFound => ERR_CODE_NO_METHOD,
            ErrorKind::InvalidParams => ERR_CODE_BAD_PARAMS,
            ErrorKind::InternalError => ERR_CODE_INTERNAL,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            ERR_CODE_PARSE => Some(ErrorKind::ParseError),
            ERR_CODE_INVALID_REQ => Some(ErrorKind::InvalidRequest),
            ERR_CODE_NO_METHOD => Some(ErrorKind::MethodNotFound),
            ERR_CODE_BAD_PARAMS => Some(ErrorKind::InvalidParams),
            ERR_CODE_INTERNAL => Some(ErrorKind::InternalError),
            _ => None,
        }
    }
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        RpcError {
            code: kind.code(),
            message: message.into(),
            data: None,
        }
    }

    /// The error class, if the code is one of the standard JSON-RPC codes.
    pub fn kind(&self) -> Option<ErrorKind> {
        ErrorKind::from_code(self.code)
    }
}

// ── Response ──

/// Response from [`Server::handle()`](crate::Server::handle).
///
/// For cached endpoints (`tools/list`) the result is pre-serialized JSON
/// shared via `Arc`, so answering costs a ref-count increment.
///
/// Implements [`Serialize`] so it can be handed straight to the HTTP layer.
/// For structured inspection (e.g. in tests), call
/// [`into_json_rpc()`](McpResponse::into_json_rpc).
#[derive(Debug)]
pub struct McpResponse {
    id: Option<Value>,
    kind: ResponseKind,
}

#[derive(Debug)]
enum ResponseKind {
    Cached(Arc<RawValue>),
    Result(Value),
    Error(RpcError),
    /// Notification sentinel, no response body.
    Notification,
}

impl McpResponse {
    /// True when the request was a notification (no response body needed).
    pub fn is_notification(&self) -> bool {
        matches!(self.kind, ResponseKind::Notification)
    }

    /// The error object, if this is an error response.
    pub fn error_ref(&self) -> Option<&RpcError> {
        match &self.kind {
            ResponseKind::Error(err) => Some(err),
            _ => None,
        }
    }

    /// Convert to a [`JsonRpcResponse`] for structured inspection.
    pub fn into_json_rpc(self) -> JsonRpcResponse {
        let (result, error) = match self.kind {
            ResponseKind::Cached(raw) => (
                Some(serde_json::from_str(raw.get()).unwrap_or_default()),
                None,
            ),
            ResponseKind::Result(value) => (Some(value), None),
            ResponseKind::Error(err) => (None, Some(err)),
            ResponseKind::Notification => (None, None),
        };
        JsonRpcResponse {
            jsonrpc: "2.0".into(),
            id: self.id,
            result,
            error,
        }
    }

    // ── Internal constructors ──

    pub(crate) fn cached(id: Option<Value>, raw: &Arc<RawValue>) -> Self {
        McpResponse {
            id,
            kind: ResponseKind::Cached(Arc::clone(raw)),
        }
    }

    pub(crate) fn ok(id: Option<Value>, result: Value) -> Self {
        McpResponse {
            id,
            kind: ResponseKind::Result(result),
        }
    }

    pub(crate) fn error(id: Option<Value>, err: RpcError) -> Self {
        McpResponse {
            id,
            kind: ResponseKind::Error(err),
        }
    }

    pub(crate) fn notification() -> Self {
        McpResponse {
            id: None,
            kind: ResponseKind::Notification,
        }
    }
}

impl Serialize for McpResponse {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.is_notification() {
            let mut map = serializer.serialize_map(Some(1))?;
            map.serialize_entry("jsonrpc", "2.0")?;
            return map.end();
        }

        // An error for an unidentifiable request still carries `"id": null`.
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("jsonrpc", "2.0")?;
        match &self.kind {
            ResponseKind::Cached(raw) => map.serialize_entry("result", raw.as_ref())?,
            ResponseKind::Result(value) => map.serialize_entry("result", value)?,
            ResponseKind::Error(err) => map.serialize_entry("error", err)?,
            ResponseKind::Notification => {}
        }
        map.serialize_entry("id", &self.id)?;
        map.end()
    }
}

/// Structured JSON-RPC 2.0 response, mostly useful for test inspection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

// ── MCP domain types ──

/// MCP tool definition.
///
/// `input_schema` is the JSON Schema advertised to clients; `schema_meta`
/// is the compiled form the dispatcher validates against.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub description: String,
    pub input_schema: Value,
    #[serde(skip)]
    pub schema_meta: SchemaMeta,
}

/// Tool call result returned by handlers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    pub content: Vec<ContentBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_content: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

/// Single content block in a tool result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock {
            block_type: "text".into(),
            text: Some(text.into()),
        }
    }
}

/// Compiled argument schema of one tool.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaMeta {
    pub fields: Vec<FieldSchema>,
}

/// One declared parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSchema {
    pub name: String,
    pub kind: FieldKind,
    pub optional: bool,
}

/// The closed set of constraints a parameter can carry.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// A string drawn from a fixed literal set.
    Enum(Vec<String>),
    /// A finite number.
    Number,
    String,
}

// ── Convenience constructors ──

/// Create a simple text tool result.
pub fn text_result(text: impl Into<String>) -> ToolResult {
    ToolResult {
        content: vec![ContentBlock::text(text)],
        structured_content: None,
        is_error: false,
    }
}

/// Create a text tool result that also carries a machine-readable payload.
pub fn structured_result(text: impl Into<String>, structured: Map<String, Value>) -> ToolResult {
    ToolResult {
        content: vec![ContentBlock::text(text)],
        structured_content: Some(structured),
        is_error: false,
    }
}

/// Create a tool-level error result.
pub fn error_result(text: impl Into<String>) -> ToolResult {
    ToolResult {
        content: vec![ContentBlock::text(text)],
        structured_content: None,
        is_error: true,
    }
}

/// Error type for the crate.
#[derive(Debug, thiserror::Error)]
pub enum McpError {
    /// Arguments did not fit what the handler expects.
    #[error("validation error: {0}")]
    Validation(String),
    #[error("invalid tool definition: {0}")]
    Schema(String),
    #[error("duplicate tool: {0}")]
    DuplicateTool(String),
    #[error("no handler registered for tool: {0}")]
    MissingHandler(String),
    #[error("handler registered for undefined tool: {0}")]
    UnknownHandler(String),
    #[error("tool error: {0}")]
    ToolError(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Other(String),
}

// Internal params structs for deserialization.

#[derive(Debug, Deserialize)]
pub(crate) struct ToolCallParams {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InitializeParams {
    #[serde(default)]
    pub protocol_version: Option<String>,
    #[serde(default)]
    pub client_info: Option<ClientInfo>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ClientInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
}
