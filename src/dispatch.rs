use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use serde_json::Value;

use crate::registry::{ToolHandler, ToolRegistry};
use crate::types::{ErrorKind, McpError, RpcError, ToolResult};

/// Message sent to callers when a handler faults. The fault itself is only logged.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal error";

/// Routes a decoded tool call to its handler.
///
/// Outcomes fall into two tiers: `Ok(ToolResult)` is a successful call, even
/// when the result has `is_error` set; `Err(RpcError)` is a protocol-level
/// failure where the handler either never ran or faulted.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Look up, validate, and run the named tool.
    pub async fn invoke(&self, name: &str, args: Value) -> Result<ToolResult, RpcError> {
        let entry = self.registry.lookup(name).ok_or_else(|| {
            RpcError::new(ErrorKind::MethodNotFound, format!("Unknown tool: {}", name))
        })?;

        let args = entry.tool.validate_arguments(&args).map_err(|e| {
            tracing::warn!(tool = name, error = %e, "rejected tool arguments");
            RpcError::new(
                ErrorKind::InvalidParams,
                format!("Invalid arguments for tool {}: {}", name, e),
            )
        })?;

        tracing::debug!(tool = name, "calling tool");
        run_handler(name, entry.handler.as_ref(), Value::Object(args)).await
    }
}

/// The one place handler faults are converted into protocol errors.
///
/// Both `Err` returns and panics end up as [`ErrorKind::InternalError`],
/// except argument decoding failures which are the caller's fault.
pub(crate) async fn run_handler(
    name: &str,
    handler: &dyn ToolHandler,
    args: Value,
) -> Result<ToolResult, RpcError> {
    match AssertUnwindSafe(handler.call(args)).catch_unwind().await {
        Ok(Ok(result)) => Ok(result),
        Ok(Err(McpError::Validation(msg))) => Err(RpcError::new(
            ErrorKind::InvalidParams,
            format!("Invalid arguments for tool {}: {}", name, msg),
        )),
        Ok(Err(e)) => {
            tracing::error!(tool = name, error = %e, "tool handler failed");
            Err(RpcError::new(ErrorKind::InternalError, INTERNAL_ERROR_MESSAGE))
        }
        Err(panic) => {
            tracing::error!(tool = name, panic = panic_message(&*panic), "tool handler panicked");
            Err(RpcError::new(ErrorKind::InternalError, INTERNAL_ERROR_MESSAGE))
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}
