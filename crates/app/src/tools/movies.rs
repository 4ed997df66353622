use std::sync::Arc;

use mcp_boilerplate::{
    error_result, structured_result, McpError, ServerBuilder, ToolResult, TypedToolHandler,
};
use serde::Deserialize;
use serde_json::{Map, Value};

use super::Deps;

#[derive(Debug, Clone, Deserialize)]
pub struct SearchMoviesArgs {
    pub title: String,
}

pub fn register(srv: &mut ServerBuilder, deps: Arc<Deps>) {
    srv.handle_tool(
        "search_movies",
        TypedToolHandler::new(move |args: SearchMoviesArgs| {
            let deps = deps.clone();
            async move { search_movies(&deps, args).await }
        }),
    );
}

/// Query the movie search endpoint and hand its JSON back verbatim.
///
/// Unreachable endpoint and non-2xx answers are tool-level errors. A body
/// that is not JSON is a fault.
async fn search_movies(deps: &Deps, args: SearchMoviesArgs) -> Result<ToolResult, McpError> {
    let response = match deps
        .http
        .get(&deps.movie_search_url)
        .query(&[("q", args.title.as_str())])
        .send()
        .await
    {
        Ok(resp) => resp,
        Err(e) => {
            tracing::warn!(title = %args.title, error = %e, "movie search request failed");
            return Ok(error_result(format!("Error: movie search request failed: {}", e)));
        }
    };

    let status = response.status();
    if !status.is_success() {
        tracing::warn!(title = %args.title, status = status.as_u16(), "movie search rejected");
        return Ok(error_result(format!(
            "Error: movie search returned HTTP {}",
            status.as_u16()
        )));
    }

    let body: Value = response
        .json()
        .await
        .map_err(|e| McpError::ToolError(format!("decode movie search response: {}", e)))?;

    let text = serde_json::to_string_pretty(&body)?;
    let structured = match body {
        Value::Object(map) => map,
        other => {
            let mut map = Map::new();
            map.insert("results".into(), other);
            map
        }
    };

    Ok(structured_result(text, structured))
}
