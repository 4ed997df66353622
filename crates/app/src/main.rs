mod config;
mod tools;

use std::sync::Arc;

use config::Config;
use mcp_boilerplate::{McpError, Server};
use tools::Deps;

const SERVER_NAME: &str = "mcp-server-boilerplate";
const SERVER_VERSION: &str = "1.0.0";

fn build_server(deps: Arc<Deps>) -> Result<Server, McpError> {
    let mut builder = Server::builder()
        .tools_json(include_bytes!("../tools.json"))
        .server_info(SERVER_NAME, SERVER_VERSION);

    tools::register_all(&mut builder, deps);
    builder.build()
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .json()
        .init();
}

/// Log a fatal startup error and exit non-zero.
fn fail(context: &str, error: impl std::fmt::Display) -> ! {
    tracing::error!(error = %error, "{}", context);
    std::process::exit(1);
}

#[tokio::main]
async fn main() {
    init_tracing();

    let config = Config::from_env().unwrap_or_else(|e| fail("invalid configuration", e));
    let deps = Deps::new().unwrap_or_else(|e| fail("failed to build dependencies", e));
    let srv = build_server(Arc::new(deps)).unwrap_or_else(|e| fail("failed to build server", e));

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .unwrap_or_else(|e| fail("Server error", e));

    tracing::info!(
        addr = %addr,
        "MCP Server running on http://localhost:{}/mcp",
        config.port
    );

    let router = mcp_boilerplate::http_router(srv);
    if let Err(e) = axum::serve(listener, router).await {
        fail("Server error", e);
    }
}
