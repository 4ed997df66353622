pub mod calculate;
pub mod movies;

use std::sync::Arc;
use std::time::Duration;

use mcp_boilerplate::{McpError, ServerBuilder};

/// Search endpoint queried by `search_movies`; the title goes in `q`.
pub const MOVIE_SEARCH_URL: &str = "https://imdb.iamidiotareyoutoo.com/search";

/// Upper bound on one outbound movie search.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared dependencies for all tool handlers.
pub struct Deps {
    pub http: reqwest::Client,
    pub movie_search_url: String,
}

impl Deps {
    pub fn new() -> Result<Self, McpError> {
        Self::with_movie_search_url(MOVIE_SEARCH_URL)
    }

    pub fn with_movie_search_url(url: impl Into<String>) -> Result<Self, McpError> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .user_agent(concat!("mcp-server-boilerplate/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| McpError::Other(format!("build http client: {}", e)))?;
        Ok(Self {
            http,
            movie_search_url: url.into(),
        })
    }
}

/// Register all tool handlers on the given server builder.
pub fn register_all(srv: &mut ServerBuilder, deps: Arc<Deps>) {
    calculate::register(srv);
    movies::register(srv, deps);
}
