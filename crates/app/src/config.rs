use std::net::{Ipv4Addr, SocketAddr};

use mcp_boilerplate::McpError;

/// Port used when `PORT` is unset.
pub const DEFAULT_PORT: u16 = 3000;

/// Process configuration, read from the environment at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self { port: DEFAULT_PORT }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, McpError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, McpError> {
        let port = match lookup("PORT") {
            None => DEFAULT_PORT,
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| {
                McpError::Config(format!("PORT must be an integer in 0..=65535, got {:?}: {}", raw, e))
            })?,
        };
        Ok(Self { port })
    }

    /// Listen on all interfaces.
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port))
    }
}
