//! HTTP server configuration
//!
//! Where the debug routes are served. Owned by the bootstrap layer; the tail
//! core never sees it.

use serde::Deserialize;

/// Default listen port
pub const DEFAULT_PORT: u16 = 19000;

/// HTTP server configuration
///
/// ```toml
/// [server]
/// host = "0.0.0.0"   # default
/// port = 19000       # default
/// trace_requests = true
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    /// Default: "0.0.0.0"
    pub host: String,

    /// Port to listen on
    /// Default: 19000
    pub port: u16,

    /// Emit a tracing span per HTTP request
    /// Default: true
    pub trace_requests: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            trace_requests: true,
        }
    }
}

impl ServerConfig {
    /// Address in `host:port` form
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
