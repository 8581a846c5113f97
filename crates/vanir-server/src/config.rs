//! Server configuration management

use crate::error::{Result, ServerError};
use serde::{Deserialize, Serialize};

/// Default documentation base URL browsers are redirected to.
pub const DEFAULT_DOC_URL: &str = "https://pkg.go.dev/";

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port the resolution listener binds to
    pub port: u16,

    /// Port the healthz/readyz/metrics listener binds to
    pub ops_port: u16,

    /// Base URL browsers are redirected to for documentation
    pub doc_base_url: String,

    /// Deadline for backend calls made by the resolution handler, in seconds
    pub call_deadline_seconds: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            host: std::env::var("VANIR_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("VANIR_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .map_err(|_| ServerError::Config("Invalid VANIR_PORT value".to_string()))?,
            ops_port: std::env::var("VANIR_OPS_PORT")
                .unwrap_or_else(|_| "9090".to_string())
                .parse()
                .map_err(|_| ServerError::Config("Invalid VANIR_OPS_PORT value".to_string()))?,
            doc_base_url: std::env::var("VANIR_DOC_URL")
                .unwrap_or_else(|_| DEFAULT_DOC_URL.to_string()),
            call_deadline_seconds: std::env::var("VANIR_CALL_DEADLINE_SECONDS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .map_err(|_| {
                    ServerError::Config("Invalid VANIR_CALL_DEADLINE_SECONDS value".to_string())
                })?,
        })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            ops_port: 9090,
            doc_base_url: DEFAULT_DOC_URL.to_string(),
            call_deadline_seconds: 5,
        }
    }
}
