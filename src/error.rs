//! ==============================================================================
//! error.rs - crate error type
//! ==============================================================================
//!
//! purpose:
//!     one error enum for everything that can fail while talking to the
//!     backend or starting up: http, websocket, json, url and config.
//!
//! relationships:
//!     - produced by: history.rs, live.rs, state.rs (delta decode), config.rs
//!     - surfaced by: session.rs (start), main.rs (via anyhow)
//!
//! ==============================================================================

use thiserror::Error;

/// Result type alias for dashboard operations
pub type Result<T> = std::result::Result<T, DashError>;

#[derive(Error, Debug)]
pub enum DashError {
    /// Network-level failure talking to the backend
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with a non-success status
    #[error("{path} returned HTTP {status}")]
    Status { path: String, status: u16 },

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DashError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn invalid_url(msg: impl Into<String>) -> Self {
        Self::InvalidUrl(msg.into())
    }
}

impl From<url::ParseError> for DashError {
    fn from(e: url::ParseError) -> Self {
        Self::InvalidUrl(e.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for DashError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::WebSocket(e.to_string())
    }
}
