//! Error types for the animal ETL pipeline
//!
//! Retryability is a property of the error itself: transport failures and
//! 500/502/503/504 responses are retried by [`RetryPolicy`](crate::retry::RetryPolicy),
//! everything else is terminal for the request that produced it.

use reqwest::Method;
use thiserror::Error;

/// Result type alias for ETL operations
pub type Result<T> = std::result::Result<T, EtlError>;

#[derive(Error, Debug)]
pub enum EtlError {
    /// Connection failure, timeout, or a body that could not be read
    #[error("{method} {url} failed: {message}")]
    Transport {
        method: Method,
        url: String,
        message: String,
    },

    /// 500, 502, 503 or 504 from the remote side
    #[error("{method} {url} returned server error {status}")]
    ServerError {
        method: Method,
        url: String,
        status: u16,
    },

    /// Any other non-2xx status. Never retried.
    #[error("{method} {url} returned unexpected status {status}")]
    UnexpectedStatus {
        method: Method,
        url: String,
        status: u16,
    },

    #[error("Failed to {method} {url} after {attempts} attempts: {last_error}")]
    RetryExhausted {
        method: Method,
        url: String,
        attempts: u32,
        last_error: String,
    },

    /// The response arrived but its body is not what the endpoint promises
    #[error("Invalid response from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EtlError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a decode error for a response body
    pub fn decode(url: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Decode {
            url: url.into(),
            message: msg.into(),
        }
    }

    /// Whether another attempt at the same request may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::ServerError { .. })
    }
}

impl From<config::ConfigError> for EtlError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}
