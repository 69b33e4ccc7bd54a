//! Error types for graph-poster

use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Publish failed: {message}")]
    Publish {
        message: String,
        #[source]
        source: Option<Box<Error>>,
    },

    #[error("Container {container_id} was not ready after {timeout:?}")]
    ProcessingTimeout {
        container_id: String,
        timeout: Duration,
    },

    #[error("Container {container_id} stopped processing with status {status}")]
    ContainerFailed { container_id: String, status: String },

    #[error("Status query for {container_id} failed after {attempts} attempt(s): {source}")]
    StatusQuery {
        container_id: String,
        attempts: u32,
        #[source]
        source: Box<Error>,
    },

    #[error("Waiting for container {container_id} was cancelled")]
    Cancelled { container_id: String },

    #[error("Token exchange failed: {0}")]
    TokenExchange(String),

    #[error("Graph API error (HTTP {status}): {error}")]
    Graph { status: u16, error: GraphError },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Token store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether retrying the same request later may succeed.
    ///
    /// Network failures and server-side (5xx) Graph errors are transient, as is
    /// any Graph error the remote flags with `is_transient`.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Http(_) | Error::Io(_) => true,
            Error::Graph { status, error } => *status >= 500 || error.is_transient,
            Error::Publish { source: Some(source), .. } => source.is_transient(),
            _ => false,
        }
    }
}

/// The `error` object the Graph API puts in failed responses.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GraphError {
    #[serde(default)]
    pub message: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub error_subcode: Option<i64>,
    #[serde(default)]
    pub is_transient: bool,
    #[serde(default)]
    pub fbtrace_id: Option<String>,
}

impl GraphError {
    pub fn new(message: impl Into<String>) -> Self {
        GraphError {
            message: message.into(),
            ..Default::default()
        }
    }
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.kind, self.code) {
            (Some(kind), Some(code)) => write!(f, "{} ({kind}, code {code})", self.message),
            (Some(kind), None) => write!(f, "{} ({kind})", self.message),
            (None, Some(code)) => write!(f, "{} (code {code})", self.message),
            (None, None) => write!(f, "{}", self.message),
        }
    }
}
