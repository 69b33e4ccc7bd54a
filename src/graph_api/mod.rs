use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::notify::{LogNotifier, Notifier};
use crate::util::graph_url;

use self::transport::{GraphRequest, GraphResponse, ReqwestTransport, Transport};

pub mod fb;
pub mod ig;
pub mod media;
pub mod transport;

// Available outside of tests so integration tests can script the remote.
pub mod mock;

pub const GRAPH_URL: &str = "https://graph.facebook.com/v19.0";

/// Processing state of a media container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerStatus {
    InProgress,
    Finished,
    Published,
    Error,
    Expired,
    Other(String),
}

impl ContainerStatus {
    pub fn from_code(code: &str) -> Self {
        match code {
            "IN_PROGRESS" => ContainerStatus::InProgress,
            "FINISHED" => ContainerStatus::Finished,
            "PUBLISHED" => ContainerStatus::Published,
            "ERROR" => ContainerStatus::Error,
            "EXPIRED" => ContainerStatus::Expired,
            other => ContainerStatus::Other(other.to_string()),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            ContainerStatus::InProgress => "IN_PROGRESS",
            ContainerStatus::Finished => "FINISHED",
            ContainerStatus::Published => "PUBLISHED",
            ContainerStatus::Error => "ERROR",
            ContainerStatus::Expired => "EXPIRED",
            ContainerStatus::Other(code) => code,
        }
    }

    /// Processing stopped and the container can never be published.
    pub fn is_failure(&self) -> bool {
        matches!(self, ContainerStatus::Error | ContainerStatus::Expired)
    }
}

impl fmt::Display for ContainerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadStatus {
    pub code: ContainerStatus,
    /// Human readable `status` field, e.g. the reason for an `ERROR`.
    pub detail: Option<String>,
}

/// Shared Graph API plumbing: base URL, transport and error notifier.
///
/// Cheap to clone; clones share the transport and notifier.
#[derive(Clone)]
pub struct GraphApi {
    config: Arc<Config>,
    transport: Arc<dyn Transport>,
    notifier: Arc<dyn Notifier>,
}

impl GraphApi {
    /// A client talking HTTP through reqwest, reporting errors to the log.
    pub fn new(config: Config) -> Self {
        Self::with_transport(config, Arc::new(ReqwestTransport::new()))
    }

    pub fn with_transport(config: Config, transport: Arc<dyn Transport>) -> Self {
        GraphApi {
            config: Arc::new(config),
            transport,
            notifier: Arc::new(LogNotifier),
        }
    }

    pub fn with_notifier(mut self, notifier: impl Notifier + 'static) -> Self {
        self.notifier = Arc::new(notifier);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn url(&self, path: &str) -> String {
        graph_url(&self.config.base_url, path)
    }

    pub async fn send(&self, request: GraphRequest) -> Result<GraphResponse> {
        debug!(method = ?request.method, url = %request.url, "Graph API request");
        self.transport.send(request).await
    }

    pub(crate) fn notify(&self, message: &str) {
        self.notifier.notify(message);
    }

    pub async fn get_upload_status(&self, id: &str, access_token: &str) -> Result<UploadStatus> {
        let resp = self
            .send(
                GraphRequest::get(self.url(id))
                    .param("fields", "status_code,status")
                    .param("access_token", access_token),
            )
            .await?;

        if !resp.is_success() || resp.error().is_some() {
            return Err(Error::Graph {
                status: resp.status,
                error: resp.graph_error(),
            });
        }

        let code = resp.str_field("status_code").ok_or_else(|| Error::Graph {
            status: resp.status,
            error: resp.graph_error(),
        })?;

        Ok(UploadStatus {
            code: ContainerStatus::from_code(&code),
            detail: resp.str_field("status"),
        })
    }
}
