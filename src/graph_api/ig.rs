use std::time::Duration;

use serde_json::Value;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::graph_api::media::{ContainerParams, MediaSource};
use crate::graph_api::transport::GraphRequest;
use crate::graph_api::{ContainerStatus, GraphApi, UploadStatus};

/// How long and how often to wait for a container to finish processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOptions {
    pub timeout: Duration,
    pub interval: Duration,
    /// Consecutive transient status query failures tolerated before giving up.
    pub max_status_retries: u32,
}

impl Default for PollOptions {
    fn default() -> Self {
        PollOptions {
            timeout: Duration::from_secs(120),
            interval: Duration::from_secs(5),
            max_status_retries: 3,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishOptions {
    /// Stage the media without making it live.
    pub is_draft: bool,
}

#[derive(Debug, Clone, Default)]
pub struct UploadOptions {
    pub is_draft: bool,
    /// Falls back to the configured poll options when unset.
    pub poll: Option<PollOptions>,
    pub cancel: Option<CancellationToken>,
}

/// Raw response of a publish call.
///
/// Depending on the request it carries the published media id or only a
/// draft confirmation, so it is handed back as the remote sent it.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishResult {
    body: Value,
}

impl PublishResult {
    pub fn media_id(&self) -> Option<&str> {
        self.body.get("id").and_then(Value::as_str)
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    pub fn into_inner(self) -> Value {
        self.body
    }
}

pub struct MediaPublisher {
    api: GraphApi,
    user_id: String,
}

impl MediaPublisher {
    /// Publisher for the configured Instagram user.
    pub fn new(api: GraphApi) -> Result<Self> {
        let user_id = api.config().require_user_id()?.to_string();
        Ok(MediaPublisher { api, user_id })
    }

    pub fn with_user_id(api: GraphApi, user_id: impl Into<String>) -> Self {
        MediaPublisher {
            api,
            user_id: user_id.into(),
        }
    }

    pub fn api(&self) -> &GraphApi {
        &self.api
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// URL of an edge of the publishing user, e.g. `{user_id}/media`.
    fn user_edge(&self, edge: &str) -> String {
        self.api.url(&format!("{}/{edge}", self.user_id))
    }

    pub async fn create_container(
        &self,
        params: &ContainerParams,
        access_token: &str,
    ) -> Result<String> {
        let result = self.try_create_container(params, access_token).await;
        if let Err(err) = &result {
            self.api.notify(&format!("Exception during content uploading: {err}"));
        }

        result
    }

    async fn try_create_container(
        &self,
        params: &ContainerParams,
        access_token: &str,
    ) -> Result<String> {
        let request = params.to_request(self.user_edge("media"), access_token)?;
        let resp = self.api.send(request).await?;

        match resp.str_field("id") {
            Some(id) => {
                info!(
                    container_id = %id,
                    media_type = ?params.media_type,
                    "Created media container"
                );
                Ok(id)
            }
            None => Err(Error::Upload(format!("No container id returned: {}", resp.graph_error()))),
        }
    }

    pub async fn container_status(
        &self,
        container_id: &str,
        access_token: &str,
    ) -> Result<UploadStatus> {
        self.api.get_upload_status(container_id, access_token).await
    }

    /// Wait until the container reports `FINISHED`.
    ///
    /// The first query goes out immediately, the rest every `poll.interval`.
    /// No query is sent once `poll.timeout` has elapsed and no sleep runs past
    /// it. Returns `Ok(false)` on timeout. Transient query failures are retried
    /// on the next tick up to `poll.max_status_retries` times in a row; other
    /// query failures surface as [`Error::StatusQuery`]. An `ERROR` or
    /// `EXPIRED` status is [`Error::ContainerFailed`]. Cancelling `cancel`
    /// ends the wait at once with [`Error::Cancelled`]. A zero `poll.interval`
    /// is a [`Error::Config`] and sends nothing.
    pub async fn poll_until_ready(
        &self,
        container_id: &str,
        access_token: &str,
        poll: &PollOptions,
        cancel: &CancellationToken,
    ) -> Result<bool> {
        if poll.interval.is_zero() {
            return Err(Error::Config("poll interval must be greater than zero".to_string()));
        }

        let deadline = Instant::now() + poll.timeout;
        let mut failures = 0u32;

        loop {
            match self.container_status(container_id, access_token).await {
                Ok(status) => {
                    failures = 0;
                    match status.code {
                        ContainerStatus::Finished => {
                            info!(container_id, "Container is ready");
                            return Ok(true);
                        }
                        ref code if code.is_failure() => {
                            let status = match status.detail {
                                Some(detail) => format!("{code} ({detail})"),
                                None => code.to_string(),
                            };
                            return Err(Error::ContainerFailed {
                                container_id: container_id.to_string(),
                                status,
                            });
                        }
                        ref code => {
                            debug!(container_id, status = %code, "Container still processing")
                        }
                    }
                }
                Err(err) if err.is_transient() && failures < poll.max_status_retries => {
                    failures += 1;
                    warn!(container_id, attempt = failures, "Status query failed, retrying: {err}");
                }
                Err(err) => {
                    return Err(Error::StatusQuery {
                        container_id: container_id.to_string(),
                        attempts: failures + 1,
                        source: Box::new(err),
                    });
                }
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(false);
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(Error::Cancelled { container_id: container_id.to_string() });
                }
                _ = sleep_until((now + poll.interval).min(deadline)) => {}
            }

            if Instant::now() >= deadline {
                return Ok(false);
            }
        }
    }

    pub async fn publish(
        &self,
        container_id: &str,
        access_token: &str,
        options: &PublishOptions,
    ) -> Result<PublishResult> {
        let mut request = GraphRequest::post(self.user_edge("media_publish"))
            .param("creation_id", container_id)
            .param("access_token", access_token);
        if options.is_draft {
            request = request.param("is_draft", "true");
        }

        let result = match self.api.send(request).await {
            Ok(resp) if resp.is_success() && resp.error().is_none() => {
                info!(container_id, is_draft = options.is_draft, "Published container");
                Ok(PublishResult { body: resp.body })
            }
            Ok(resp) => Err(Error::Publish {
                message: resp.graph_error().to_string(),
                source: None,
            }),
            Err(err) => Err(Error::Publish {
                message: err.to_string(),
                source: Some(Box::new(err)),
            }),
        };

        if let Err(err) = &result {
            self.api.notify(&format!("Exception during content publishing: {err}"));
        }

        result
    }

    /// Create a container, wait for it to process, then publish it.
    ///
    /// Every failure is returned; nothing is published unless the container
    /// reached `FINISHED`.
    pub async fn upload_reel(
        &self,
        params: &ContainerParams,
        access_token: &str,
        options: &UploadOptions,
    ) -> Result<PublishResult> {
        let container_id = self.create_container(params, access_token).await?;

        let poll = options.poll.clone().unwrap_or_else(|| self.api.config().poll.clone());
        let cancel = options.cancel.clone().unwrap_or_else(CancellationToken::new);

        let ready = match self.poll_until_ready(&container_id, access_token, &poll, &cancel).await {
            Ok(ready) => ready,
            Err(err) => {
                self.api.notify(&format!(
                    "Exception while waiting for container {container_id}: {err}"
                ));
                return Err(err);
            }
        };
        if !ready {
            let err = Error::ProcessingTimeout {
                container_id,
                timeout: poll.timeout,
            };
            self.api.notify(&err.to_string());
            return Err(err);
        }

        self.publish(&container_id, access_token, &PublishOptions { is_draft: options.is_draft })
            .await
    }

    pub async fn upload_story(
        &self,
        video_url: &str,
        access_token: &str,
        options: &UploadOptions,
    ) -> Result<PublishResult> {
        self.upload_reel(&ContainerParams::story(video_url), access_token, options)
            .await
    }

    /// Upload video and thumbnail in the request body as a `VIDEO` container.
    pub async fn upload_video(
        &self,
        video: MediaSource,
        thumbnail: MediaSource,
        caption: &str,
        access_token: &str,
        options: &UploadOptions,
    ) -> Result<PublishResult> {
        self.upload_reel(&ContainerParams::video(video, thumbnail, caption), access_token, options)
            .await
    }

    /// Image container from a URL. No processing wait is needed.
    ///
    /// `None` when the remote refuses the image.
    pub async fn upload_image_by_url(
        &self,
        image_url: &str,
        access_token: &str,
    ) -> Result<Option<String>> {
        self.create_unpolled(&ContainerParams::image(image_url), access_token)
            .await
    }

    pub async fn upload_carousel_item(
        &self,
        image_url: &str,
        access_token: &str,
    ) -> Result<Option<String>> {
        self.create_unpolled(&ContainerParams::image(image_url).as_carousel_item(), access_token)
            .await
    }

    /// Combine already uploaded children into a carousel container.
    pub async fn publish_carousel(
        &self,
        media_ids: &[String],
        caption: &str,
        access_token: &str,
    ) -> Result<Option<String>> {
        self.create_unpolled(&ContainerParams::carousel(media_ids.to_vec(), caption), access_token)
            .await
    }

    async fn create_unpolled(
        &self,
        params: &ContainerParams,
        access_token: &str,
    ) -> Result<Option<String>> {
        let request = params.to_request(self.user_edge("media"), access_token)?;
        let resp = self.api.send(request).await?;

        match resp.str_field("id") {
            Some(id) => {
                info!(
                    container_id = %id,
                    media_type = ?params.media_type,
                    "Created media container"
                );
                Ok(Some(id))
            }
            None => {
                self.api.notify(&format!(
                    "{:?} container was not created: {}",
                    params.media_type,
                    resp.graph_error()
                ));
                Ok(None)
            }
        }
    }
}
