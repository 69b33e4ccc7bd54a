//! Parameters of a media container creation call.

use std::path::PathBuf;

use serde::Serialize;

use crate::error::Result;
use crate::graph_api::transport::{FilePart, GraphRequest, PartData};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Reels,
    Video,
    Stories,
    Image,
    Carousel,
}

impl MediaType {
    /// Value of the `media_type` field. Plain images send none.
    pub fn as_param(&self) -> Option<&'static str> {
        match self {
            MediaType::Reels => Some("REELS"),
            MediaType::Video => Some("VIDEO"),
            MediaType::Stories => Some("STORIES"),
            MediaType::Carousel => Some("CAROUSEL"),
            MediaType::Image => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MediaSource {
    /// Publicly reachable URL the remote fetches itself.
    Url(String),
    Bytes(Vec<u8>),
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserTag {
    pub username: String,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContainerParams {
    pub media_type: MediaType,
    pub source: Option<MediaSource>,
    pub caption: Option<String>,
    pub cover_url: Option<String>,
    pub collaborators: Vec<String>,
    pub audio_name: Option<String>,
    pub user_tags: Vec<UserTag>,
    pub location_id: Option<String>,
    /// Frame used as thumbnail, in milliseconds from the start.
    pub thumb_offset: Option<u64>,
    pub share_to_feed: Option<bool>,
    pub children: Vec<String>,
    pub carousel_item: bool,
    /// Uploaded as the `thumbnail` part; a URL is sent as `cover_url` instead.
    pub thumbnail: Option<MediaSource>,
}

impl ContainerParams {
    pub fn new(media_type: MediaType) -> Self {
        ContainerParams {
            media_type,
            source: None,
            caption: None,
            cover_url: None,
            collaborators: Vec::new(),
            audio_name: None,
            user_tags: Vec::new(),
            location_id: None,
            thumb_offset: None,
            share_to_feed: None,
            children: Vec::new(),
            carousel_item: false,
            thumbnail: None,
        }
    }

    pub fn reel(video_url: impl Into<String>, caption: impl Into<String>) -> Self {
        Self::new(MediaType::Reels)
            .with_source(MediaSource::Url(video_url.into()))
            .with_caption(caption)
    }

    pub fn story(video_url: impl Into<String>) -> Self {
        Self::new(MediaType::Stories).with_source(MediaSource::Url(video_url.into()))
    }

    /// Video uploaded in the request body, with a thumbnail image.
    pub fn video(video: MediaSource, thumbnail: MediaSource, caption: impl Into<String>) -> Self {
        let mut params = Self::new(MediaType::Video).with_source(video).with_caption(caption);
        params.thumbnail = Some(thumbnail);
        params
    }

    pub fn image(image_url: impl Into<String>) -> Self {
        Self::new(MediaType::Image).with_source(MediaSource::Url(image_url.into()))
    }

    pub fn carousel(children: Vec<String>, caption: impl Into<String>) -> Self {
        let mut params = Self::new(MediaType::Carousel).with_caption(caption);
        params.children = children;
        params
    }

    pub fn with_source(mut self, source: MediaSource) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    pub fn with_cover_url(mut self, cover_url: impl Into<String>) -> Self {
        self.cover_url = Some(cover_url.into());
        self
    }

    pub fn with_collaborators(mut self, collaborators: Vec<String>) -> Self {
        self.collaborators = collaborators;
        self
    }

    pub fn with_audio_name(mut self, audio_name: impl Into<String>) -> Self {
        self.audio_name = Some(audio_name.into());
        self
    }

    pub fn with_user_tags(mut self, user_tags: Vec<UserTag>) -> Self {
        self.user_tags = user_tags;
        self
    }

    pub fn with_location_id(mut self, location_id: impl Into<String>) -> Self {
        self.location_id = Some(location_id.into());
        self
    }

    pub fn with_thumb_offset(mut self, millis: u64) -> Self {
        self.thumb_offset = Some(millis);
        self
    }

    pub fn with_share_to_feed(mut self, share: bool) -> Self {
        self.share_to_feed = Some(share);
        self
    }

    pub fn as_carousel_item(mut self) -> Self {
        self.carousel_item = true;
        self
    }

    pub(crate) fn to_request(&self, url: String, access_token: &str) -> Result<GraphRequest> {
        let mut req = GraphRequest::post(url);

        if let Some(media_type) = self.media_type.as_param() {
            req = req.param("media_type", media_type);
        }

        let is_image = self.media_type == MediaType::Image;
        match &self.source {
            Some(MediaSource::Url(url)) => {
                req = req.param(if is_image { "image_url" } else { "video_url" }, url.as_str());
            }
            Some(source) => {
                let (field, file_name, mime) = if is_image {
                    ("image", "image.jpg", "image/jpeg")
                } else {
                    ("video", "video.mp4", "video/mp4")
                };
                if let Some(part) = file_part(field, file_name, mime, source) {
                    req = req.file(part);
                }
            }
            None => {}
        }

        if let Some(caption) = &self.caption {
            req = req.param("caption", caption.as_str());
        }

        let cover_url = match (&self.cover_url, &self.thumbnail) {
            (Some(cover), _) => Some(cover.as_str()),
            (None, Some(MediaSource::Url(url))) => Some(url.as_str()),
            _ => None,
        };
        if let Some(cover) = cover_url {
            req = req.param("cover_url", cover);
        }
        if let Some(part) = self
            .thumbnail
            .as_ref()
            .and_then(|thumbnail| file_part("thumbnail", "thumbnail.jpg", "image/jpeg", thumbnail))
        {
            req = req.file(part);
        }

        if !self.collaborators.is_empty() {
            req = req.param("collaborators", serde_json::to_string(&self.collaborators)?);
        }
        if let Some(audio_name) = &self.audio_name {
            req = req.param("audio_name", audio_name.as_str());
        }
        if !self.user_tags.is_empty() {
            req = req.param("user_tags", serde_json::to_string(&self.user_tags)?);
        }
        if let Some(location_id) = &self.location_id {
            req = req.param("location_id", location_id.as_str());
        }
        if let Some(offset) = self.thumb_offset {
            req = req.param("thumb_offset", offset.to_string());
        }
        if let Some(share) = self.share_to_feed {
            req = req.param("share_to_feed", share.to_string());
        }
        if !self.children.is_empty() {
            req = req.param("children", self.children.join(","));
        }
        if self.carousel_item {
            req = req.param("is_carousel_item", "true");
        }

        Ok(req.param("access_token", access_token))
    }
}

// None for URL sources, which travel as params.
fn file_part(field: &str, file_name: &str, mime: &str, source: &MediaSource) -> Option<FilePart> {
    let data = match source {
        MediaSource::Bytes(bytes) => PartData::Bytes(bytes.clone()),
        MediaSource::File(path) => PartData::File(path.clone()),
        MediaSource::Url(_) => return None,
    };

    Some(FilePart {
        field: field.to_string(),
        file_name: file_name.to_string(),
        mime: mime.to_string(),
        data,
    })
}
