use std::path::PathBuf;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::{GraphError, Result};
use crate::util::file_to_body;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PartData {
    Bytes(Vec<u8>),
    File(PathBuf),
}

/// A file sent as one part of a multipart body.
#[derive(Debug, Clone, PartialEq)]
pub struct FilePart {
    pub field: String,
    pub file_name: String,
    pub mime: String,
    pub data: PartData,
}

/// A Graph API call before it hits the wire.
///
/// GET params go to the query string. POST params go to a urlencoded form,
/// or to a multipart form when `files` is non-empty.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphRequest {
    pub method: Method,
    pub url: String,
    pub params: Vec<(String, String)>,
    pub files: Vec<FilePart>,
}

impl GraphRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::Post, url)
    }

    fn new(method: Method, url: impl Into<String>) -> Self {
        GraphRequest {
            method,
            url: url.into(),
            params: Vec::new(),
            files: Vec::new(),
        }
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    pub fn file(mut self, part: FilePart) -> Self {
        self.files.push(part);
        self
    }

    pub fn param_value(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraphResponse {
    pub status: u16,
    pub body: Value,
}

impl GraphResponse {
    pub fn new(status: u16, body: Value) -> Self {
        GraphResponse { status, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The `error` object of the body, if the remote sent one.
    pub fn error(&self) -> Option<GraphError> {
        self.body
            .get("error")
            .and_then(|e| serde_json::from_value(e.clone()).ok())
    }

    /// A string field of the body. Numeric ids are accepted too.
    pub fn str_field(&self, key: &str) -> Option<String> {
        match self.body.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// The remote's error, or a synthetic one quoting the whole body.
    pub fn graph_error(&self) -> GraphError {
        self.error()
            .unwrap_or_else(|| GraphError::new(format!("Unexpected response: {}", self.body)))
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: GraphRequest) -> Result<GraphResponse>;
}

pub struct ReqwestTransport {
    client: Client,
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    pub fn with_client(client: Client) -> Self {
        ReqwestTransport { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: GraphRequest) -> Result<GraphResponse> {
        let GraphRequest { method, url, params, files } = request;

        let req = match method {
            Method::Get => self.client.get(&url).query(&params),
            Method::Post if files.is_empty() => self.client.post(&url).form(&params),
            Method::Post => {
                let mut form = Form::new();
                for (key, value) in params {
                    form = form.text(key, value);
                }
                for file in files {
                    let field = file.field.clone();
                    form = form.part(field, to_part(file).await?);
                }
                self.client.post(&url).multipart(form)
            }
        };

        let resp = req.send().await?;
        let status = resp.status().as_u16();
        let text = resp.text().await?;
        debug!(status, url = %url, "Graph API responded");

        Ok(GraphResponse::new(status, decode_body(status, &text)?))
    }
}

/// Parse a response body. Only successful responses must be JSON; a failed
/// one that is not (a gateway's HTML page, say) is kept as an error message
/// so the status code still decides how the failure is handled.
pub(crate) fn decode_body(status: u16, text: &str) -> Result<Value> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }

    match serde_json::from_str(text) {
        Ok(body) => Ok(body),
        Err(err) if (200..300).contains(&status) => Err(err.into()),
        Err(_) => {
            let excerpt: String = text.trim().chars().take(200).collect();
            Ok(json!({ "error": { "message": format!("HTTP {status}: {excerpt}") } }))
        }
    }
}

async fn to_part(file: FilePart) -> Result<Part> {
    let part = match file.data {
        PartData::Bytes(bytes) => Part::bytes(bytes),
        PartData::File(path) => {
            let content = tokio::fs::File::open(&path).await?;
            let len = content.metadata().await?.len();
            Part::stream_with_length(file_to_body(content), len)
        }
    };

    Ok(part.file_name(file.file_name).mime_str(&file.mime)?)
}
