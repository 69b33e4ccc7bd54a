//! Scripted transport for tests
//!
//! Replies are handed out in the order they were queued, one per request,
//! and every request is recorded so tests can assert on what was sent.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{Error, GraphError, Result};
use crate::graph_api::transport::{GraphRequest, GraphResponse, Transport};

pub enum MockReply {
    Response(GraphResponse),
    Fail(Error),
}

#[derive(Default)]
pub struct MockTransport {
    replies: Mutex<VecDeque<MockReply>>,
    requests: Mutex<Vec<GraphRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a 200 response with `body`.
    pub fn reply(&self, body: Value) -> &Self {
        self.reply_status(200, body)
    }

    pub fn reply_status(&self, status: u16, body: Value) -> &Self {
        self.push(MockReply::Response(GraphResponse::new(status, body)))
    }

    /// Queue a failure that happens before any response arrives.
    pub fn fail(&self, error: Error) -> &Self {
        self.push(MockReply::Fail(error))
    }

    /// Queue a container status reply.
    pub fn status(&self, code: &str) -> &Self {
        self.reply(serde_json::json!({ "status_code": code, "id": "container" }))
    }

    fn push(&self, reply: MockReply) -> &Self {
        self.replies.lock().unwrap().push_back(reply);
        self
    }

    pub fn requests(&self) -> Vec<GraphRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Requests whose URL ends with `suffix`.
    pub fn requests_to(&self, suffix: &str) -> Vec<GraphRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.url.ends_with(suffix))
            .cloned()
            .collect()
    }

    pub fn remaining_replies(&self) -> usize {
        self.replies.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: GraphRequest) -> Result<GraphResponse> {
        let url = request.url.clone();
        self.requests.lock().unwrap().push(request);

        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            Some(MockReply::Response(resp)) => Ok(resp),
            Some(MockReply::Fail(err)) => Err(err),
            None => Err(Error::Graph {
                status: 400,
                error: GraphError::new(format!("MockTransport: no reply queued for {url}")),
            }),
        }
    }
}
