//! HTTP client for a running OrbitChat server, used by `orbitchat chat`.

use std::time::Duration;

use futures::{Stream, StreamExt};
use orbitchat_core::message::Message;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("cannot reach the server at {url}: {reason}")]
    Unreachable { url: String, reason: String },

    #[error("the server took too long to answer")]
    Timeout,

    #[error("server error {status} ({kind}): {message}")]
    Server {
        status: u16,
        kind: String,
        message: String,
    },

    #[error("unexpected response from server: {0}")]
    Decode(String),

    #[error("reply interrupted: {0}")]
    Interrupted(String),
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    messages: &'a [Message],
}

#[derive(Deserialize)]
struct ChatResponse {
    reply: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
    kind: String,
}

pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Unreachable {
                url: base_url.clone(),
                reason: e.to_string(),
            })?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /health`; any non-2xx answer counts as unhealthy.
    pub async fn health(&self) -> Result<(), ClientError> {
        let response = self
            .http
            .get(format!("{}/health", self.base_url))
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .map_err(|e| self.transport(e))?;
        Self::check(response).await.map(|_| ())
    }

    /// Buffered chat: the whole reply at once.
    pub async fn chat(&self, messages: &[Message]) -> Result<String, ClientError> {
        let response = self
            .http
            .post(format!("{}/api/chat", self.base_url))
            .json(&ChatRequest { messages })
            .send()
            .await
            .map_err(|e| self.transport(e))?;

        let body: ChatResponse = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))?;
        Ok(body.reply)
    }

    /// Streamed chat: raw body chunks as the server writes them.
    ///
    /// Chunks are bytes, not text: a UTF-8 character may span two chunks.
    pub async fn chat_stream(
        &self,
        messages: &[Message],
    ) -> Result<impl Stream<Item = Result<Vec<u8>, ClientError>> + use<>, ClientError> {
        let response = self
            .http
            .post(format!("{}/api/chat/stream", self.base_url))
            .json(&ChatRequest { messages })
            .send()
            .await
            .map_err(|e| self.transport(e))?;

        let response = Self::check(response).await?;
        Ok(response.bytes_stream().map(|chunk| {
            chunk
                .map(|bytes| bytes.to_vec())
                .map_err(|e| ClientError::Interrupted(e.to_string()))
        }))
    }

    fn transport(&self, e: reqwest::Error) -> ClientError {
        if e.is_timeout() {
            ClientError::Timeout
        } else {
            ClientError::Unreachable {
                url: self.base_url.clone(),
                reason: e.to_string(),
            }
        }
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let (kind, message) = match serde_json::from_str::<ErrorBody>(&text) {
            Ok(body) => (body.kind, body.error),
            Err(_) => ("http".to_string(), text),
        };
        Err(ClientError::Server {
            status: status.as_u16(),
            kind,
            message,
        })
    }
}
