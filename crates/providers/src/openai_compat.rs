//! OpenAI-compatible provider implementation.
//!
//! Works with OpenAI and any endpoint exposing `/v1/chat/completions`
//! (OpenRouter, Ollama, vLLM, Together AI, ...).
//!
//! Supports:
//! - Chat completions (non-streaming and streaming SSE)
//! - Health checks

use async_trait::async_trait;
use futures::StreamExt;
use orbitchat_core::error::ProviderError;
use orbitchat_core::message::Message;
use orbitchat_core::provider::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Fallback wait when a 429 carries no usable `Retry-After` header.
const DEFAULT_RETRY_AFTER_SECS: u64 = 5;

/// An OpenAI-compatible LLM provider.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new OpenAI-compatible provider.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Convert our Message types to OpenAI API format.
    fn to_api_messages(messages: &[Message]) -> Vec<ApiMessage> {
        messages
            .iter()
            .map(|m| ApiMessage {
                role: m.role.as_str().into(),
                content: Some(m.content.clone()),
            })
            .collect()
    }

    fn request_body(request: &ProviderRequest, stream: bool) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": Self::to_api_messages(&request.messages),
            "stream": stream,
        });

        if stream {
            body["stream_options"] = serde_json::json!({ "include_usage": true });
        }

        if let Some(temperature) = request.temperature {
            body["temperature"] = serde_json::json!(temperature);
        }

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        body
    }

    /// POST to `/chat/completions` and map non-200 statuses to typed errors.
    async fn send(
        &self,
        body: &serde_json::Value,
        stream: bool,
    ) -> Result<reqwest::Response, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);

        let mut builder = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json");
        if stream {
            builder = builder.header("Accept", "text/event-stream");
        }

        let response = builder
            .json(body)
            .send()
            .await
            .map_err(|e| ProviderError::from_transport(e.is_timeout(), e.to_string()))?;

        let status = response.status().as_u16();

        if status == 429 {
            let retry_after_secs = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
            return Err(ProviderError::RateLimited { retry_after_secs });
        }

        if status == 401 || status == 403 {
            return Err(ProviderError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ));
        }

        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(provider = %self.name, status, body = %error_body, "Provider returned error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        let body = Self::request_body(&request, false);

        debug!(provider = %self.name, model = %request.model, "Sending completion request");

        let response = self.send(&body, false).await?;

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::MalformedResponse(format!("Failed to parse response: {e}")))?;

        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::MalformedResponse("No choices in response".into()))?;

        let usage = api_response.usage.map(Usage::from);

        Ok(ProviderResponse {
            message: Message::assistant(choice.message.content.unwrap_or_default()),
            usage,
            model: api_response.model,
        })
    }

    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
            .map_err(|e| ProviderError::from_transport(e.is_timeout(), e.to_string()))?;

        Ok(response.status().is_success())
    }

    async fn stream(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ChunkReceiver, ProviderError> {
        let body = Self::request_body(&request, true);

        debug!(provider = %self.name, model = %request.model, "Sending streaming request");

        let response = self.send(&body, true).await?;

        let (tx, rx) = tokio::sync::mpsc::channel(64);
        let provider_name = self.name.clone();

        // Spawn task to read the SSE byte stream and parse chunks
        tokio::spawn(async move {
            let mut byte_stream = response.bytes_stream();
            let mut lines = LineBuffer::default();
            let mut finished = false;

            while let Some(chunk_result) = byte_stream.next().await {
                let bytes = match chunk_result {
                    Ok(b) => b,
                    Err(e) => {
                        let _ = tx
                            .send(Err(ProviderError::StreamInterrupted(e.to_string())))
                            .await;
                        return;
                    }
                };

                lines.extend(&bytes);

                while let Some(line) = lines.next_line() {
                    match line.and_then(|line| parse_sse_line(&line)) {
                        Ok(SseLine::Skip) => {}
                        Ok(SseLine::Done) => {
                            let _ = tx.send(Ok(StreamChunk::done())).await;
                            return;
                        }
                        Ok(SseLine::Delta { content, finish }) => {
                            finished |= finish;
                            if let Some(content) = content {
                                if tx.send(Ok(StreamChunk::text(content))).await.is_err() {
                                    trace!(provider = %provider_name, "Stream receiver dropped");
                                    return;
                                }
                            }
                        }
                        Ok(SseLine::Usage(usage)) => {
                            let _ = tx
                                .send(Ok(StreamChunk {
                                    content: None,
                                    done: true,
                                    usage: Some(usage),
                                }))
                                .await;
                            return;
                        }
                        Err(e) => {
                            warn!(provider = %provider_name, error = %e, "Bad SSE chunk");
                            let _ = tx.send(Err(e)).await;
                            return;
                        }
                    }
                }
            }

            // Connection closed without [DONE]
            let last = if finished {
                Ok(StreamChunk::done())
            } else {
                Err(ProviderError::StreamInterrupted(
                    "upstream closed the stream before completion".into(),
                ))
            };
            let _ = tx.send(last).await;
        });

        Ok(rx)
    }
}

/// Accumulates raw SSE bytes and hands out complete lines.
///
/// Network chunks can end inside a multi-byte character, so bytes are only
/// decoded once a whole line has arrived.
#[derive(Debug, Default)]
struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    fn extend(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
    }

    /// The next complete line without its terminator, or `None` until more
    /// bytes arrive.
    fn next_line(&mut self) -> Option<Result<String, ProviderError>> {
        let end = self.pending.iter().position(|&b| b == b'\n')?;
        let mut line: Vec<u8> = self.pending.drain(..=end).collect();
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Some(String::from_utf8(line).map_err(|e| {
            ProviderError::MalformedResponse(format!("SSE line is not valid UTF-8: {e}"))
        }))
    }
}

/// One decoded line of an OpenAI SSE stream.
#[derive(Debug, PartialEq)]
enum SseLine {
    /// Blank line, comment, or a field we don't use.
    Skip,
    /// `data: [DONE]`
    Done,
    Delta {
        content: Option<String>,
        finish: bool,
    },
    /// Usage-only chunk sent after the last delta (`stream_options.include_usage`).
    Usage(Usage),
}

fn parse_sse_line(line: &str) -> Result<SseLine, ProviderError> {
    if line.is_empty() || line.starts_with(':') {
        return Ok(SseLine::Skip);
    }

    let Some(data) = line.strip_prefix("data:") else {
        return Ok(SseLine::Skip);
    };
    let data = data.trim();

    if data == "[DONE]" {
        return Ok(SseLine::Done);
    }

    let chunk: StreamResponse = serde_json::from_str(data)
        .map_err(|e| ProviderError::MalformedResponse(format!("Unparseable SSE chunk: {e}")))?;

    if let Some(error) = chunk.error {
        return Err(ProviderError::ApiError {
            status_code: 200,
            message: error.message,
        });
    }

    if let Some(choice) = chunk.choices.into_iter().next() {
        let content = choice.delta.content.filter(|c| !c.is_empty());
        return Ok(SseLine::Delta {
            content,
            finish: choice.finish_reason.is_some(),
        });
    }

    match chunk.usage {
        Some(usage) => Ok(SseLine::Usage(usage.into())),
        None => Ok(SseLine::Skip),
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    model: String,
    choices: Vec<ApiChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

impl From<ApiUsage> for Usage {
    fn from(u: ApiUsage) -> Self {
        Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        }
    }
}

// --- Streaming SSE types ---

/// A single SSE `data: {...}` chunk from a streaming response.
#[derive(Debug, Deserialize)]
struct StreamResponse {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
    #[serde(default)]
    error: Option<StreamError>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamError {
    #[serde(default)]
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider_for(server: &MockServer) -> OpenAiCompatProvider {
        OpenAiCompatProvider::new(
            "test",
            format!("{}/v1", server.uri()),
            "sk-test",
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn request() -> ProviderRequest {
        ProviderRequest::new("gpt-test", vec![Message::user("Hello")])
    }

    async fn drain(mut rx: ChunkReceiver) -> (Vec<String>, Option<ProviderError>) {
        let mut fragments = Vec::new();
        while let Some(item) = rx.recv().await {
            match item {
                Ok(chunk) => {
                    if let Some(c) = chunk.content {
                        fragments.push(c);
                    }
                    if chunk.done {
                        return (fragments, None);
                    }
                }
                Err(e) => return (fragments, Some(e)),
            }
        }
        (fragments, None)
    }

    #[test]
    fn message_conversion() {
        let messages = vec![Message::system("You are helpful"), Message::user("Hello")];
        let api_messages = OpenAiCompatProvider::to_api_messages(&messages);
        assert_eq!(api_messages.len(), 2);
        assert_eq!(api_messages[0].role, "system");
        assert_eq!(api_messages[1].role, "user");
    }

    #[test]
    fn request_body_omits_unset_sampling_fields() {
        let body = OpenAiCompatProvider::request_body(&request(), false);
        assert!(body.get("temperature").is_none());
        assert!(body.get("max_tokens").is_none());
        assert_eq!(body["stream"], false);

        let mut req = request();
        req.temperature = Some(0.2);
        let body = OpenAiCompatProvider::request_body(&req, true);
        assert!(body.get("temperature").is_some());
        assert_eq!(body["stream_options"]["include_usage"], true);
    }

    // --- SSE parsing tests ---

    #[test]
    fn line_buffer_joins_character_split_across_chunks() {
        let line = "data: {\"choices\":[{\"delta\":{\"content\":\"-62 °C\"},\"finish_reason\":null}]}\n";
        let bytes = line.as_bytes();
        let split = line.find('°').unwrap() + 1;

        let mut lines = LineBuffer::default();
        lines.extend(&bytes[..split]);
        assert!(lines.next_line().is_none());
        lines.extend(&bytes[split..]);

        let decoded = lines.next_line().unwrap().unwrap();
        assert_eq!(
            parse_sse_line(&decoded).unwrap(),
            SseLine::Delta {
                content: Some("-62 °C".into()),
                finish: false
            }
        );
        assert!(lines.next_line().is_none());
    }

    #[test]
    fn line_buffer_strips_crlf_and_keeps_remainder() {
        let mut lines = LineBuffer::default();
        lines.extend(b"data: [DONE]\r\n: keep");
        assert_eq!(lines.next_line().unwrap().unwrap(), "data: [DONE]");
        assert!(lines.next_line().is_none());
        lines.extend(b"-alive\n");
        assert_eq!(lines.next_line().unwrap().unwrap(), ": keep-alive");
    }

    #[test]
    fn line_buffer_rejects_invalid_utf8() {
        let mut lines = LineBuffer::default();
        lines.extend(b"data: \xff\xfe\n");
        assert!(matches!(
            lines.next_line().unwrap(),
            Err(ProviderError::MalformedResponse(_))
        ));
    }

    #[test]
    fn parse_stream_content_delta() {
        let line = r#"data: {"choices":[{"delta":{"content":"Hello"},"finish_reason":null}]}"#;
        assert_eq!(
            parse_sse_line(line).unwrap(),
            SseLine::Delta {
                content: Some("Hello".into()),
                finish: false
            }
        );
    }

    #[test]
    fn parse_stream_finish_chunk() {
        let line = r#"data: {"choices":[{"delta":{},"finish_reason":"stop"}]}"#;
        assert_eq!(
            parse_sse_line(line).unwrap(),
            SseLine::Delta {
                content: None,
                finish: true
            }
        );
    }

    #[test]
    fn parse_stream_done_and_comments() {
        assert_eq!(parse_sse_line("data: [DONE]").unwrap(), SseLine::Done);
        assert_eq!(parse_sse_line(": keep-alive").unwrap(), SseLine::Skip);
        assert_eq!(parse_sse_line("").unwrap(), SseLine::Skip);
        assert_eq!(parse_sse_line("event: message").unwrap(), SseLine::Skip);
    }

    #[test]
    fn parse_stream_usage() {
        let line = r#"data: {"choices":[],"usage":{"prompt_tokens":10,"completion_tokens":5,"total_tokens":15}}"#;
        let SseLine::Usage(usage) = parse_sse_line(line).unwrap() else {
            panic!("expected usage");
        };
        assert_eq!(usage.total_tokens, 15);
    }

    #[test]
    fn parse_stream_garbage_is_malformed() {
        let err = parse_sse_line("data: {not json").unwrap_err();
        assert_eq!(err.kind(), "malformed_response");
    }

    #[test]
    fn parse_stream_inline_error() {
        let line = r#"data: {"error":{"message":"overloaded"}}"#;
        let err = parse_sse_line(line).unwrap_err();
        assert!(err.to_string().contains("overloaded"));
    }

    // --- HTTP tests ---

    #[tokio::test]
    async fn complete_returns_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("Authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({"model": "gpt-test", "stream": false})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "model": "gpt-test",
                "choices": [{"message": {"role": "assistant", "content": "Hi there!"}}],
                "usage": {"prompt_tokens": 3, "completion_tokens": 3, "total_tokens": 6}
            })))
            .mount(&server)
            .await;

        let response = provider_for(&server).complete(request()).await.unwrap();
        assert_eq!(response.message.content, "Hi there!");
        assert_eq!(response.usage.unwrap().total_tokens, 6);
    }

    #[tokio::test]
    async fn unauthorized_maps_to_auth_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = provider_for(&server).complete(request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::AuthenticationFailed(_)));
    }

    #[tokio::test]
    async fn too_many_requests_reads_retry_after() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "12"))
            .mount(&server)
            .await;

        let err = provider_for(&server).complete(request()).await.unwrap_err();
        assert!(matches!(
            err,
            ProviderError::RateLimited {
                retry_after_secs: 12
            }
        ));
    }

    #[tokio::test]
    async fn empty_choices_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"model": "gpt-test", "choices": []})),
            )
            .mount(&server)
            .await;

        let err = provider_for(&server).complete(request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn non_json_body_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = provider_for(&server).complete(request()).await.unwrap_err();
        assert_eq!(err.kind(), "malformed_response");
    }

    #[tokio::test]
    async fn unreachable_host_is_network_error() {
        let provider = OpenAiCompatProvider::new(
            "test",
            "http://127.0.0.1:9/v1",
            "sk-test",
            Duration::from_secs(2),
        )
        .unwrap();
        let err = provider.complete(request()).await.unwrap_err();
        assert_eq!(err.kind(), "network");
    }

    #[tokio::test]
    async fn stream_yields_fragments_in_order() {
        let server = MockServer::start().await;
        let sse = [
            r#"data: {"choices":[{"delta":{"role":"assistant"},"finish_reason":null}]}"#,
            r#"data: {"choices":[{"delta":{"content":"Hello"},"finish_reason":null}]}"#,
            r#"data: {"choices":[{"delta":{"content":", "},"finish_reason":null}]}"#,
            r#"data: {"choices":[{"delta":{"content":"world"},"finish_reason":null}]}"#,
            r#"data: {"choices":[{"delta":{"content":"."},"finish_reason":"stop"}]}"#,
            "data: [DONE]",
        ]
        .join("\n\n")
            + "\n\n";

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(serde_json::json!({"stream": true})))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(sse),
            )
            .mount(&server)
            .await;

        let rx = provider_for(&server).stream(request()).await.unwrap();
        let (fragments, error) = drain(rx).await;
        assert!(error.is_none());
        assert_eq!(fragments, vec!["Hello", ", ", "world", "."]);
    }

    #[tokio::test]
    async fn stream_cut_short_is_interrupted() {
        let server = MockServer::start().await;
        let sse = r#"data: {"choices":[{"delta":{"content":"Hel"},"finish_reason":null}]}"#
            .to_string()
            + "\n\n";

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(sse),
            )
            .mount(&server)
            .await;

        let rx = provider_for(&server).stream(request()).await.unwrap();
        let (fragments, error) = drain(rx).await;
        assert_eq!(fragments, vec!["Hel"]);
        assert!(matches!(error, Some(ProviderError::StreamInterrupted(_))));
    }

    #[tokio::test]
    async fn stream_rejects_before_first_chunk_on_auth_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let err = provider_for(&server).stream(request()).await.unwrap_err();
        assert_eq!(err.kind(), "upstream_auth");
    }

    /// Serve one streaming reply whose body is written in separate chunked
    /// writes, so the client sees each slice as its own network read.
    async fn split_body_server(parts: Vec<Vec<u8>>) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request);
                if let Some(head_end) = text.find("\r\n\r\n") {
                    let length = text[..head_end]
                        .lines()
                        .find_map(|l| {
                            let (k, v) = l.split_once(':')?;
                            k.eq_ignore_ascii_case("content-length")
                                .then(|| v.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if request.len() >= head_end + 4 + length {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }

            socket
                .write_all(
                    b"HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\ntransfer-encoding: chunked\r\n\r\n",
                )
                .await
                .unwrap();
            for part in parts {
                socket
                    .write_all(format!("{:x}\r\n", part.len()).as_bytes())
                    .await
                    .unwrap();
                socket.write_all(&part).await.unwrap();
                socket.write_all(b"\r\n").await.unwrap();
                socket.flush().await.unwrap();
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            socket.write_all(b"0\r\n\r\n").await.unwrap();
            socket.flush().await.unwrap();
        });

        format!("http://{addr}/v1")
    }

    #[tokio::test]
    async fn stream_keeps_multibyte_text_split_between_reads() {
        let body = concat!(
            r#"data: {"choices":[{"delta":{"content":"-62 °C"},"finish_reason":"stop"}]}"#,
            "\n\n",
            "data: [DONE]\n\n"
        )
        .as_bytes()
        .to_vec();
        let split = body.iter().position(|&b| b == 0xC2).unwrap() + 1;
        let base_url = split_body_server(vec![body[..split].to_vec(), body[split..].to_vec()]).await;

        let provider =
            OpenAiCompatProvider::new("test", base_url, "sk-test", Duration::from_secs(5)).unwrap();
        let rx = provider.stream(request()).await.unwrap();
        let (fragments, error) = drain(rx).await;

        assert!(error.is_none());
        assert_eq!(fragments.concat(), "-62 °C");
    }
}
