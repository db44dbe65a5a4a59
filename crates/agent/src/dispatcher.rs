//! Chat dispatcher: sends a message list to the provider in buffered or
//! streaming mode.
//!
//! Streaming returns a [`ChatStream`], a single-use `futures::Stream` of text
//! fragments. Buffered callers can drain it with [`ChatStream::collect_text`]
//! or use [`ChatDispatcher::complete`] directly.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::{Stream, StreamExt};
use orbitchat_config::AppConfig;
use orbitchat_core::error::ProviderError;
use orbitchat_core::message::Message;
use orbitchat_core::provider::{ChunkReceiver, Provider, ProviderRequest};
use tracing::{debug, warn};

pub struct ChatDispatcher {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

impl ChatDispatcher {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn from_config(provider: Arc<dyn Provider>, config: &AppConfig) -> Self {
        Self::new(provider, &config.default_model)
            .with_temperature(config.temperature)
            .with_max_tokens(config.max_tokens)
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// The default model.
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// A per-request override wins unless it is blank.
    pub fn resolve_model<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
        requested
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(&self.model)
    }

    fn request(&self, messages: Vec<Message>, model: Option<&str>) -> ProviderRequest {
        let mut request = ProviderRequest::new(self.resolve_model(model), messages);
        request.temperature = self.temperature;
        request.max_tokens = self.max_tokens;
        request
    }

    /// Buffered mode: wait for the whole reply.
    pub async fn complete(
        &self,
        messages: Vec<Message>,
        model: Option<&str>,
    ) -> Result<String, ProviderError> {
        let request = self.request(messages, model);
        debug!(
            provider = self.provider.name(),
            model = %request.model,
            messages = request.messages.len(),
            "Dispatching buffered completion"
        );

        let response = self.provider.complete(request).await.inspect_err(|e| {
            warn!(provider = self.provider.name(), kind = e.kind(), error = %e, "Completion failed");
        })?;

        if let Some(usage) = &response.usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Completion finished"
            );
        }
        Ok(response.message.content)
    }

    /// Streaming mode: fragments are yielded as the provider produces them.
    pub async fn stream(
        &self,
        messages: Vec<Message>,
        model: Option<&str>,
    ) -> Result<ChatStream, ProviderError> {
        let request = self.request(messages, model);
        debug!(
            provider = self.provider.name(),
            model = %request.model,
            messages = request.messages.len(),
            "Dispatching streaming completion"
        );

        let rx = self.provider.stream(request).await.inspect_err(|e| {
            warn!(provider = self.provider.name(), kind = e.kind(), error = %e, "Stream failed to start");
        })?;
        Ok(ChatStream::new(rx))
    }
}

/// Text fragments of one streamed reply, in upstream order.
///
/// Ends after the provider's done marker. If the provider goes away without
/// sending it, the stream yields [`ProviderError::StreamInterrupted`] once and
/// then ends. An upstream error also ends the stream.
pub struct ChatStream {
    rx: ChunkReceiver,
    finished: bool,
}

impl ChatStream {
    pub fn new(rx: ChunkReceiver) -> Self {
        Self {
            rx,
            finished: false,
        }
    }

    /// Drain the stream and concatenate every fragment.
    pub async fn collect_text(mut self) -> Result<String, ProviderError> {
        let mut text = String::new();
        while let Some(fragment) = self.next().await {
            text.push_str(&fragment?);
        }
        Ok(text)
    }
}

impl Stream for ChatStream {
    type Item = Result<String, ProviderError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.finished {
            return Poll::Ready(None);
        }

        loop {
            match self.rx.poll_recv(cx) {
                Poll::Ready(Some(Ok(chunk))) => {
                    let content = chunk.content.filter(|c| !c.is_empty());
                    if chunk.done {
                        self.finished = true;
                        return Poll::Ready(content.map(Ok));
                    }
                    if let Some(content) = content {
                        return Poll::Ready(Some(Ok(content)));
                    }
                }
                Poll::Ready(Some(Err(e))) => {
                    self.finished = true;
                    return Poll::Ready(Some(Err(e)));
                }
                Poll::Ready(None) => {
                    self.finished = true;
                    return Poll::Ready(Some(Err(ProviderError::StreamInterrupted(
                        "provider closed the stream without an end marker".into(),
                    ))));
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
