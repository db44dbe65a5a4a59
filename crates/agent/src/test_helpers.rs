//! Shared test doubles for the pipeline stages.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use orbitchat_core::data::{DataCategory, ExternalDataSummary, FetchQuery};
use orbitchat_core::error::{FetchError, ProviderError};
use orbitchat_core::fetcher::DataFetcher;
use orbitchat_core::message::Message;
use orbitchat_core::provider::{
    ChunkReceiver, Provider, ProviderRequest, ProviderResponse, StreamChunk,
};

/// A provider that replies with fixed fragments and records every request.
///
/// `complete` returns the fragments concatenated; `stream` sends them one by
/// one followed by the done marker.
pub struct ScriptedProvider {
    reply: Result<Vec<String>, ProviderError>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn fragments(fragments: &[&str]) -> Self {
        Self {
            reply: Ok(fragments.iter().map(|f| f.to_string()).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn text(text: &str) -> Self {
        Self::fragments(&[text])
    }

    pub fn failing(error: ProviderError) -> Self {
        Self {
            reply: Err(error),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn record(&self, request: ProviderRequest) -> Result<Vec<String>, ProviderError> {
        self.requests.lock().unwrap().push(request);
        self.reply.clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let model = request.model.clone();
        let fragments = self.record(request)?;
        Ok(ProviderResponse {
            message: Message::assistant(fragments.concat()),
            usage: None,
            model,
        })
    }

    async fn stream(&self, request: ProviderRequest) -> Result<ChunkReceiver, ProviderError> {
        let fragments = self.record(request)?;
        let (tx, rx) = tokio::sync::mpsc::channel(fragments.len() + 1);
        for fragment in fragments {
            let _ = tx.send(Ok(StreamChunk::text(fragment))).await;
        }
        let _ = tx.send(Ok(StreamChunk::done())).await;
        Ok(rx)
    }
}

/// A fetcher that counts calls and either succeeds with fixed text or fails.
pub struct RecordingFetcher {
    category: DataCategory,
    result: Result<String, FetchError>,
    calls: AtomicUsize,
    last_query: Mutex<Option<FetchQuery>>,
}

impl RecordingFetcher {
    pub fn ok(category: DataCategory, text: &str) -> Self {
        Self {
            category,
            result: Ok(text.to_string()),
            calls: AtomicUsize::new(0),
            last_query: Mutex::new(None),
        }
    }

    pub fn timing_out(category: DataCategory) -> Self {
        Self {
            category,
            result: Err(FetchError::Timeout {
                category,
                timeout_secs: 15,
            }),
            calls: AtomicUsize::new(0),
            last_query: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_query(&self) -> Option<FetchQuery> {
        self.last_query.lock().unwrap().clone()
    }
}

#[async_trait]
impl DataFetcher for RecordingFetcher {
    fn category(&self) -> DataCategory {
        self.category
    }

    async fn fetch(&self, query: &FetchQuery) -> Result<ExternalDataSummary, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_query.lock().unwrap() = Some(query.clone());
        self.result
            .clone()
            .map(|text| ExternalDataSummary::new(self.category, text))
    }
}
