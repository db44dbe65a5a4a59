//! Astronomy Picture of the Day.

use std::sync::Arc;

use async_trait::async_trait;
use orbitchat_core::data::{DataCategory, ExternalDataSummary, FetchQuery};
use orbitchat_core::error::FetchError;
use orbitchat_core::fetcher::DataFetcher;
use serde::Deserialize;

use crate::client::NasaClient;

/// Explanations are long; keep the prompt small.
const EXPLANATION_LIMIT: usize = 200;

pub struct ApodFetcher {
    client: Arc<NasaClient>,
}

impl ApodFetcher {
    pub fn new(client: Arc<NasaClient>) -> Self {
        Self { client }
    }
}

#[derive(Debug, Deserialize)]
struct ApodPayload {
    title: String,
    date: String,
    #[serde(default)]
    explanation: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    media_type: Option<String>,
}

#[async_trait]
impl DataFetcher for ApodFetcher {
    fn category(&self) -> DataCategory {
        DataCategory::Imagery
    }

    async fn fetch(&self, query: &FetchQuery) -> Result<ExternalDataSummary, FetchError> {
        let params: Vec<(&str, String)> = query
            .date
            .map(|d| vec![("date", d.format("%Y-%m-%d").to_string())])
            .unwrap_or_default();

        let payload: ApodPayload = self
            .client
            .get_json(self.category(), "/planetary/apod", &params)
            .await?;

        Ok(ExternalDataSummary::new(self.category(), render(&payload)))
    }
}

fn render(apod: &ApodPayload) -> String {
    format!(
        "Title: {}\nDate: {}\nMedia type: {}\nExplanation: {}\nURL: {}",
        apod.title,
        apod.date,
        apod.media_type.as_deref().unwrap_or("unknown"),
        truncate(&apod.explanation, EXPLANATION_LIMIT),
        apod.url.as_deref().unwrap_or("n/a"),
    )
}

/// Cut to `limit` characters, marking the cut with an ellipsis.
pub(crate) fn truncate(text: &str, limit: usize) -> String {
    let text = text.trim();
    match text.char_indices().nth(limit) {
        Some((idx, _)) => format!("{}...", text[..idx].trim_end()),
        None => text.to_string(),
    }
}
