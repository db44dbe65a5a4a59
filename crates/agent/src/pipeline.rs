//! The chat pipeline: classify, fetch, augment, dispatch.
//!
//! The pipeline holds no per-request state, so one instance is shared by
//! every concurrent request.

use std::collections::BTreeSet;
use std::sync::Arc;

use futures::future::join_all;
use orbitchat_config::AppConfig;
use orbitchat_core::data::{DataCategory, ExternalDataSummary, FetchOutcome, FetchQuery, GeoPoint};
use orbitchat_core::error::{Error, ProviderError};
use orbitchat_core::message::{Conversation, Message};
use orbitchat_core::provider::Provider;
use orbitchat_spacedata::FetcherRegistry;
use tracing::{debug, info, warn};

use crate::augmenter::{AugmentedPrompt, augment};
use crate::classifier::Vocabulary;
use crate::dispatcher::{ChatDispatcher, ChatStream};

pub struct ChatPipeline {
    vocabulary: Vocabulary,
    fetchers: FetcherRegistry,
    dispatcher: ChatDispatcher,
    concurrent: bool,
    default_location: Option<GeoPoint>,
}

impl ChatPipeline {
    pub fn new(vocabulary: Vocabulary, fetchers: FetcherRegistry, dispatcher: ChatDispatcher) -> Self {
        Self {
            vocabulary,
            fetchers,
            dispatcher,
            concurrent: true,
            default_location: None,
        }
    }

    /// Build the whole pipeline from configuration around an existing provider.
    pub fn from_config(config: &AppConfig, provider: Arc<dyn Provider>) -> Result<Self, Error> {
        let fetchers = FetcherRegistry::from_config(&config.space_data)?;
        let pipeline = Self::new(
            Vocabulary::from_config(&config.classifier),
            fetchers,
            ChatDispatcher::from_config(provider, config),
        )
        .with_concurrency(config.space_data.concurrent)
        .with_default_location(config.space_data.default_location);
        Ok(pipeline)
    }

    /// Run fetchers concurrently (default) or one after another.
    pub fn with_concurrency(mut self, concurrent: bool) -> Self {
        self.concurrent = concurrent;
        self
    }

    /// Location used when the earth-imagery category fires during chat.
    pub fn with_default_location(mut self, location: Option<GeoPoint>) -> Self {
        self.default_location = location;
        self
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn fetchers(&self) -> &FetcherRegistry {
        &self.fetchers
    }

    pub fn dispatcher(&self) -> &ChatDispatcher {
        &self.dispatcher
    }

    /// Classify, fetch and augment. Never fails: unavailable data is skipped.
    ///
    /// `forced` categories are fetched even if the classifier didn't pick them.
    pub async fn prepare(&self, conversation: &Conversation, forced: &[DataCategory]) -> AugmentedPrompt {
        let classification = self.vocabulary.classify_conversation(conversation);
        let mut categories: BTreeSet<DataCategory> = classification.categories;
        categories.extend(forced.iter().copied());

        if categories.is_empty() {
            debug!("No space keywords detected; forwarding conversation unchanged");
            return AugmentedPrompt::passthrough(conversation);
        }

        info!(
            keywords = ?classification.matched_terms,
            categories = ?categories.iter().map(DataCategory::as_str).collect::<Vec<_>>(),
            "Space keywords detected"
        );

        let summaries = self.fetch_all(&categories).await;
        if summaries.is_empty() {
            warn!("No space data could be fetched; forwarding conversation unchanged");
        }
        augment(conversation, &classification.matched_terms, summaries)
    }

    async fn fetch_all(&self, categories: &BTreeSet<DataCategory>) -> Vec<ExternalDataSummary> {
        let query = FetchQuery {
            date: None,
            location: self.default_location,
        };

        let fetchers: Vec<_> = categories
            .iter()
            .filter_map(|&category| {
                let fetcher = self.fetchers.get(category);
                if fetcher.is_none() {
                    debug!(%category, "No fetcher registered");
                }
                fetcher
            })
            .collect();

        let outcomes: Vec<FetchOutcome> = if self.concurrent {
            join_all(fetchers.iter().map(|f| f.fetch_outcome(&query))).await
        } else {
            let mut outcomes = Vec::with_capacity(fetchers.len());
            for fetcher in &fetchers {
                outcomes.push(fetcher.fetch_outcome(&query).await);
            }
            outcomes
        };

        outcomes
            .into_iter()
            .filter_map(|outcome| match outcome {
                FetchOutcome::Available(summary) => {
                    debug!(category = %summary.category, "Space data fetched");
                    Some(summary)
                }
                FetchOutcome::Unavailable(e) => {
                    warn!(category = %e.category(), error = %e, "Space data unavailable; omitting");
                    None
                }
            })
            .collect()
    }

    /// Buffered reply to a conversation.
    pub async fn reply(&self, conversation: &Conversation, model: Option<&str>) -> Result<String, ProviderError> {
        let prompt = self.prepare(conversation, &[]).await;
        self.dispatcher.complete(prompt.messages, model).await
    }

    /// Streamed reply to a conversation.
    pub async fn reply_stream(
        &self,
        conversation: &Conversation,
        model: Option<&str>,
    ) -> Result<ChatStream, ProviderError> {
        let prompt = self.prepare(conversation, &[]).await;
        self.dispatcher.stream(prompt.messages, model).await
    }

    /// One-shot question with the picture of the day always included.
    pub async fn ask(&self, question: &str) -> Result<String, ProviderError> {
        let conversation = Conversation::from(vec![Message::user(question)]);
        let prompt = self.prepare(&conversation, &[DataCategory::Imagery]).await;
        self.dispatcher.complete(prompt.messages, None).await
    }
}
