//! Fetcher registry: one fetcher per data category.

use std::collections::BTreeMap;
use std::sync::Arc;

use orbitchat_config::SpaceDataConfig;
use orbitchat_core::data::{DataCategory, FetchOutcome, FetchQuery};
use orbitchat_core::error::Error;
use orbitchat_core::fetcher::DataFetcher;
use tracing::{info, warn};

use crate::apod::ApodFetcher;
use crate::client::NasaClient;
use crate::earth_imagery::EarthImageryFetcher;
use crate::mars_weather::MarsWeatherFetcher;
use crate::neo::NeoFetcher;
use crate::space_weather::SpaceWeatherFetcher;

#[derive(Default, Clone)]
pub struct FetcherRegistry {
    fetchers: BTreeMap<DataCategory, Arc<dyn DataFetcher>>,
}

impl FetcherRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// All five NASA fetchers sharing one client.
    pub fn from_config(config: &SpaceDataConfig) -> Result<Self, Error> {
        let client = Arc::new(NasaClient::from_config(config)?);
        if client.has_credential() {
            info!(base_url = %config.base_url, "Space data fetchers ready");
        } else {
            warn!("No NASA API key configured; space data will be unavailable");
        }

        let mut registry = Self::new();
        registry.register(Arc::new(ApodFetcher::new(client.clone())));
        registry.register(Arc::new(NeoFetcher::new(client.clone())));
        registry.register(Arc::new(MarsWeatherFetcher::new(client.clone())));
        registry.register(Arc::new(SpaceWeatherFetcher::new(client.clone())));
        registry.register(Arc::new(EarthImageryFetcher::new(client)));
        Ok(registry)
    }

    /// Register a fetcher under its own category, replacing any previous one.
    pub fn register(&mut self, fetcher: Arc<dyn DataFetcher>) {
        self.fetchers.insert(fetcher.category(), fetcher);
    }

    pub fn get(&self, category: DataCategory) -> Option<Arc<dyn DataFetcher>> {
        self.fetchers.get(&category).cloned()
    }

    pub fn categories(&self) -> Vec<DataCategory> {
        self.fetchers.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.fetchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fetchers.is_empty()
    }

    /// Fetch one category. `None` if no fetcher is registered for it.
    pub async fn fetch(&self, category: DataCategory, query: &FetchQuery) -> Option<FetchOutcome> {
        let fetcher = self.get(category)?;
        Some(fetcher.fetch_outcome(query).await)
    }
}
