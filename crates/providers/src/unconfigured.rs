//! Placeholder provider used when no chat API key is configured.
//!
//! Every call fails fast with [`ProviderError::NotConfigured`], so the server
//! still starts and answers chat requests with a deterministic error instead
//! of attempting an unauthenticated upstream call.

use async_trait::async_trait;
use orbitchat_core::error::ProviderError;
use orbitchat_core::provider::{ChunkReceiver, Provider, ProviderRequest, ProviderResponse};

pub struct UnconfiguredProvider {
    reason: String,
}

impl UnconfiguredProvider {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl Provider for UnconfiguredProvider {
    fn name(&self) -> &str {
        "unconfigured"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        Err(ProviderError::NotConfigured(self.reason.clone()))
    }

    async fn stream(&self, _request: ProviderRequest) -> Result<ChunkReceiver, ProviderError> {
        Err(ProviderError::NotConfigured(self.reason.clone()))
    }

    async fn health_check(&self) -> Result<bool, ProviderError> {
        Ok(false)
    }
}
