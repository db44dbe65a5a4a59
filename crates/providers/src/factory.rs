//! Provider factory: turns the loaded configuration into a ready provider.

use std::sync::Arc;
use std::time::Duration;

use orbitchat_config::AppConfig;
use orbitchat_core::provider::Provider;
use tracing::{info, warn};

use crate::openai_compat::OpenAiCompatProvider;
use crate::unconfigured::UnconfiguredProvider;

/// Build the chat provider from configuration.
///
/// Without an API key (or if the HTTP client can't be built) this returns an
/// [`UnconfiguredProvider`], so chat requests fail with `NotConfigured`
/// while the rest of the service keeps working.
pub fn build_from_config(config: &AppConfig) -> Arc<dyn Provider> {
    let Some(api_key) = config.api_key.as_deref() else {
        warn!("No chat API key configured; chat requests will be rejected");
        return Arc::new(UnconfiguredProvider::new(
            "set OPENAI_API_KEY (or ORBITCHAT_API_KEY) to enable chat",
        ));
    };

    let timeout = Duration::from_secs(config.request_timeout_secs);
    match OpenAiCompatProvider::new(provider_name(&config.api_url), &config.api_url, api_key, timeout) {
        Ok(provider) => {
            info!(
                provider = provider.name(),
                base_url = %provider.base_url(),
                model = %config.default_model,
                "Chat provider ready"
            );
            Arc::new(provider)
        }
        Err(e) => {
            warn!(error = %e, "Failed to build chat provider");
            Arc::new(UnconfiguredProvider::new(e.to_string()))
        }
    }
}

/// Short label for logs, derived from the well-known base URLs.
fn provider_name(api_url: &str) -> &'static str {
    if api_url.contains("api.openai.com") {
        "openai"
    } else if api_url.contains("openrouter.ai") {
        "openrouter"
    } else if api_url.contains("localhost:11434") {
        "ollama"
    } else {
        "openai-compatible"
    }
}
