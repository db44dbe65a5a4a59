//! Shared HTTP client for the NASA open APIs.
//!
//! Owns the credential, the base URL and one `reqwest::Client` with the
//! configured timeout. Every transport, status and decoding failure is mapped
//! to a [`FetchError`] tagged with the requesting category.

use std::time::Duration;

use orbitchat_config::SpaceDataConfig;
use orbitchat_core::data::DataCategory;
use orbitchat_core::error::{Error, FetchError};
use serde::de::DeserializeOwned;
use tracing::debug;

pub struct NasaClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    timeout_secs: u64,
}

impl NasaClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Internal(format!("failed to build NASA HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            timeout_secs: timeout.as_secs(),
        })
    }

    pub fn from_config(config: &SpaceDataConfig) -> Result<Self, Error> {
        Self::new(
            &config.base_url,
            config.api_key.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    /// GET `{base_url}{path}` with `params` plus `api_key`, decoding the JSON body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        category: DataCategory,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, FetchError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(FetchError::MissingCredential { category })?;

        let url = format!("{}{}", self.base_url, path);
        debug!(%category, %url, "Fetching space data");

        let response = self
            .http
            .get(&url)
            .query(params)
            .query(&[("api_key", api_key)])
            .send()
            .await
            .map_err(|e| self.transport_error(category, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http {
                category,
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(category, e))?;

        serde_json::from_slice(&body).map_err(|e| FetchError::Malformed {
            category,
            reason: e.to_string(),
        })
    }

    fn transport_error(&self, category: DataCategory, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout {
                category,
                timeout_secs: self.timeout_secs,
            }
        } else {
            FetchError::Network {
                category,
                reason: e.to_string(),
            }
        }
    }
}

#[cfg(test)]
pub(crate) fn test_client(base_url: &str) -> std::sync::Arc<NasaClient> {
    std::sync::Arc::new(
        NasaClient::new(base_url, Some("test-key".into()), Duration::from_secs(2)).unwrap(),
    )
}
