//! Error types for the OrbitChat domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Failures come in two tiers:
//! - [`ProviderError`] is critical: it aborts the chat request and is surfaced
//!   to the caller with a distinguishable [`ProviderError::kind`].
//! - [`FetchError`] is best-effort: the pipeline logs it and omits the summary.

use thiserror::Error;

use crate::data::DataCategory;

/// The top-level error type for all OrbitChat operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Fetcher errors ---
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failures of the hosted chat-completion API.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Malformed response from provider: {0}")]
    MalformedResponse(String),

    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

impl ProviderError {
    /// Stable machine-readable tag for this failure, used in HTTP error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotConfigured(_) => "upstream_not_configured",
            Self::AuthenticationFailed(_) => "upstream_auth",
            Self::RateLimited { .. } => "upstream_rate_limit",
            Self::Network(_) | Self::Timeout(_) => "network",
            Self::MalformedResponse(_) => "malformed_response",
            Self::StreamInterrupted(_) => "stream_interrupted",
            Self::ApiError { .. } => "upstream_error",
        }
    }

    /// Classify a `reqwest`-style transport failure message.
    pub fn from_transport(timed_out: bool, message: impl Into<String>) -> Self {
        if timed_out {
            Self::Timeout(message.into())
        } else {
            Self::Network(message.into())
        }
    }
}

/// Failures of a single external data fetcher.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("{category}: no data-provider API key configured")]
    MissingCredential { category: DataCategory },

    #[error("{category}: missing required parameter '{parameter}'")]
    MissingParameter {
        category: DataCategory,
        parameter: &'static str,
    },

    #[error("{category}: request timed out after {timeout_secs}s")]
    Timeout {
        category: DataCategory,
        timeout_secs: u64,
    },

    #[error("{category}: network error: {reason}")]
    Network { category: DataCategory, reason: String },

    #[error("{category}: upstream returned HTTP {status}")]
    Http { category: DataCategory, status: u16 },

    #[error("{category}: malformed payload: {reason}")]
    Malformed { category: DataCategory, reason: String },
}

impl FetchError {
    /// The data category whose fetch failed.
    pub fn category(&self) -> DataCategory {
        match self {
            Self::MissingCredential { category }
            | Self::MissingParameter { category, .. }
            | Self::Timeout { category, .. }
            | Self::Network { category, .. }
            | Self::Http { category, .. }
            | Self::Malformed { category, .. } => *category,
        }
    }
}
