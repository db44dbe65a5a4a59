//! The `DataFetcher` trait: the abstraction over external reference-data sources.
//!
//! Each fetcher retrieves exactly one [`DataCategory`] with a single outbound
//! request and normalizes the payload into a short text summary. Fetchers are
//! best-effort: callers turn their errors into [`FetchOutcome::Unavailable`]
//! and carry on.

use async_trait::async_trait;

use crate::data::{DataCategory, ExternalDataSummary, FetchOutcome, FetchQuery};
use crate::error::FetchError;

#[async_trait]
pub trait DataFetcher: Send + Sync {
    /// The category this fetcher produces.
    fn category(&self) -> DataCategory;

    /// Retrieve and summarize the data. One attempt, no retries.
    async fn fetch(&self, query: &FetchQuery) -> std::result::Result<ExternalDataSummary, FetchError>;

    /// Like `fetch`, but never fails: errors become `Unavailable`.
    async fn fetch_outcome(&self, query: &FetchQuery) -> FetchOutcome {
        self.fetch(query).await.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingFetcher;

    #[async_trait]
    impl DataFetcher for FailingFetcher {
        fn category(&self) -> DataCategory {
            DataCategory::NearEarthObjects
        }

        async fn fetch(&self, _query: &FetchQuery) -> Result<ExternalDataSummary, FetchError> {
            Err(FetchError::Timeout {
                category: self.category(),
                timeout_secs: 15,
            })
        }
    }

    #[tokio::test]
    async fn fetch_outcome_absorbs_errors() {
        let outcome = FailingFetcher.fetch_outcome(&FetchQuery::default()).await;
        assert!(matches!(
            outcome,
            FetchOutcome::Unavailable(FetchError::Timeout { timeout_secs: 15, .. })
        ));
    }
}
