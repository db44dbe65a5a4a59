//! Landsat imagery assets for a ground location.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use orbitchat_core::data::{DataCategory, ExternalDataSummary, FetchQuery, GeoPoint};
use orbitchat_core::error::FetchError;
use orbitchat_core::fetcher::DataFetcher;
use serde::Deserialize;

use crate::client::NasaClient;

/// Width and height of the image tile in degrees.
const TILE_DIM: &str = "0.10";

pub struct EarthImageryFetcher {
    client: Arc<NasaClient>,
}

impl EarthImageryFetcher {
    pub fn new(client: Arc<NasaClient>) -> Self {
        Self { client }
    }
}

#[derive(Debug, Deserialize)]
struct AssetPayload {
    date: String,
    url: String,
    #[serde(default)]
    resource: Option<Resource>,
}

#[derive(Debug, Deserialize)]
struct Resource {
    dataset: Option<String>,
}

#[async_trait]
impl DataFetcher for EarthImageryFetcher {
    fn category(&self) -> DataCategory {
        DataCategory::EarthImagery
    }

    async fn fetch(&self, query: &FetchQuery) -> Result<ExternalDataSummary, FetchError> {
        let location = query
            .location
            .filter(GeoPoint::is_imagery_target)
            .ok_or(FetchError::MissingParameter {
                category: self.category(),
                parameter: "location",
            })?;

        let date = query.date.unwrap_or_else(|| Utc::now().date_naive());

        let asset: AssetPayload = self
            .client
            .get_json(
                self.category(),
                "/planetary/earth/assets",
                &[
                    ("lat", location.lat.to_string()),
                    ("lon", location.lon.to_string()),
                    ("date", date.format("%Y-%m-%d").to_string()),
                    ("dim", TILE_DIM.to_string()),
                ],
            )
            .await?;

        let text = format!(
            "Location: {:.4}, {:.4}\nAcquired: {}\nDataset: {}\nImage URL: {}",
            location.lat,
            location.lon,
            asset.date,
            asset
                .resource
                .as_ref()
                .and_then(|r| r.dataset.as_deref())
                .unwrap_or("unknown"),
            asset.url,
        );

        Ok(ExternalDataSummary::new(self.category(), text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::test_client;
    use chrono::NaiveDate;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn requires_a_location() {
        let fetcher = EarthImageryFetcher::new(test_client("http://127.0.0.1:9"));
        let err = fetcher.fetch(&FetchQuery::default()).await.unwrap_err();
        assert!(matches!(
            err,
            FetchError::MissingParameter {
                parameter: "location",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn origin_is_not_a_target() {
        let fetcher = EarthImageryFetcher::new(test_client("http://127.0.0.1:9"));
        let query = FetchQuery::default().with_location(GeoPoint::new(0.0, 0.0));
        let err = fetcher.fetch(&query).await.unwrap_err();
        assert!(matches!(
            err,
            FetchError::MissingParameter {
                parameter: "location",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn summarizes_asset() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/planetary/earth/assets"))
            .and(query_param("lat", "29.78"))
            .and(query_param("lon", "-95.33"))
            .and(query_param("date", "2026-09-01"))
            .and(query_param("dim", "0.10"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "date": "2026-08-28T16:52:13.000",
                "id": "LANDSAT/LC08/C01/T1_SR/LC08_025039_20260828",
                "resource": {"dataset": "LANDSAT/LC08/C01/T1_SR", "planet": "earth"},
                "service_version": "v5000",
                "url": "https://earthengine.googleapis.com/v1alpha/thumbnails/abc:getPixels"
            })))
            .mount(&server)
            .await;

        let fetcher = EarthImageryFetcher::new(test_client(&server.uri()));
        let query = FetchQuery::default()
            .with_location(GeoPoint::new(29.78, -95.33))
            .with_date(NaiveDate::from_ymd_opt(2026, 9, 1).unwrap());
        let text = fetcher.fetch(&query).await.unwrap().text;

        assert!(text.contains("Location: 29.7800, -95.3300"));
        assert!(text.contains("Acquired: 2026-08-28T16:52:13.000"));
        assert!(text.contains("Dataset: LANDSAT/LC08/C01/T1_SR"));
        assert!(text.contains("getPixels"));
    }

    #[tokio::test]
    async fn no_imagery_for_date_is_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/planetary/earth/assets"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let fetcher = EarthImageryFetcher::new(test_client(&server.uri()));
        let query = FetchQuery::default().with_location(GeoPoint::new(1.5, 2.5));
        let err = fetcher.fetch(&query).await.unwrap_err();
        assert!(matches!(err, FetchError::Http { status: 404, .. }));
    }
}
