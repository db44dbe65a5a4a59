//! Mars surface weather from the InSight lander feed.
//!
//! The feed is keyed by sol number: `sol_keys` lists the reported sols in
//! ascending order and each sol is a top-level object carrying `AT` (air
//! temperature), `PRE` (pressure) and `HWS` (horizontal wind speed) sensors.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use orbitchat_core::data::{DataCategory, ExternalDataSummary, FetchQuery};
use orbitchat_core::error::FetchError;
use orbitchat_core::fetcher::DataFetcher;
use serde::Deserialize;

use crate::client::NasaClient;

const RECENT_SOLS: usize = 3;

pub struct MarsWeatherFetcher {
    client: Arc<NasaClient>,
}

impl MarsWeatherFetcher {
    pub fn new(client: Arc<NasaClient>) -> Self {
        Self { client }
    }
}

#[derive(Debug, Deserialize)]
struct InsightFeed {
    sol_keys: Vec<String>,
    #[serde(flatten)]
    sols: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
struct SolReport {
    #[serde(rename = "AT")]
    air_temperature: Option<Sensor>,
    #[serde(rename = "PRE")]
    pressure: Option<Sensor>,
    #[serde(rename = "HWS")]
    wind_speed: Option<Sensor>,
    #[serde(rename = "Season")]
    season: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Sensor {
    av: Option<f64>,
    mn: Option<f64>,
    mx: Option<f64>,
}

#[async_trait]
impl DataFetcher for MarsWeatherFetcher {
    fn category(&self) -> DataCategory {
        DataCategory::MarsWeather
    }

    async fn fetch(&self, _query: &FetchQuery) -> Result<ExternalDataSummary, FetchError> {
        let feed: InsightFeed = self
            .client
            .get_json(
                self.category(),
                "/insight_weather/",
                &[("feedtype", "json".to_string()), ("ver", "1.0".to_string())],
            )
            .await?;

        Ok(ExternalDataSummary::new(self.category(), render(&feed)))
    }
}

fn render(feed: &InsightFeed) -> String {
    let mut out = format!(
        "Source: NASA InSight lander\nSols available: {}",
        feed.sol_keys.len()
    );

    if feed.sol_keys.is_empty() {
        out.push_str("\nNo recent sols were reported.");
        return out;
    }

    for sol in feed.sol_keys.iter().rev().take(RECENT_SOLS) {
        // A sol whose body is missing or unreadable is reported with n/a fields.
        let report: SolReport = feed
            .sols
            .get(sol)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default();

        out.push_str(&format!(
            "\nSol {sol} (season: {}): air {}, pressure {}, wind {}",
            report.season.as_deref().unwrap_or("n/a"),
            temperature(report.air_temperature.as_ref()),
            average(report.pressure.as_ref(), "Pa"),
            average(report.wind_speed.as_ref(), "m/s"),
        ));
    }

    out
}

fn temperature(sensor: Option<&Sensor>) -> String {
    let Some(s) = sensor else {
        return "n/a".into();
    };
    let fmt = |v: Option<f64>| v.map(|v| format!("{v:.1}")).unwrap_or_else(|| "n/a".into());
    format!("{} °C avg (min {}, max {})", fmt(s.av), fmt(s.mn), fmt(s.mx))
}

fn average(sensor: Option<&Sensor>, unit: &str) -> String {
    sensor
        .and_then(|s| s.av)
        .map(|v| format!("{v:.1} {unit}"))
        .unwrap_or_else(|| "n/a".into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::test_client;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sol(season: &str, temp: f64) -> serde_json::Value {
        serde_json::json!({
            "AT": {"av": temp, "mn": temp - 30.0, "mx": temp + 40.0, "ct": 1000},
            "PRE": {"av": 750.56, "mn": 720.0, "mx": 770.0},
            "HWS": {"av": 5.08, "mn": 0.2, "mx": 20.1},
            "Season": season,
            "First_UTC": "2020-10-19T18:32:20Z"
        })
    }

    #[tokio::test]
    async fn reports_most_recent_sols_first() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/insight_weather/"))
            .and(query_param("feedtype", "json"))
            .and(query_param("ver", "1.0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "sol_keys": ["672", "673", "674", "675"],
                "672": sol("fall", -70.0),
                "673": sol("fall", -65.0),
                "674": sol("fall", -63.0),
                "675": {"Season": "winter"},
                "validity_checks": {"sols_checked": ["675"]}
            })))
            .mount(&server)
            .await;

        let fetcher = MarsWeatherFetcher::new(test_client(&server.uri()));
        let text = fetcher.fetch(&FetchQuery::default()).await.unwrap().text;

        assert!(text.contains("Sols available: 4"));
        assert!(text.find("Sol 675").unwrap() < text.find("Sol 674").unwrap());
        assert!(text.contains("Sol 675 (season: winter): air n/a, pressure n/a, wind n/a"));
        assert!(text.contains("-63.0 °C avg (min -93.0, max -23.0)"));
        assert!(text.contains("pressure 750.6 Pa"));
        assert!(text.contains("wind 5.1 m/s"));
        assert!(!text.contains("Sol 672"));
    }

    #[tokio::test]
    async fn empty_sol_list_is_not_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/insight_weather/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "sol_keys": [],
                "validity_checks": {}
            })))
            .mount(&server)
            .await;

        let fetcher = MarsWeatherFetcher::new(test_client(&server.uri()));
        let text = fetcher.fetch(&FetchQuery::default()).await.unwrap().text;
        assert!(text.contains("No recent sols were reported."));
    }

    #[tokio::test]
    async fn missing_sol_keys_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"foo": 1})))
            .mount(&server)
            .await;

        let fetcher = MarsWeatherFetcher::new(test_client(&server.uri()));
        let err = fetcher.fetch(&FetchQuery::default()).await.unwrap_err();
        assert!(matches!(err, FetchError::Malformed { .. }));
    }
}
