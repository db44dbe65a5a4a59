//! Space-weather notifications from DONKI.

use std::sync::Arc;

use async_trait::async_trait;
use orbitchat_core::data::{DataCategory, ExternalDataSummary, FetchQuery};
use orbitchat_core::error::FetchError;
use orbitchat_core::fetcher::DataFetcher;
use serde::Deserialize;

use crate::client::NasaClient;

const RECENT_SHOWN: usize = 3;

pub struct SpaceWeatherFetcher {
    client: Arc<NasaClient>,
}

impl SpaceWeatherFetcher {
    pub fn new(client: Arc<NasaClient>) -> Self {
        Self { client }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Notification {
    message_type: String,
    #[serde(rename = "messageID")]
    message_id: String,
    message_issue_time: String,
}

#[async_trait]
impl DataFetcher for SpaceWeatherFetcher {
    fn category(&self) -> DataCategory {
        DataCategory::SpaceWeather
    }

    async fn fetch(&self, query: &FetchQuery) -> Result<ExternalDataSummary, FetchError> {
        let mut params = vec![("type", "all".to_string())];
        if let Some(date) = query.date {
            let day = date.format("%Y-%m-%d").to_string();
            params.push(("startDate", day.clone()));
            params.push(("endDate", day));
        }

        let mut notifications: Vec<Notification> = self
            .client
            .get_json(self.category(), "/DONKI/notifications", &params)
            .await?;

        // Issue times are ISO-8601 UTC, so lexical order is chronological.
        notifications.sort_by(|a, b| b.message_issue_time.cmp(&a.message_issue_time));

        Ok(ExternalDataSummary::new(self.category(), render(&notifications)))
    }
}

fn render(notifications: &[Notification]) -> String {
    let mut out = format!("Source: NASA DONKI\nNotifications: {}", notifications.len());
    if notifications.is_empty() {
        out.push_str("\nNo alerts in the reporting window.");
        return out;
    }

    out.push_str("\nMost recent:");
    for n in notifications.iter().take(RECENT_SHOWN) {
        out.push_str(&format!(
            "\n- [{}] issued {} ({})",
            n.message_type, n.message_issue_time, n.message_id
        ));
    }
    out
}
