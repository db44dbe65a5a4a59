//! Near-Earth objects for a single day, from the NeoWs feed.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use orbitchat_core::data::{DataCategory, ExternalDataSummary, FetchQuery};
use orbitchat_core::error::FetchError;
use orbitchat_core::fetcher::DataFetcher;
use serde::Deserialize;

use crate::client::NasaClient;

const CLOSEST_SHOWN: usize = 3;

pub struct NeoFetcher {
    client: Arc<NasaClient>,
}

impl NeoFetcher {
    pub fn new(client: Arc<NasaClient>) -> Self {
        Self { client }
    }
}

#[derive(Debug, Deserialize)]
struct NeoFeed {
    element_count: u64,
    #[serde(default)]
    near_earth_objects: HashMap<String, Vec<NearEarthObject>>,
}

#[derive(Debug, Deserialize)]
struct NearEarthObject {
    name: String,
    #[serde(default)]
    is_potentially_hazardous_asteroid: bool,
    #[serde(default)]
    estimated_diameter: Option<EstimatedDiameter>,
    #[serde(default)]
    close_approach_data: Vec<CloseApproach>,
}

#[derive(Debug, Deserialize)]
struct EstimatedDiameter {
    meters: DiameterRange,
}

#[derive(Debug, Deserialize)]
struct DiameterRange {
    estimated_diameter_max: f64,
}

// NeoWs sends distances and velocities as decimal strings.
#[derive(Debug, Deserialize)]
struct CloseApproach {
    miss_distance: MissDistance,
    relative_velocity: RelativeVelocity,
}

#[derive(Debug, Deserialize)]
struct MissDistance {
    kilometers: String,
}

#[derive(Debug, Deserialize)]
struct RelativeVelocity {
    kilometers_per_hour: String,
}

struct Approach<'a> {
    name: &'a str,
    miss_km: f64,
    velocity_kmh: Option<f64>,
    diameter_m: Option<f64>,
}

#[async_trait]
impl DataFetcher for NeoFetcher {
    fn category(&self) -> DataCategory {
        DataCategory::NearEarthObjects
    }

    async fn fetch(&self, query: &FetchQuery) -> Result<ExternalDataSummary, FetchError> {
        let day = query
            .date
            .unwrap_or_else(|| Utc::now().date_naive())
            .format("%Y-%m-%d")
            .to_string();

        let feed: NeoFeed = self
            .client
            .get_json(
                self.category(),
                "/neo/rest/v1/feed",
                &[("start_date", day.clone()), ("end_date", day.clone())],
            )
            .await?;

        Ok(ExternalDataSummary::new(self.category(), render(&day, &feed)))
    }
}

fn render(day: &str, feed: &NeoFeed) -> String {
    let objects: Vec<&NearEarthObject> = feed.near_earth_objects.values().flatten().collect();
    let hazardous = objects
        .iter()
        .filter(|o| o.is_potentially_hazardous_asteroid)
        .count();

    let mut approaches: Vec<Approach<'_>> = objects
        .iter()
        .filter_map(|o| {
            let ca = o.close_approach_data.first()?;
            Some(Approach {
                name: &o.name,
                miss_km: ca.miss_distance.kilometers.parse().ok()?,
                velocity_kmh: ca.relative_velocity.kilometers_per_hour.parse().ok(),
                diameter_m: o
                    .estimated_diameter
                    .as_ref()
                    .map(|d| d.meters.estimated_diameter_max),
            })
        })
        .collect();
    approaches.sort_by(|a, b| a.miss_km.total_cmp(&b.miss_km));

    let mut out = format!(
        "Date: {day}\nTotal objects: {}\nPotentially hazardous: {hazardous}",
        feed.element_count
    );

    if !approaches.is_empty() {
        out.push_str("\nClosest approaches:");
        for a in approaches.iter().take(CLOSEST_SHOWN) {
            out.push_str(&format!(
                "\n- {}: {:.0} km away, {}, {}",
                a.name,
                a.miss_km,
                a.velocity_kmh
                    .map(|v| format!("{v:.0} km/h"))
                    .unwrap_or_else(|| "velocity n/a".into()),
                a.diameter_m
                    .map(|d| format!("up to {d:.0} m across"))
                    .unwrap_or_else(|| "size n/a".into()),
            ));
        }
    }

    out
}
