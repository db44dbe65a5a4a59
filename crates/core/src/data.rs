//! External space-data value types.
//!
//! A [`DataCategory`] names one kind of reference data a fetcher can
//! retrieve. Fetchers produce an [`ExternalDataSummary`] per request; it is
//! never cached and is discarded once the request completes.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::FetchError;

/// One category of external reference data.
///
/// Declaration order is the order in which summaries are rendered into the
/// augmentation preamble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DataCategory {
    /// Astronomy picture of the day.
    Imagery,
    /// Near-Earth objects making close approaches.
    NearEarthObjects,
    /// Per-sol weather readings from the Mars surface.
    MarsWeather,
    /// Space-weather notifications (flares, CMEs, storms).
    SpaceWeather,
    /// Satellite imagery of a location on Earth.
    EarthImagery,
}

impl DataCategory {
    pub const ALL: [DataCategory; 5] = [
        Self::Imagery,
        Self::NearEarthObjects,
        Self::MarsWeather,
        Self::SpaceWeather,
        Self::EarthImagery,
    ];

    /// The kebab-case slug used in URLs and configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Imagery => "imagery",
            Self::NearEarthObjects => "near-earth-objects",
            Self::MarsWeather => "mars-weather",
            Self::SpaceWeather => "space-weather",
            Self::EarthImagery => "earth-imagery",
        }
    }

    /// Section heading used when rendering a summary into a prompt.
    pub fn heading(&self) -> &'static str {
        match self {
            Self::Imagery => "ASTRONOMY PICTURE OF THE DAY",
            Self::NearEarthObjects => "NEAR EARTH OBJECTS",
            Self::MarsWeather => "MARS WEATHER",
            Self::SpaceWeather => "SPACE WEATHER",
            Self::EarthImagery => "EARTH IMAGERY",
        }
    }
}

impl fmt::Display for DataCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown data category '{s}'"))
    }
}

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Whether both coordinates fall in their valid ranges.
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lon)
    }

    /// `(0, 0)` is what an unset form field or a zeroed default looks like,
    /// so it is never accepted as an imagery target.
    pub fn is_origin(&self) -> bool {
        self.lat == 0.0 && self.lon == 0.0
    }

    /// In range and not the origin.
    pub fn is_imagery_target(&self) -> bool {
        self.is_valid() && !self.is_origin()
    }
}

/// Optional parameters passed to a fetcher.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchQuery {
    /// Day of interest; fetchers default to today (UTC) when absent.
    pub date: Option<NaiveDate>,
    /// Location of interest; required by the earth-imagery fetcher.
    pub location: Option<GeoPoint>,
}

impl FetchQuery {
    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn with_location(mut self, location: GeoPoint) -> Self {
        self.location = Some(location);
        self
    }
}

/// A short human-readable rendering of one category's data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalDataSummary {
    pub category: DataCategory,
    pub text: String,
    pub fetched_at: DateTime<Utc>,
}

impl ExternalDataSummary {
    /// Create a summary stamped with the current time.
    pub fn new(category: DataCategory, text: impl Into<String>) -> Self {
        Self {
            category,
            text: text.into(),
            fetched_at: Utc::now(),
        }
    }
}

/// Result of one best-effort fetch: either a summary or the reason it is missing.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    Available(ExternalDataSummary),
    Unavailable(FetchError),
}

impl FetchOutcome {
    pub fn category(&self) -> DataCategory {
        match self {
            Self::Available(summary) => summary.category,
            Self::Unavailable(err) => err.category(),
        }
    }

    /// The summary, if the fetch succeeded.
    pub fn summary(&self) -> Option<&ExternalDataSummary> {
        match self {
            Self::Available(summary) => Some(summary),
            Self::Unavailable(_) => None,
        }
    }

    pub fn into_summary(self) -> Option<ExternalDataSummary> {
        match self {
            Self::Available(summary) => Some(summary),
            Self::Unavailable(_) => None,
        }
    }
}

impl From<Result<ExternalDataSummary, FetchError>> for FetchOutcome {
    fn from(result: Result<ExternalDataSummary, FetchError>) -> Self {
        match result {
            Ok(summary) => Self::Available(summary),
            Err(err) => Self::Unavailable(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn imagery_target_excludes_origin_and_out_of_range() {
        assert!(GeoPoint::new(29.78, -95.33).is_imagery_target());
        assert!(GeoPoint::new(0.0, 12.5).is_imagery_target());
        assert!(!GeoPoint::new(0.0, 0.0).is_imagery_target());
        assert!(GeoPoint::new(0.0, 0.0).is_valid());
        assert!(!GeoPoint::new(91.0, 10.0).is_imagery_target());
    }

    #[test]
    fn category_slugs_roundtrip() {
        for category in DataCategory::ALL {
            assert_eq!(category.as_str().parse::<DataCategory>(), Ok(category));
        }
        assert!("comets".parse::<DataCategory>().is_err());
    }

    #[test]
    fn category_serializes_as_kebab_case() {
        let json = serde_json::to_string(&DataCategory::NearEarthObjects).unwrap();
        assert_eq!(json, r#""near-earth-objects""#);
    }

    #[test]
    fn geo_point_validation() {
        assert!(GeoPoint::new(29.78, -95.33).is_valid());
        assert!(!GeoPoint::new(91.0, 0.0).is_valid());
        assert!(!GeoPoint::new(0.0, -181.0).is_valid());
    }

    #[test]
    fn outcome_from_result() {
        let ok: FetchOutcome = Ok(ExternalDataSummary::new(DataCategory::Imagery, "pic")).into();
        assert!(ok.summary().is_some());

        let err: FetchOutcome = Err(FetchError::MissingCredential {
            category: DataCategory::SpaceWeather,
        })
        .into();
        assert!(err.summary().is_none());
        assert_eq!(err.category(), DataCategory::SpaceWeather);
    }
}
