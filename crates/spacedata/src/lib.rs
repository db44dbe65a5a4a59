//! NASA open-data fetchers for OrbitChat.
//!
//! One [`DataFetcher`](orbitchat_core::DataFetcher) per [`DataCategory`](orbitchat_core::DataCategory),
//! all sharing a single [`NasaClient`]. Each fetcher makes one GET request and
//! condenses the payload into a few lines of plain text for the prompt.

pub mod apod;
pub mod client;
pub mod earth_imagery;
pub mod mars_weather;
pub mod neo;
pub mod registry;
pub mod space_weather;

pub use apod::ApodFetcher;
pub use client::NasaClient;
pub use earth_imagery::EarthImageryFetcher;
pub use mars_weather::MarsWeatherFetcher;
pub use neo::NeoFetcher;
pub use registry::FetcherRegistry;
pub use space_weather::SpaceWeatherFetcher;
