use crate::{Config, FetchError, FetchRequest, WeatherSnapshot};
use async_trait::async_trait;
use bytes::Bytes;
use std::fmt::Debug;

pub mod openweather;

pub use openweather::OpenWeatherProvider;

/// The network seam of the pipeline: one call for weather, one for icon bytes.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn current_weather(&self, request: &FetchRequest) -> Result<WeatherSnapshot, FetchError>;

    /// Raw image bytes for an icon code.
    async fn icon_bytes(&self, code: &str) -> Result<Bytes, FetchError>;
}

/// Construct the OpenWeatherMap provider from config.
///
/// The API key is not checked here; it is checked on every request.
pub fn provider_from_config(config: &Config) -> Result<Box<dyn WeatherProvider>, FetchError> {
    Ok(Box::new(OpenWeatherProvider::new(config.clone())?))
}
