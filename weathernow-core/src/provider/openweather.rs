use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::{
    Config, FetchError,
    model::{FetchRequest, WeatherSnapshot, title_case},
};

use super::WeatherProvider;

/// OpenWeatherMap "current weather" client.
#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    config: Config,
    http: Client,
}

impl OpenWeatherProvider {
    /// Both requests share the configured timeout.
    pub fn new(config: Config) -> Result<Self, FetchError> {
        let http = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self { config, http })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OwMain {
    temp: Option<f64>,
    feels_like: Option<f64>,
    humidity: Option<f64>,
    pressure: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OwWeather {
    description: Option<String>,
    icon: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OwWind {
    speed: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OwClouds {
    all: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OwSys {
    country: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OwCurrentResponse {
    name: Option<String>,
    sys: OwSys,
    main: OwMain,
    weather: Vec<OwWeather>,
    wind: OwWind,
    clouds: OwClouds,
}

impl OwCurrentResponse {
    fn into_snapshot(self, request: &FetchRequest) -> WeatherSnapshot {
        let weather = self.weather.into_iter().next().unwrap_or_default();

        WeatherSnapshot {
            city_name: self.name,
            country_code: self.sys.country,
            temperature: self.main.temp,
            feels_like: self.main.feels_like,
            description: weather.description.map(|d| title_case(&d)),
            humidity_pct: self.main.humidity,
            wind_speed: self.wind.speed,
            pressure_hpa: self.main.pressure,
            cloud_pct: self.clouds.all,
            icon_code: weather.icon.filter(|code| !code.is_empty()),
            units: request.units,
        }
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    #[instrument(skip(self, request), fields(seq = request.seq, city = %request.city, units = %request.units))]
    async fn current_weather(&self, request: &FetchRequest) -> Result<WeatherSnapshot, FetchError> {
        let api_key = self.config.api_key()?;

        let res = self
            .http
            .get(&self.config.weather_url)
            .query(&[
                ("q", request.city.as_str()),
                ("appid", api_key),
                ("units", request.units.as_str()),
            ])
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;
        debug!(%status, bytes = body.len(), "weather response received");

        if !status.is_success() {
            return Err(FetchError::Api(api_error_message(status, &body)));
        }

        let parsed: OwCurrentResponse = serde_json::from_str(&body)
            .map_err(|e| FetchError::Api(format!("Malformed response: {e}")))?;

        Ok(parsed.into_snapshot(request))
    }

    #[instrument(skip(self))]
    async fn icon_bytes(&self, code: &str) -> Result<Bytes, FetchError> {
        let res = self.http.get(self.config.icon_url_for(code)).send().await?;

        let status = res.status();
        if !status.is_success() {
            return Err(FetchError::Api(format!("HTTP {}", status.as_u16())));
        }

        Ok(res.bytes().await?)
    }
}

/// The server's `message` field, or a status-derived fallback.
fn api_error_message(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(serde_json::Value::Object(map)) => match map.get("message") {
            Some(serde_json::Value::String(msg)) => msg.clone(),
            Some(other) => other.to_string(),
            None => "Unknown error".to_string(),
        },
        _ => format!("HTTP {}", status.as_u16()),
    }
}
