use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// Stand-in shown wherever the API omitted a value.
pub const PLACEHOLDER: &str = "—";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Metric,
    Imperial,
}

impl Units {
    /// Value of the `units` query parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            Units::Metric => "metric",
            Units::Imperial => "imperial",
        }
    }

    pub fn temperature_symbol(&self) -> &'static str {
        match self {
            Units::Metric => "°C",
            Units::Imperial => "°F",
        }
    }

    pub fn speed_unit(&self) -> &'static str {
        match self {
            Units::Metric => "m/s",
            Units::Imperial => "mph",
        }
    }

    pub const fn all() -> &'static [Units] {
        &[Units::Metric, Units::Imperial]
    }
}

impl Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Units {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_lowercase().as_str() {
            "metric" | "c" | "celsius" => Ok(Units::Metric),
            "imperial" | "f" | "fahrenheit" => Ok(Units::Imperial),
            _ => Err(anyhow::anyhow!(
                "Unknown units '{value}'. Supported units: metric, imperial."
            )),
        }
    }
}

/// One accepted submission. `seq` orders submissions; only the highest one may reach the View.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub seq: u64,
    pub city: String,
    pub units: Units,
}

/// Result of one successful weather fetch, ready for display.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WeatherSnapshot {
    pub city_name: Option<String>,
    pub country_code: Option<String>,
    pub temperature: Option<f64>,
    pub feels_like: Option<f64>,
    /// Already title-cased.
    pub description: Option<String>,
    pub humidity_pct: Option<f64>,
    pub wind_speed: Option<f64>,
    pub pressure_hpa: Option<f64>,
    pub cloud_pct: Option<f64>,
    pub icon_code: Option<String>,
    pub units: Units,
}

impl WeatherSnapshot {
    /// "City, CC", tolerating either half being absent.
    pub fn heading(&self) -> String {
        let name = self.city_name.as_deref().unwrap_or(PLACEHOLDER);
        let country = self.country_code.as_deref().unwrap_or("");
        format!("{name}, {country}")
            .trim_matches(|c| c == ',' || c == ' ')
            .to_string()
    }

    pub fn temperature_line(&self) -> String {
        format!("Temp: {}{}", show(self.temperature), self.units.temperature_symbol())
    }

    pub fn feels_like_line(&self) -> String {
        format!("Feels like: {}{}", show(self.feels_like), self.units.temperature_symbol())
    }

    pub fn conditions_line(&self) -> String {
        format!("Conditions: {}", self.description.as_deref().unwrap_or(PLACEHOLDER))
    }

    pub fn humidity_line(&self) -> String {
        format!("Humidity: {}%", show(self.humidity_pct))
    }

    pub fn wind_line(&self) -> String {
        format!("Wind: {} {}", show(self.wind_speed), self.units.speed_unit())
    }

    pub fn pressure_line(&self) -> String {
        format!("Pressure: {} hPa", show(self.pressure_hpa))
    }

    pub fn clouds_line(&self) -> String {
        format!("Clouds: {}%", show(self.cloud_pct))
    }
}

fn show(value: Option<f64>) -> String {
    value.map_or_else(|| PLACEHOLDER.to_string(), |v| v.to_string())
}

/// Condition icon decoded to an RGBA8 bitmap.
#[derive(Clone, PartialEq, Eq)]
pub struct IconAsset {
    pub code: String,
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl fmt::Debug for IconAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IconAsset")
            .field("code", &self.code)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("rgba_len", &self.rgba.len())
            .finish()
    }
}

/// Upper-cases the first letter of every alphabetic run, lower-cases the rest.
pub(crate) fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}
