use thiserror::Error;

/// Everything that can end a submission before a snapshot reaches the View.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// API key missing or still set to the placeholder. Raised before any network call.
    #[error("Please set your OpenWeatherMap API key in the config file or OWM_API_KEY env var.")]
    Config,

    /// City input was empty after trimming.
    #[error("Please enter a city name.")]
    Validation,

    /// Transport-level failure: timeout, DNS, connection refused.
    #[error("Network error: {0}")]
    Network(String),

    /// The server answered, but not with usable weather data.
    #[error("Failed to fetch weather: {}", capitalize(.0))]
    Api(String),
}

/// How a front-end should present an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl FetchError {
    pub fn severity(&self) -> Severity {
        match self {
            FetchError::Config => Severity::Warning,
            FetchError::Validation => Severity::Info,
            FetchError::Network(_) | FetchError::Api(_) => Severity::Error,
        }
    }

    /// Dialog title for this error.
    pub fn title(&self) -> &'static str {
        match self {
            FetchError::Config => "API Key Required",
            FetchError::Validation => "City Required",
            FetchError::Network(_) | FetchError::Api(_) => "Error",
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Network(err.to_string())
    }
}

/// Upper-cases the first character and lower-cases the rest.
pub(crate) fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
