//! End-to-end tests of the fetch pipeline against a mocked OpenWeatherMap.
//!
//! Tests cover:
//! - Query parameters and snapshot mapping
//! - Missing optional fields
//! - API, network and timeout failures
//! - Icon download and decode, including failures

use std::io::Cursor;

use image::{ImageFormat, Rgba, RgbaImage};
use serde_json::json;
use tokio::runtime::Handle;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use weathernow_core::{
    Config, FetchController, FetchError, IconAsset, Inbox, Units, View, WeatherSnapshot,
};

// ============================================================================
// Helpers
// ============================================================================

#[derive(Debug, Default)]
struct RecordingView {
    rendered: Vec<(WeatherSnapshot, Option<IconAsset>)>,
    errors: Vec<FetchError>,
}

impl View for RecordingView {
    fn render(&mut self, snapshot: &WeatherSnapshot, icon: Option<&IconAsset>) {
        self.rendered.push((snapshot.clone(), icon.cloned()));
    }

    fn render_error(&mut self, error: &FetchError) {
        self.errors.push(error.clone());
    }
}

fn mumbai_fixture() -> serde_json::Value {
    json!({
        "coord": {"lon": 72.8479, "lat": 19.0144},
        "weather": [{"id": 721, "main": "Haze", "description": "haze", "icon": "50d"}],
        "base": "stations",
        "main": {
            "temp": 31.2,
            "feels_like": 36.4,
            "temp_min": 30.94,
            "temp_max": 31.2,
            "pressure": 1008,
            "humidity": 66
        },
        "visibility": 3000,
        "wind": {"speed": 4.63, "deg": 270},
        "clouds": {"all": 20},
        "dt": 1717245000,
        "sys": {"type": 1, "id": 9052, "country": "IN", "sunrise": 1717201621, "sunset": 1717248817},
        "timezone": 19800,
        "id": 1275339,
        "name": "Mumbai",
        "cod": 200
    })
}

fn png_icon() -> Vec<u8> {
    let img = RgbaImage::from_pixel(2, 2, Rgba([10, 20, 30, 255]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

fn config_for(server: &MockServer) -> Config {
    Config {
        api_key: Some("TEST_KEY".into()),
        weather_url: format!("{}/data/2.5/weather", server.uri()),
        icon_url: format!("{}/img/wn/{{icon}}@2x.png", server.uri()),
        ..Config::default()
    }
}

fn controller_for(config: Config) -> (FetchController, Inbox) {
    FetchController::from_config(config, Handle::current()).expect("client creation should succeed")
}

async fn mount_icon(server: &MockServer, code: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/img/wn/{code}@2x.png")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(png_icon()))
        .mount(server)
        .await;
}

async fn fetch_one(config: Config, city: &str, units: Units) -> RecordingView {
    let (controller, mut inbox) = controller_for(config);
    let mut view = RecordingView::default();

    let request = controller.submit(city, units).unwrap();
    let applied = inbox.next(&mut view).await;
    assert_eq!(applied, Some(request));

    view
}

// ============================================================================
// Success path
// ============================================================================

mod success_tests {
    use super::*;

    #[tokio::test]
    async fn mumbai_metric_renders_temperature_line() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .and(query_param("q", "Mumbai"))
            .and(query_param("appid", "TEST_KEY"))
            .and(query_param("units", "metric"))
            .respond_with(ResponseTemplate::new(200).set_body_json(mumbai_fixture()))
            .expect(1)
            .mount(&server)
            .await;
        mount_icon(&server, "50d").await;

        let view = fetch_one(config_for(&server), "Mumbai", Units::Metric).await;

        assert!(view.errors.is_empty());
        let (snapshot, icon) = &view.rendered[0];
        assert_eq!(snapshot.temperature_line(), "Temp: 31.2°C");
        assert_eq!(snapshot.heading(), "Mumbai, IN");

        let icon = icon.as_ref().expect("icon should decode");
        assert_eq!(icon.code, "50d");
        assert_eq!((icon.width, icon.height), (2, 2));
    }

    #[tokio::test]
    async fn snapshot_fields_equal_json_values() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .and(query_param("units", "imperial"))
            .respond_with(ResponseTemplate::new(200).set_body_json(mumbai_fixture()))
            .mount(&server)
            .await;
        mount_icon(&server, "50d").await;

        let view = fetch_one(config_for(&server), "Mumbai", Units::Imperial).await;
        let (s, _) = &view.rendered[0];

        assert_eq!(s.city_name.as_deref(), Some("Mumbai"));
        assert_eq!(s.country_code.as_deref(), Some("IN"));
        assert_eq!(s.temperature, Some(31.2));
        assert_eq!(s.feels_like, Some(36.4));
        assert_eq!(s.description.as_deref(), Some("Haze"));
        assert_eq!(s.humidity_pct, Some(66.0));
        assert_eq!(s.wind_speed, Some(4.63));
        assert_eq!(s.pressure_hpa, Some(1008.0));
        assert_eq!(s.cloud_pct, Some(20.0));
        assert_eq!(s.icon_code.as_deref(), Some("50d"));
        assert_eq!(s.units, Units::Imperial);
        assert_eq!(s.temperature_line(), "Temp: 31.2°F");
    }

    #[tokio::test]
    async fn missing_sections_render_placeholders() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "Atlantis",
                "main": {"temp": 12.5},
                "weather": []
            })))
            .mount(&server)
            .await;

        let view = fetch_one(config_for(&server), "Atlantis", Units::Metric).await;
        let (s, icon) = &view.rendered[0];

        assert_eq!(s.wind_speed, None);
        assert_eq!(s.wind_line(), "Wind: — m/s");
        assert_eq!(s.clouds_line(), "Clouds: —%");
        assert_eq!(s.conditions_line(), "Conditions: —");
        assert_eq!(s.heading(), "Atlantis");
        assert!(icon.is_none());
    }

    #[tokio::test]
    async fn failing_icon_still_renders_snapshot() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(ResponseTemplate::new(200).set_body_json(mumbai_fixture()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/img/wn/50d@2x.png"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let view = fetch_one(config_for(&server), "Mumbai", Units::Metric).await;

        assert!(view.errors.is_empty());
        let (snapshot, icon) = &view.rendered[0];
        assert_eq!(snapshot.temperature, Some(31.2));
        assert!(icon.is_none());
    }

    #[tokio::test]
    async fn undecodable_icon_still_renders_snapshot() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(ResponseTemplate::new(200).set_body_json(mumbai_fixture()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/img/wn/50d@2x.png"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let view = fetch_one(config_for(&server), "Mumbai", Units::Metric).await;

        assert_eq!(view.rendered.len(), 1);
        assert!(view.rendered[0].1.is_none());
    }
}

// ============================================================================
// Failure path
// ============================================================================

mod failure_tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn city_not_found_message_is_capitalized() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_json(json!({"cod": "404", "message": "city not found"})),
            )
            .mount(&server)
            .await;

        let view = fetch_one(config_for(&server), "Nowhere", Units::Metric).await;

        assert!(view.rendered.is_empty());
        assert_eq!(view.errors[0], FetchError::Api("city not found".into()));
        assert_eq!(view.errors[0].to_string(), "Failed to fetch weather: City not found");
    }

    #[tokio::test]
    async fn empty_error_body_uses_status() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let view = fetch_one(config_for(&server), "Mumbai", Units::Metric).await;

        assert_eq!(view.errors[0], FetchError::Api("HTTP 503".into()));
    }

    #[tokio::test]
    async fn malformed_success_body_is_an_api_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let view = fetch_one(config_for(&server), "Mumbai", Units::Metric).await;

        match &view.errors[0] {
            FetchError::Api(msg) => assert!(msg.starts_with("Malformed response"), "{msg}"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn slow_server_times_out_as_network_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(mumbai_fixture())
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let config = Config { timeout_secs: 1, ..config_for(&server) };
        let view = fetch_one(config, "Mumbai", Units::Metric).await;

        assert!(matches!(view.errors[0], FetchError::Network(_)));
        assert!(view.errors[0].to_string().starts_with("Network error: "));
    }

    #[tokio::test]
    async fn refused_connection_is_network_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let config = Config {
            api_key: Some("TEST_KEY".into()),
            weather_url: format!("http://{addr}/data/2.5/weather"),
            ..Config::default()
        };
        let view = fetch_one(config, "Mumbai", Units::Metric).await;

        assert!(matches!(view.errors[0], FetchError::Network(_)));
    }

    #[tokio::test]
    async fn placeholder_key_makes_no_request() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(mumbai_fixture()))
            .expect(0)
            .mount(&server)
            .await;

        let config = Config { api_key: Some("YOUR_API_KEY_HERE".into()), ..config_for(&server) };
        let (controller, _inbox) = controller_for(config);

        assert_eq!(controller.submit("Mumbai", Units::Metric), Err(FetchError::Config));
        assert_eq!(controller.submit("  ", Units::Metric), Err(FetchError::Config));
    }

    #[tokio::test]
    async fn blank_city_makes_no_request() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(mumbai_fixture()))
            .expect(0)
            .mount(&server)
            .await;

        let (controller, _inbox) = controller_for(config_for(&server));

        assert_eq!(controller.submit("   ", Units::Metric), Err(FetchError::Validation));
    }
}
