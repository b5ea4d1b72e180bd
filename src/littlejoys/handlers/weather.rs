//! Weather proxy. The OpenWeatherMap key stays server side; clients only
//! ever see the normalized report. These proxies answer with their own
//! `{ success, ... }` / `{ error }` shape rather than the standard envelope.

use crate::littlejoys::state::AppState;
use axum::{
    extract::{Extension, Query},
    http::{header::ACCEPT, StatusCode},
    response::{IntoResponse, Json, Response},
};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::error;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct Coordinates {
    pub lat: Option<String>,
    pub lng: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Point {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WeatherDetails {
    pub temperature: i64,
    pub description: String,
    pub icon: String,
    pub location: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WeatherReport {
    pub success: bool,
    pub weather: String,
    pub details: WeatherDetails,
    pub coordinates: Point,
    pub source: String,
}

const WEATHER_ICONS: &[(&str, &str)] = &[
    ("Clear", "☀️"),
    ("Clouds", "⛅"),
    ("Rain", "🌧️"),
    ("Drizzle", "🌦️"),
    ("Thunderstorm", "⛈️"),
    ("Snow", "❄️"),
    ("Mist", "🌫️"),
    ("Fog", "🌫️"),
    ("Haze", "🌫️"),
];

fn weather_icon(weather_main: &str) -> &'static str {
    WEATHER_ICONS
        .iter()
        .find(|(name, _)| *name == weather_main)
        .map_or("🌤️", |(_, icon)| icon)
}

pub(crate) fn proxy_error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// Parse both coordinates or answer the caller's `400`.
pub(crate) fn parse_coordinates(coords: &Coordinates) -> Result<(f64, f64), Response> {
    let (Some(lat), Some(lng)) = (&coords.lat, &coords.lng) else {
        return Err(proxy_error(
            StatusCode::BAD_REQUEST,
            "Missing coordinate parameters",
        ));
    };

    match (lat.parse::<f64>(), lng.parse::<f64>()) {
        (Ok(lat), Ok(lng)) => Ok((lat, lng)),
        _ => Err(proxy_error(
            StatusCode::BAD_REQUEST,
            "Invalid coordinate parameters",
        )),
    }
}

#[utoipa::path(
    get,
    path = "/api/weather",
    params(Coordinates),
    responses(
        (status = 200, description = "Normalized weather report", body = WeatherReport),
        (status = 400, description = "Missing or invalid coordinates"),
        (status = 500, description = "Provider not configured or unreachable")
    ),
    tag = "proxies"
)]
pub async fn weather(
    Query(coords): Query<Coordinates>,
    state: Extension<Arc<AppState>>,
) -> Response {
    let (latitude, longitude) = match parse_coordinates(&coords) {
        Ok(parsed) => parsed,
        Err(response) => return response,
    };

    let Some(key) = &state.openweather_key else {
        return proxy_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Weather service is not configured",
        );
    };

    let url = format!(
        "https://api.openweathermap.org/data/2.5/weather?lat={latitude}&lon={longitude}&appid={}&units=metric",
        key.expose_secret()
    );

    let response = match state
        .http
        .get(&url)
        .header(ACCEPT, "application/json")
        .send()
        .await
    {
        Ok(response) => response,
        Err(err) => {
            error!("OpenWeatherMap request failed: {err}");
            return proxy_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
        }
    };

    if !response.status().is_success() {
        error!("OpenWeatherMap request failed: {}", response.status());
        return proxy_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
    }

    let data: Value = match response.json().await {
        Ok(data) => data,
        Err(err) => {
            error!("OpenWeatherMap response unreadable: {err}");
            return proxy_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
        }
    };

    let Some(report) = build_report(&data, latitude, longitude) else {
        return proxy_error(StatusCode::BAD_REQUEST, "Failed to parse weather data");
    };

    (StatusCode::OK, Json(report)).into_response()
}

fn build_report(data: &Value, latitude: f64, longitude: f64) -> Option<WeatherReport> {
    let temperature = data
        .get("main")?
        .get("temp")
        .and_then(Value::as_f64)?
        .round() as i64;

    let conditions = data.get("weather")?.get(0)?;
    let description = conditions.get("description").and_then(Value::as_str)?;
    let weather_main = conditions.get("main").and_then(Value::as_str)?;

    let icon = weather_icon(weather_main);
    let location = data
        .get("name")
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
        .unwrap_or("current location");

    Some(WeatherReport {
        success: true,
        weather: format!("{icon} {description} {temperature}°C"),
        details: WeatherDetails {
            temperature,
            description: description.to_string(),
            icon: icon.to_string(),
            location: location.to_string(),
        },
        coordinates: Point {
            latitude,
            longitude,
        },
        source: "OpenWeatherMap".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn icons_cover_the_common_conditions() {
        assert_eq!(weather_icon("Clear"), "☀️");
        assert_eq!(weather_icon("Rain"), "🌧️");
        assert_eq!(weather_icon("Volcano"), "🌤️");
    }

    #[test]
    fn report_is_built_from_provider_payload() {
        let payload = serde_json::json!({
            "name": "Shanghai",
            "main": { "temp": 21.6 },
            "weather": [{ "main": "Clouds", "description": "scattered clouds" }]
        });

        let report = build_report(&payload, 31.2, 121.5).expect("should build");
        assert_eq!(report.weather, "⛅ scattered clouds 22°C");
        assert_eq!(report.details.location, "Shanghai");
        assert!(report.success);
    }

    #[test]
    fn report_requires_temp_and_conditions() {
        let payload = serde_json::json!({ "cod": 404 });
        assert!(build_report(&payload, 0.0, 0.0).is_none());
    }

    #[test]
    fn coordinates_must_be_present_and_numeric() {
        let missing = Coordinates { lat: None, lng: Some("121.5".to_string()) };
        assert!(parse_coordinates(&missing).is_err());

        let bad = Coordinates {
            lat: Some("north".to_string()),
            lng: Some("121.5".to_string()),
        };
        assert!(parse_coordinates(&bad).is_err());

        let good = Coordinates {
            lat: Some("31.2".to_string()),
            lng: Some("121.5".to_string()),
        };
        assert_eq!(parse_coordinates(&good).ok(), Some((31.2, 121.5)));
    }
}
