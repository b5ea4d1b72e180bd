//! Reverse geocoding proxy backed by AMap. Same contract as the weather
//! proxy: key stays server side, `{ success, address, ... }` out.

use crate::littlejoys::handlers::weather::{parse_coordinates, proxy_error, Coordinates, Point};
use crate::littlejoys::state::AppState;
use axum::{
    extract::{Extension, Query},
    http::{header::ACCEPT, StatusCode},
    response::{IntoResponse, Json, Response},
};
use secrecy::ExposeSecret;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct LocationReport {
    pub success: bool,
    pub address: String,
    pub coordinates: Point,
    pub source: String,
}

#[utoipa::path(
    get,
    path = "/api/location",
    params(Coordinates),
    responses(
        (status = 200, description = "Formatted address", body = LocationReport),
        (status = 400, description = "Missing or invalid coordinates"),
        (status = 500, description = "Provider not configured or unreachable")
    ),
    tag = "proxies"
)]
pub async fn location(
    Query(coords): Query<Coordinates>,
    state: Extension<Arc<AppState>>,
) -> Response {
    let (latitude, longitude) = match parse_coordinates(&coords) {
        Ok(parsed) => parsed,
        Err(response) => return response,
    };

    let Some(key) = &state.amap_key else {
        return proxy_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Map service is not configured",
        );
    };

    // AMap wants lng,lat order.
    let url = format!(
        "https://restapi.amap.com/v3/geocode/regeo?location={longitude},{latitude}&key={}&radius=1000&extensions=all&batch=false&roadlevel=0",
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
            error!("AMap request failed: {err}");
            return proxy_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
        }
    };

    if !response.status().is_success() {
        error!("AMap request failed: {}", response.status());
        return proxy_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
    }

    let data: Value = match response.json().await {
        Ok(data) => data,
        Err(err) => {
            error!("AMap response unreadable: {err}");
            return proxy_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
        }
    };

    let Some(address) = format_address(&data) else {
        return proxy_error(StatusCode::BAD_REQUEST, "Failed to resolve address");
    };

    (
        StatusCode::OK,
        Json(LocationReport {
            success: true,
            address,
            coordinates: Point {
                latitude,
                longitude,
            },
            source: "AMap".to_string(),
        }),
    )
        .into_response()
}

/// Compose province/city/district/township/street/number into one line.
/// AMap encodes "no value" as an empty array instead of a string, so every
/// component goes through [`component_str`].
fn format_address(data: &Value) -> Option<String> {
    if data.get("status").and_then(Value::as_str) != Some("1") {
        return None;
    }
    let component = data.get("regeocode")?.get("addressComponent")?;

    let street_number = component.get("streetNumber");
    let address = format!(
        "{}{}{}{}{}{}",
        component_str(component.get("province")),
        component_str(component.get("city")),
        component_str(component.get("district")),
        component_str(component.get("township")),
        component_str(street_number.and_then(|v| v.get("street"))),
        component_str(street_number.and_then(|v| v.get("number"))),
    );

    if address.is_empty() {
        None
    } else {
        Some(address)
    }
}

fn component_str(value: Option<&Value>) -> &str {
    value.and_then(Value::as_str).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn address_concatenates_components() {
        let data = json!({
            "status": "1",
            "regeocode": {
                "addressComponent": {
                    "province": "上海市",
                    "city": [],
                    "district": "黄浦区",
                    "township": "南京东路街道",
                    "streetNumber": { "street": "南京东路", "number": "100号" }
                }
            }
        });

        assert_eq!(
            format_address(&data),
            Some("上海市黄浦区南京东路街道南京东路100号".to_string())
        );
    }

    #[test]
    fn failed_status_yields_none() {
        assert_eq!(format_address(&json!({ "status": "0" })), None);
        assert_eq!(format_address(&json!({})), None);
    }
}
