//! JSON envelope every journal API route returns: `{ success, data?,
//! message?, error? }` with an HTTP status mirroring the outcome. This shape
//! is the wire contract the client gateway is built against.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn ok<T: Serialize>(data: T, message: &str) -> Response {
    (
        StatusCode::OK,
        Json(Envelope {
            success: true,
            data: Some(data),
            message: Some(message.to_string()),
            error: None,
        }),
    )
        .into_response()
}

pub fn failure(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(Envelope::<()> {
            success: false,
            data: None,
            message: Some(message.to_string()),
            error: None,
        }),
    )
        .into_response()
}
