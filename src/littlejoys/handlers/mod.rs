pub mod health;
pub mod location;
pub mod posts;
pub mod refresh;
pub mod stats;
pub mod weather;

use axum::http::{header::AUTHORIZATION, HeaderMap};

/// Bearer credential from the `Authorization` header, if present.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    value.strip_prefix("Bearer ").map(str::to_string)
}
