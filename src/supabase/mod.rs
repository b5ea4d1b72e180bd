//! Thin REST clients for the Supabase services the journal relies on:
//! GoTrue for identity and PostgREST for rows and counts. Both speak plain
//! JSON over HTTP; no SDK sits in between.

pub mod auth;
pub mod rest;

use anyhow::{anyhow, Result};
use serde_json::Value;
use url::Url;

/// Compose an absolute endpoint URL from the project base URL.
///
/// # Errors
///
/// Returns an error if the base URL cannot be parsed or uses an unsupported
/// scheme.
pub fn endpoint_url(base_url: &str, endpoint: &str) -> Result<String> {
    let url = Url::parse(base_url)?;

    let scheme = url.scheme();

    let host = url
        .host()
        .ok_or_else(|| anyhow!("Error parsing URL: no host specified"))?
        .to_owned();

    let port = match url.port() {
        Some(p) => p,
        None => match scheme {
            "http" => 80,
            "https" => 443,
            _ => return Err(anyhow!("Error parsing URL: unsupported scheme {}", scheme)),
        },
    };

    Ok(format!("{scheme}://{host}:{port}{endpoint}"))
}

/// Derive the project ref (the host's first label) that names the provider's
/// SDK-managed storage entry.
///
/// # Errors
///
/// Returns an error if the base URL has no host.
pub fn project_ref(base_url: &str) -> Result<String> {
    let url = Url::parse(base_url)?;
    let host = url
        .host_str()
        .ok_or_else(|| anyhow!("Error parsing URL: no host specified"))?;

    Ok(host.split('.').next().unwrap_or(host).to_string())
}

/// Best human-readable message from a provider error body.
pub(crate) fn error_message(body: &Value) -> String {
    for field in ["error_description", "msg", "message", "error"] {
        if let Some(text) = body.get(field).and_then(Value::as_str) {
            if !text.trim().is_empty() {
                return text.trim().to_string();
            }
        }
    }

    "unknown error".to_string()
}
