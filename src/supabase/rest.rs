//! PostgREST access with the service role key: row reads, inserts and
//! exact-count queries. The service key never leaves the server process.

use super::{endpoint_url, error_message};
use anyhow::{anyhow, Result};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use std::time::Duration;
use tracing::instrument;

const REST_TIMEOUT: Duration = Duration::from_secs(15);

pub struct RestClient {
    client: Client,
    base_url: String,
    service_key: SecretString,
}

impl RestClient {
    /// Build a PostgREST client for the project at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(base_url: &str, service_key: SecretString) -> Result<Self> {
        let client = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .timeout(REST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
            service_key,
        })
    }

    /// `GET /rest/v1/{table}?{query}`, returning the matching rows.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-success status.
    #[instrument(skip(self))]
    pub async fn select(&self, table: &str, query: &str) -> Result<Vec<Value>> {
        let url = endpoint_url(&self.base_url, &format!("/rest/v1/{table}?{query}"))?;

        let response = self
            .client
            .get(&url)
            .header("apikey", self.service_key.expose_secret())
            .bearer_auth(self.service_key.expose_secret())
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let json_response: Value = response.json().await.unwrap_or(Value::Null);
            return Err(anyhow!(
                "{} - {}, {}",
                url,
                status,
                error_message(&json_response)
            ));
        }

        Ok(response.json().await?)
    }

    /// Insert one row and return the created representation.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-success status, or an
    /// empty representation.
    #[instrument(skip(self, row))]
    pub async fn insert(&self, table: &str, row: &Value) -> Result<Value> {
        let url = endpoint_url(&self.base_url, &format!("/rest/v1/{table}"))?;

        let response = self
            .client
            .post(&url)
            .header("apikey", self.service_key.expose_secret())
            .bearer_auth(self.service_key.expose_secret())
            .header("Prefer", "return=representation")
            .json(row)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let json_response: Value = response.json().await.unwrap_or(Value::Null);
            return Err(anyhow!(
                "{} - {}, {}",
                url,
                status,
                error_message(&json_response)
            ));
        }

        let mut rows: Vec<Value> = response.json().await?;
        if rows.is_empty() {
            return Err(anyhow!("insert into {table} returned no representation"));
        }
        Ok(rows.remove(0))
    }

    /// Exact row count for `query` via a HEAD request; the total comes back
    /// in the `content-range` header (`0-24/3051` or `*/0`).
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-success status, or a
    /// missing/unparseable `content-range` header.
    #[instrument(skip(self))]
    pub async fn count(&self, table: &str, query: &str) -> Result<u64> {
        let url = endpoint_url(&self.base_url, &format!("/rest/v1/{table}?{query}"))?;

        let response = self
            .client
            .head(&url)
            .header("apikey", self.service_key.expose_secret())
            .bearer_auth(self.service_key.expose_secret())
            .header("Prefer", "count=exact")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!("{} - {}", url, response.status()));
        }

        let content_range = response
            .headers()
            .get("content-range")
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| anyhow!("Error parsing count response: no content-range header"))?;

        parse_content_range_total(content_range)
            .ok_or_else(|| anyhow!("Error parsing count response: bad content-range {content_range}"))
    }
}

fn parse_content_range_total(content_range: &str) -> Option<u64> {
    content_range.rsplit('/').next()?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_range_totals_parse() {
        assert_eq!(parse_content_range_total("0-24/3051"), Some(3051));
        assert_eq!(parse_content_range_total("*/0"), Some(0));
        assert_eq!(parse_content_range_total("*/*"), None);
        assert_eq!(parse_content_range_total("garbage"), None);
    }
}
