//! Authenticated request gateway.
//!
//! Every call to the journal API goes through here: the token accessor
//! supplies the bearer credential (or nothing, and the server decides), and
//! failures map to one uniform, status-keyed policy. A confirmed `401` is the
//! single response that mutates session state: it tears the whole session
//! down. Everything else is surfaced as a notice and left for the user to
//! retry.

pub mod navigate;
pub mod notify;

use self::navigate::{Navigator, LOGIN_PATH, REDIRECT_DELAY};
use self::notify::{Notifier, Severity};
use crate::session::store::SessionStore;
use crate::token::TokenAccessor;
use reqwest::{header::AUTHORIZATION, Client, Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Request timeout for journal API calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
/// Connect timeout, kept short so unreachable hosts fail fast.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("session expired")]
    Unauthorized,
    #[error("forbidden")]
    Forbidden,
    #[error("not found")]
    NotFound,
    #[error("server error ({status})")]
    Server { status: u16 },
    #[error("request failed ({status}): {message}")]
    Http { status: u16, message: String },
    #[error("request timed out")]
    Timeout,
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid response: {0}")]
    Parse(String),
}

pub struct Gateway {
    client: Client,
    base_url: String,
    tokens: TokenAccessor,
    store: SessionStore,
    notifier: Arc<dyn Notifier>,
    navigator: Arc<dyn Navigator>,
}

impl Gateway {
    /// Build a gateway against `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(
        base_url: impl Into<String>,
        tokens: TokenAccessor,
        store: SessionStore,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, ApiError> {
        let client = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| ApiError::Network(err.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tokens,
            store,
            notifier,
            navigator,
        })
    }

    /// GET a JSON resource.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] per the status-keyed policy; a `401` response
    /// additionally tears the session down before the error is returned.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request(Method::GET, path, None).await
    }

    /// POST a JSON body and parse a JSON response.
    ///
    /// # Errors
    ///
    /// Same contract as [`Gateway::get_json`]; also fails if `body` cannot be
    /// serialized.
    pub async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let body = serde_json::to_value(body).map_err(|err| ApiError::Parse(err.to_string()))?;
        self.request(Method::POST, path, Some(body)).await
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<T, ApiError> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        debug!("journal api request: {} {}", method, url);

        let mut request = self.client.request(method, &url);

        // A missing token sends the request unauthenticated; the server
        // rejects it if the endpoint requires auth.
        if let Some(token) = self.tokens.access_token() {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        if let Some(body) = &body {
            request = request.json(body);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => return Err(self.connection_failure(&err)),
        };

        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|err| ApiError::Parse(format!("failed to decode response: {err}")));
        }

        let body = response.text().await.unwrap_or_default();
        Err(self.failure(status, &body).await)
    }

    fn connection_failure(&self, err: &reqwest::Error) -> ApiError {
        if err.is_timeout() {
            self.notifier.notify(
                Severity::Error,
                "Request timed out, please check your connection.",
            );
            ApiError::Timeout
        } else {
            self.notifier.notify(
                Severity::Error,
                "Network connection failed, please check your network.",
            );
            ApiError::Network(err.to_string())
        }
    }

    async fn failure(&self, status: StatusCode, body: &str) -> ApiError {
        match status {
            StatusCode::UNAUTHORIZED => {
                self.teardown().await;
                ApiError::Unauthorized
            }
            StatusCode::FORBIDDEN => {
                self.notifier.notify(
                    Severity::Error,
                    "You do not have permission to access this resource.",
                );
                ApiError::Forbidden
            }
            StatusCode::NOT_FOUND => {
                self.notifier
                    .notify(Severity::Error, "The requested resource does not exist.");
                ApiError::NotFound
            }
            StatusCode::INTERNAL_SERVER_ERROR => {
                self.notifier
                    .notify(Severity::Error, "Server error, please try again later.");
                ApiError::Server {
                    status: status.as_u16(),
                }
            }
            StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT => {
                self.notifier.notify(
                    Severity::Error,
                    "Service temporarily unavailable, please try again later.",
                );
                ApiError::Server {
                    status: status.as_u16(),
                }
            }
            _ => {
                let message =
                    envelope_message(body).unwrap_or_else(|| "Request failed".to_string());
                self.notifier.notify(Severity::Error, &message);
                ApiError::Http {
                    status: status.as_u16(),
                    message,
                }
            }
        }
    }

    /// Full session teardown after a confirmed auth failure.
    ///
    /// Storage and the in-memory store are cleared synchronously before
    /// anything else runs, so no caller can observe a half-cleared session.
    /// The redirect comes last, and only when not already at the login entry
    /// point.
    pub async fn teardown(&self) {
        self.tokens.purge();
        self.store.clear_user();

        self.notifier.notify(
            Severity::Error,
            "Your session has expired, please sign in again.",
        );

        if self.navigator.current_path() != LOGIN_PATH {
            tokio::time::sleep(REDIRECT_DELAY).await;
            self.navigator.navigate(LOGIN_PATH);
        }
    }
}

/// Server-provided error message from the `{success, message, error}`
/// envelope, if the body carries one.
fn envelope_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    for field in ["message", "detail", "error"] {
        if let Some(text) = value.get(field).and_then(Value::as_str) {
            let text = text.trim();
            if !text.is_empty() {
                return Some(text.to_string());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_message_prefers_message_field() {
        let body = r#"{"success":false,"message":"Content must not be empty","error":"bad"}"#;
        assert_eq!(
            envelope_message(body),
            Some("Content must not be empty".to_string())
        );
    }

    #[test]
    fn envelope_message_falls_back_to_detail_and_error() {
        assert_eq!(
            envelope_message(r#"{"detail":"No such post"}"#),
            Some("No such post".to_string())
        );
        assert_eq!(
            envelope_message(r#"{"error":"boom"}"#),
            Some("boom".to_string())
        );
        assert_eq!(envelope_message(r#"{"message":"  "}"#), None);
        assert_eq!(envelope_message("not json"), None);
    }
}
