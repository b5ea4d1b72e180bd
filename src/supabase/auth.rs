//! GoTrue client: password sign-in, signup, user lookup, single-shot refresh
//! and logout, plus the auth-state-change broadcast that keeps session stores
//! synchronized with provider-initiated changes.

use super::{endpoint_url, error_message};
use crate::session::store::User;
use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, instrument};
use uuid::Uuid;

const AUTH_TIMEOUT: Duration = Duration::from_secs(15);
/// Buffered auth events per subscriber before the slowest one starts lagging.
const EVENT_CAPACITY: usize = 16;

#[derive(Debug, Clone, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<i64>,
    pub user: Option<AuthUser>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: Option<String>,
    pub created_at: Option<String>,
    #[serde(default)]
    pub user_metadata: Value,
}

impl AuthUser {
    /// Collapse the provider record into the session store's user shape.
    #[must_use]
    pub fn into_user(self) -> User {
        User {
            id: self.id,
            email: self.email.unwrap_or_default(),
            created_at: self.created_at.unwrap_or_default(),
            metadata: self.user_metadata,
        }
    }
}

/// Signup outcome. The session is absent when the project requires email
/// confirmation before the first sign-in.
#[derive(Debug, Clone)]
pub struct SignUp {
    pub user: Option<AuthUser>,
    pub session: Option<AuthSession>,
}

/// Provider-initiated session change, mirrored to subscribers.
#[derive(Debug, Clone)]
pub enum AuthEvent {
    SignedIn(User),
    TokenRefreshed,
    SignedOut,
}

pub struct AuthClient {
    client: Client,
    base_url: String,
    api_key: String,
    events: broadcast::Sender<AuthEvent>,
}

impl AuthClient {
    /// Build a GoTrue client for the project at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .timeout(AUTH_TIMEOUT)
            .build()?;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Ok(Self {
            client,
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
            events,
        })
    }

    /// Subscribe to auth-state changes. The receiver is resource-scoped:
    /// dropping it ends the subscription.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    pub(crate) fn emit(&self, event: AuthEvent) {
        // No subscribers is fine; events are advisory.
        let _ = self.events.send(event);
    }

    /// Exchange email/password for a session.
    ///
    /// # Errors
    ///
    /// Returns an error with the provider's message on rejected credentials
    /// or transport failure.
    #[instrument(skip_all)]
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession> {
        let url = endpoint_url(&self.base_url, "/auth/v1/token?grant_type=password")?;
        let payload = json!({ "email": email, "password": password });

        let response = self
            .client
            .post(&url)
            .header("apikey", &self.api_key)
            .json(&payload)
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

    /// Register a new account. `metadata` lands in the user's profile record.
    ///
    /// # Errors
    ///
    /// Returns an error with the provider's message on rejection.
    #[instrument(skip_all)]
    pub async fn sign_up(&self, email: &str, password: &str, metadata: Value) -> Result<SignUp> {
        let url = endpoint_url(&self.base_url, "/auth/v1/signup")?;
        let payload = json!({ "email": email, "password": password, "data": metadata });

        let response = self
            .client
            .post(&url)
            .header("apikey", &self.api_key)
            .json(&payload)
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

        // With autoconfirm on, signup answers with a full session; with email
        // confirmation on, it answers with the bare user record.
        let body: Value = response.json().await?;
        if body.get("access_token").is_some() {
            let session: AuthSession = serde_json::from_value(body)?;
            let user = session.user.clone();
            Ok(SignUp {
                user,
                session: Some(session),
            })
        } else {
            let user: AuthUser = serde_json::from_value(body)?;
            Ok(SignUp {
                user: Some(user),
                session: None,
            })
        }
    }

    /// Look up the user a bearer token belongs to.
    ///
    /// # Errors
    ///
    /// Returns an error when the token is invalid, expired or revoked.
    #[instrument(skip_all)]
    pub async fn get_user(&self, access_token: &str) -> Result<AuthUser> {
        let url = endpoint_url(&self.base_url, "/auth/v1/user")?;

        let response = self
            .client
            .get(&url)
            .header("apikey", &self.api_key)
            .bearer_auth(access_token)
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

    /// Exchange a refresh token for a new access/refresh pair. One attempt,
    /// no retry: callers treat failure as an expired session.
    ///
    /// # Errors
    ///
    /// Returns an error when the provider rejects the refresh token.
    #[instrument(skip_all)]
    pub async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession> {
        let url = endpoint_url(&self.base_url, "/auth/v1/token?grant_type=refresh_token")?;
        let payload = json!({ "refresh_token": refresh_token });

        let response = self
            .client
            .post(&url)
            .header("apikey", &self.api_key)
            .json(&payload)
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

    /// Invalidate the server-side session. Local cleanup does not depend on
    /// this succeeding.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or provider rejection.
    #[instrument(skip_all)]
    pub async fn sign_out(&self, access_token: &str) -> Result<()> {
        let url = endpoint_url(&self.base_url, "/auth/v1/logout")?;

        let response = self
            .client
            .post(&url)
            .header("apikey", &self.api_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            debug!("logout returned {}", response.status());
        }

        Ok(())
    }
}
