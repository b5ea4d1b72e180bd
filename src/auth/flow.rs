//! Sign-in, sign-up, sign-out, refresh and cold-start restoration flows.
//!
//! Every asynchronous entry point brackets the store's loading flag and
//! resolves it on every exit path: success, provider rejection, or transport
//! failure. The refresh flow is intentionally single-shot; a failed refresh
//! is a dead session, not something to retry.

use crate::gateway::navigate::{Navigator, LOGIN_PATH, REDIRECT_DELAY};
use crate::gateway::notify::{Notifier, Severity};
use crate::session::store::{SessionStore, User};
use crate::supabase::auth::{AuthClient, AuthEvent, AuthUser};
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

/// Outcome surfaced to UI callers.
#[derive(Debug, Clone)]
pub struct AuthResult {
    pub success: bool,
    pub user: Option<User>,
    pub error: Option<String>,
}

impl AuthResult {
    fn ok(user: Option<User>) -> Self {
        Self {
            success: true,
            user,
            error: None,
        }
    }

    fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            user: None,
            error: Some(message.into()),
        }
    }
}

pub struct AuthFlow {
    provider: Arc<AuthClient>,
    store: SessionStore,
    tokens: crate::token::TokenAccessor,
    notifier: Arc<dyn Notifier>,
    navigator: Arc<dyn Navigator>,
}

impl AuthFlow {
    #[must_use]
    pub fn new(
        provider: Arc<AuthClient>,
        store: SessionStore,
        tokens: crate::token::TokenAccessor,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            provider,
            store,
            tokens,
            notifier,
            navigator,
        }
    }

    /// Password sign-in. On success the token pair and user snapshot are
    /// persisted under the canonical keys and the store is updated.
    pub async fn sign_in(&self, email: &str, password: &str) -> AuthResult {
        self.store.set_loading(true);

        match self.provider.sign_in(email, password).await {
            Ok(session) => {
                self.tokens
                    .save_session(&session.access_token, session.refresh_token.as_deref());

                let user = session.user.map(AuthUser::into_user);
                if let Some(user) = &user {
                    self.tokens.save_user_info(user);
                    self.provider.emit(AuthEvent::SignedIn(user.clone()));
                }
                // set_user resolves the loading flag.
                self.store.set_user(user.clone());

                AuthResult::ok(user)
            }
            Err(err) => {
                debug!("sign-in failed: {err}");
                self.store.set_loading(false);
                AuthResult::err(err.to_string())
            }
        }
    }

    /// Register an account. When the project auto-confirms, the returned
    /// session is persisted exactly like a sign-in; otherwise the account
    /// stays signed out until the email is confirmed.
    pub async fn sign_up(&self, email: &str, password: &str, nickname: Option<&str>) -> AuthResult {
        self.store.set_loading(true);

        let nickname = nickname
            .map(str::to_string)
            .or_else(|| email.split('@').next().map(str::to_string))
            .unwrap_or_default();
        let metadata = json!({ "nickname": nickname });

        match self.provider.sign_up(email, password, metadata).await {
            Ok(outcome) => {
                let user = outcome.user.map(AuthUser::into_user);

                if let Some(session) = outcome.session {
                    self.tokens
                        .save_session(&session.access_token, session.refresh_token.as_deref());
                    if let Some(user) = &user {
                        self.tokens.save_user_info(user);
                        self.provider.emit(AuthEvent::SignedIn(user.clone()));
                    }
                    self.store.set_user(user.clone());
                } else {
                    self.store.set_loading(false);
                }

                AuthResult::ok(user)
            }
            Err(err) => {
                debug!("sign-up failed: {err}");
                self.store.set_loading(false);
                AuthResult::err(err.to_string())
            }
        }
    }

    /// Sign out. The server-side call is best effort; local cleanup always
    /// runs, so sign-out is always treated as a success.
    pub async fn sign_out(&self) -> AuthResult {
        self.store.set_loading(true);

        if let Some(token) = self.tokens.access_token() {
            if let Err(err) = self.provider.sign_out(&token).await {
                debug!("server-side sign-out failed, clearing locally: {err}");
            }
        }

        self.tokens.purge();
        self.store.clear_user();
        self.provider.emit(AuthEvent::SignedOut);

        AuthResult::ok(None)
    }

    /// Cold-start restoration: validate any stored token against the
    /// provider and either hydrate or clear the session.
    pub async fn initialize(&self) {
        let Some(token) = self.tokens.access_token() else {
            return;
        };

        self.store.set_loading(true);

        match self.provider.get_user(&token).await {
            Ok(user) => self.store.set_user(Some(user.into_user())),
            Err(err) => {
                debug!("stored token rejected, clearing session: {err}");
                self.tokens.purge();
                self.store.clear_user();
            }
        }
    }

    /// Exchange the stored refresh token for a new pair. One attempt, no
    /// backoff; `false` means the session is not recoverable.
    pub async fn try_refresh_token(&self) -> bool {
        let Some(refresh_token) = self.tokens.refresh_token() else {
            return false;
        };

        match self.provider.refresh_session(&refresh_token).await {
            Ok(session) => {
                self.tokens
                    .save_session(&session.access_token, session.refresh_token.as_deref());
                self.provider.emit(AuthEvent::TokenRefreshed);
                true
            }
            Err(err) => {
                debug!("token refresh failed: {err}");
                false
            }
        }
    }

    /// Produce a currently valid bearer token, refreshing once if needed.
    /// When nothing can be produced the session is torn down and the user is
    /// sent back to sign in.
    pub async fn ensure_valid_token(&self) -> Option<String> {
        if let Some(token) = self.tokens.access_token() {
            return Some(token);
        }

        if self.tokens.refresh_token().is_none() {
            self.handle_auth_error("Not signed in, please sign in first.")
                .await;
            return None;
        }

        if self.try_refresh_token().await {
            self.tokens.access_token()
        } else {
            self.handle_auth_error("Your session has expired, please sign in again.")
                .await;
            None
        }
    }

    /// Teardown for auth-gated flows outside the gateway's response path:
    /// purge storage, clear the store, notify once, then redirect unless
    /// already at the login entry point.
    pub async fn handle_auth_error(&self, message: &str) {
        self.tokens.purge();
        self.store.clear_user();
        self.provider.emit(AuthEvent::SignedOut);

        self.notifier.notify(Severity::Error, message);

        if self.navigator.current_path() != LOGIN_PATH {
            tokio::time::sleep(REDIRECT_DELAY).await;
            self.navigator.navigate(LOGIN_PATH);
        }
    }
}
