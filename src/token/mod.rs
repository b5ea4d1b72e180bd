//! Token resolution across the storage conventions that accumulated around
//! the auth provider.
//!
//! A bearer token may live under the canonical `access_token` key, inside the
//! provider's own `sb-<ref>-auth-token` session entry, or under ad-hoc keys
//! left behind by earlier iterations. The accessor reconciles them in a fixed
//! order and migrates the first valid hit into the canonical keys, so later
//! lookups short-circuit on step one. Expired entries are deleted on sight;
//! a missing or malformed token is never an error, only `None`.

pub mod claims;

use crate::session::storage::Storage;
use crate::session::store::{User, SESSION_KEY};
use regex::Regex;
use serde_json::Value;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

pub const ACCESS_TOKEN_KEY: &str = "access_token";
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";
pub const USER_INFO_KEY: &str = "user_info";

/// Keys with any of these substrings are considered auth-related for the
/// fallback scan and for teardown purges.
fn is_auth_key(key: &str) -> bool {
    Regex::new(r"(?i)supabase|sb-|auth|token").is_ok_and(|re| re.is_match(key))
}

/// What a stored value turned out to hold.
enum Candidate {
    Valid {
        access_token: String,
        refresh_token: Option<String>,
    },
    Expired,
    NotASession,
}

#[derive(Clone)]
pub struct TokenAccessor {
    storage: Arc<dyn Storage>,
    provider_session_key: String,
}

impl TokenAccessor {
    /// `project_ref` is the provider project identifier that names its
    /// SDK-managed storage entry (`sb-<ref>-auth-token`).
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>, project_ref: &str) -> Self {
        Self {
            storage,
            provider_session_key: format!("sb-{project_ref}-auth-token"),
        }
    }

    /// Resolve a currently valid bearer token, or `None` when nothing valid
    /// is stored anywhere.
    #[must_use]
    pub fn access_token(&self) -> Option<String> {
        self.access_token_at(unix_now())
    }

    fn access_token_at(&self, now: i64) -> Option<String> {
        // 1.–2. The canonical key wins when it holds a live token. A stale
        // one is deleted and never returned; the refresh token is left in
        // place so the refresh flow can still run.
        if let Some(token) = self.storage.get(ACCESS_TOKEN_KEY) {
            if !claims::is_token_expired(&token, now) {
                return Some(token);
            }
            debug!("canonical access token expired, removing");
            self.storage.remove(ACCESS_TOKEN_KEY);
        }

        // 3. The provider's SDK-managed session entry.
        if let Some(raw) = self.storage.get(&self.provider_session_key) {
            match inspect_session_value(&raw, now) {
                Candidate::Valid {
                    access_token,
                    refresh_token,
                } => {
                    self.adopt(&access_token, refresh_token.as_deref());
                    return Some(access_token);
                }
                Candidate::Expired => {
                    debug!("provider session entry expired, removing");
                    self.storage.remove(&self.provider_session_key);
                }
                Candidate::NotASession => {}
            }
        }

        // 4. Anything else that looks auth-related.
        for key in self.storage.keys() {
            if key == ACCESS_TOKEN_KEY || key == self.provider_session_key || !is_auth_key(&key) {
                continue;
            }
            let Some(raw) = self.storage.get(&key) else {
                continue;
            };
            match inspect_session_value(&raw, now) {
                Candidate::Valid {
                    access_token,
                    refresh_token,
                } => {
                    self.adopt(&access_token, refresh_token.as_deref());
                    return Some(access_token);
                }
                Candidate::Expired => {
                    debug!("expired session entry under {key}, removing");
                    self.storage.remove(&key);
                }
                Candidate::NotASession => {}
            }
        }

        None
    }

    /// Copy a token found elsewhere into the canonical keys (self-healing
    /// normalization).
    fn adopt(&self, access_token: &str, refresh_token: Option<&str>) {
        self.save_session(access_token, refresh_token);
    }

    #[must_use]
    pub fn refresh_token(&self) -> Option<String> {
        self.storage.get(REFRESH_TOKEN_KEY)
    }

    /// Persist a token pair under the canonical keys.
    pub fn save_session(&self, access_token: &str, refresh_token: Option<&str>) {
        self.storage.set(ACCESS_TOKEN_KEY, access_token);
        if let Some(refresh_token) = refresh_token {
            self.storage.set(REFRESH_TOKEN_KEY, refresh_token);
        }
    }

    /// Cache the signed-in user snapshot next to the tokens.
    pub fn save_user_info(&self, user: &User) {
        if let Ok(raw) = serde_json::to_string(user) {
            self.storage.set(USER_INFO_KEY, &raw);
        }
    }

    #[must_use]
    pub fn cached_user(&self) -> Option<User> {
        let raw = self.storage.get(USER_INFO_KEY)?;
        serde_json::from_str(&raw).ok()
    }

    /// Remove every credential the session may have left behind: the
    /// canonical keys, the persisted session blob, and any key matching the
    /// auth-related patterns. All removals are synchronous so no caller can
    /// observe a half-cleared session.
    pub fn purge(&self) {
        self.storage.remove(ACCESS_TOKEN_KEY);
        self.storage.remove(REFRESH_TOKEN_KEY);
        self.storage.remove(USER_INFO_KEY);
        self.storage.remove(SESSION_KEY);

        for key in self.storage.keys() {
            if is_auth_key(&key) {
                self.storage.remove(&key);
            }
        }
    }
}

/// Parse a stored value as a provider session and classify its access token.
fn inspect_session_value(raw: &str, now: i64) -> Candidate {
    let Ok(value) = serde_json::from_str::<Value>(raw) else {
        return Candidate::NotASession;
    };
    let Some(access_token) = value.get("access_token").and_then(Value::as_str) else {
        return Candidate::NotASession;
    };

    if claims::is_token_expired(access_token, now) {
        return Candidate::Expired;
    }

    Candidate::Valid {
        access_token: access_token.to_string(),
        refresh_token: value
            .get("refresh_token")
            .and_then(Value::as_str)
            .map(str::to_string),
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs() as i64)
        .unwrap_or_default()
}
