//! Single source of truth for "who is signed in".
//!
//! `user` and `is_authenticated` survive a restart through the injected
//! storage; `is_loading` never persists, so a crash mid-resolution can not
//! strand a reopened session in a permanent loading state.
//! `is_authenticated` is always derived from `user` and never set on its own.

use crate::session::storage::Storage;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, Mutex, PoisonError};
use uuid::Uuid;

/// Storage key for the persisted session blob.
pub const SESSION_KEY: &str = "auth-storage";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub created_at: String,
    #[serde(default)]
    pub metadata: Value,
}

/// Fields that may be patched onto an existing user record.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub email: Option<String>,
    pub created_at: Option<String>,
    pub metadata: Option<Value>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedSession {
    user: Option<User>,
    is_authenticated: bool,
}

#[derive(Debug, Default)]
struct SessionState {
    user: Option<User>,
    is_authenticated: bool,
    is_loading: bool,
}

#[derive(Clone)]
pub struct SessionStore {
    storage: Arc<dyn Storage>,
    state: Arc<Mutex<SessionState>>,
}

impl SessionStore {
    /// Restore the persisted session from storage. `is_loading` always starts
    /// `false` and `is_authenticated` is recomputed from the restored user.
    #[must_use]
    pub fn load(storage: Arc<dyn Storage>) -> Self {
        let persisted = storage
            .get(SESSION_KEY)
            .and_then(|raw| serde_json::from_str::<PersistedSession>(&raw).ok())
            .unwrap_or_default();

        let state = SessionState {
            is_authenticated: persisted.user.is_some(),
            user: persisted.user,
            is_loading: false,
        };

        Self {
            storage,
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, state: &SessionState) {
        let persisted = PersistedSession {
            user: state.user.clone(),
            is_authenticated: state.is_authenticated,
        };
        if let Ok(raw) = serde_json::to_string(&persisted) {
            self.storage.set(SESSION_KEY, &raw);
        }
    }

    /// Replace the user wholesale. Resolves any pending loading state.
    pub fn set_user(&self, user: Option<User>) {
        let mut state = self.state();
        state.is_authenticated = user.is_some();
        state.user = user;
        state.is_loading = false;
        self.persist(&state);
    }

    /// Bracket an asynchronous resolution window.
    pub fn set_loading(&self, loading: bool) {
        self.state().is_loading = loading;
    }

    /// Clear the user, used by logout and by 401-triggered teardown.
    pub fn clear_user(&self) {
        self.set_user(None);
    }

    /// Shallow-merge fields into the current user. No-op when signed out.
    pub fn update_user(&self, patch: UserPatch) {
        let mut state = self.state();
        let Some(user) = state.user.as_mut() else {
            return;
        };

        if let Some(email) = patch.email {
            user.email = email;
        }
        if let Some(created_at) = patch.created_at {
            user.created_at = created_at;
        }
        if let Some(metadata) = patch.metadata {
            user.metadata = metadata;
        }
        self.persist(&state);
    }

    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.state().user.clone()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state().is_authenticated
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.state().is_loading
    }
}
