//! Keeps a session store synchronized with provider-initiated auth changes.
//!
//! The subscription is resource-scoped: dropping the [`StoreSync`] guard
//! detaches the forwarding task, so no listener outlives the store that
//! registered it.

use crate::session::store::SessionStore;
use crate::supabase::auth::{AuthClient, AuthEvent};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::debug;

pub struct StoreSync {
    handle: JoinHandle<()>,
}

impl StoreSync {
    /// Subscribe `store` to the provider's auth events until dropped.
    #[must_use]
    pub fn attach(provider: &AuthClient, store: SessionStore) -> Self {
        let mut events = provider.subscribe();

        let handle = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        debug!("auth state change: {event:?}");
                        match event {
                            AuthEvent::SignedIn(user) => store.set_user(Some(user)),
                            AuthEvent::TokenRefreshed => {}
                            AuthEvent::SignedOut => store.clear_user(),
                        }
                    }
                    // Dropped events only mean we missed intermediate states;
                    // the next one carries the current truth.
                    Err(RecvError::Lagged(skipped)) => {
                        debug!("auth event stream lagged, skipped {skipped}");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        Self { handle }
    }
}

impl Drop for StoreSync {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
