//! # Provider boundary
//!
//! [`AuthClient`] is the seam between the mirror and whatever actually talks to
//! the hosted provider. Implementations live elsewhere: [`crate::memory`] for
//! tests and offline use, and the HTTP client in the `api` crate.
//!
//! Change notifications are callback based. [`AuthListeners`] is a small
//! registry that implementations embed; registering a callback hands back a
//! [`Subscription`] which removes the callback again when dropped, so the
//! listener is released exactly once no matter how its owner goes away.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use crate::error::AuthError;
use crate::models::{AuthEvent, Session, SignInResponse};

/// Async interface to the hosted authentication provider.
pub trait AuthClient {
    /// Current session held by the provider client, if any.
    fn get_session(&self) -> impl Future<Output = Result<Option<Session>, AuthError>>;

    /// Password-based sign-in.
    fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<SignInResponse, AuthError>>;

    /// End the current session.
    fn sign_out(&self) -> impl Future<Output = Result<(), AuthError>>;

    /// Register a callback for provider auth events.
    fn on_auth_state_change<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&AuthEvent) + Send + Sync + 'static;
}

type Listener = Arc<dyn Fn(&AuthEvent) + Send + Sync>;

#[derive(Default)]
struct ListenerTable {
    next_id: u64,
    entries: BTreeMap<u64, Listener>,
}

/// Registry of auth event callbacks, shared by clones.
#[derive(Clone, Default)]
pub struct AuthListeners {
    table: Arc<Mutex<ListenerTable>>,
}

impl AuthListeners {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener`; it stays registered until the returned handle drops.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&AuthEvent) + Send + Sync + 'static,
    {
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        let id = table.next_id;
        table.next_id += 1;
        table.entries.insert(id, Arc::new(listener));
        tracing::debug!(id, "auth listener registered");

        Subscription {
            id,
            table: Arc::downgrade(&self.table),
        }
    }

    /// Deliver `event` to every registered listener.
    ///
    /// Callbacks run after the registry lock is released, so a callback may
    /// itself subscribe or drop a subscription.
    pub fn emit(&self, event: &AuthEvent) {
        let listeners: Vec<Listener> = {
            let table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
            table.entries.values().cloned().collect()
        };
        tracing::debug!(event = %event.kind, listeners = listeners.len(), "emitting auth event");
        for listener in listeners {
            listener(event);
        }
    }

    /// Number of live subscriptions.
    pub fn len(&self) -> usize {
        self.table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for AuthListeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthListeners")
            .field("len", &self.len())
            .finish()
    }
}

/// Handle to a registered auth listener. Dropping it unregisters the listener.
#[must_use = "dropping a Subscription unregisters the listener immediately"]
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    table: Weak<Mutex<ListenerTable>>,
}

impl Subscription {
    /// Explicitly release the listener. Equivalent to dropping the handle.
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(table) = self.table.upgrade() else {
            return;
        };
        let removed = table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .remove(&self.id);
        if removed.is_some() {
            tracing::debug!(id = self.id, "auth listener released");
        }
    }
}
