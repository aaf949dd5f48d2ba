use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::client::{AuthClient, AuthListeners, Subscription};
use crate::error::AuthError;
use crate::models::{AuthEvent, AuthEventKind, Session, SignInResponse, User};

struct Account {
    password: String,
    user: User,
}

#[derive(Default)]
struct MemoryState {
    accounts: HashMap<String, Account>,
    session: Option<Session>,
    next_id: u64,
    sign_in_calls: usize,
    sign_out_calls: usize,
    get_session_failure: Option<AuthError>,
    sign_out_failure: Option<AuthError>,
    omit_user: bool,
}

/// In-memory provider for testing and offline demos.
///
/// Accounts, the current session and scripted failures all live behind one
/// shared lock; clones talk to the same provider.
#[derive(Clone, Default)]
pub struct MemoryClient {
    state: Arc<Mutex<MemoryState>>,
    listeners: AuthListeners,
}

impl MemoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to register an account.
    pub fn with_account(self, email: &str, password: &str) -> Self {
        self.add_account(email, password);
        self
    }

    /// Register an account and return its user record.
    pub fn add_account(&self, email: &str, password: &str) -> User {
        let mut state = self.lock();
        state.next_id += 1;
        let user = User::new(format!("user-{}", state.next_id), email.trim());
        state.accounts.insert(
            normalize(email),
            Account {
                password: password.to_string(),
                user: user.clone(),
            },
        );
        user
    }

    /// Start with the account for `email` already signed in.
    /// Returns `None` if no such account exists.
    pub fn sign_in_silently(&self, email: &str) -> Option<Session> {
        let mut state = self.lock();
        let user = state.accounts.get(&normalize(email))?.user.clone();
        let session = issue_session(&mut state, user);
        state.session = Some(session.clone());
        Some(session)
    }

    pub fn current_session(&self) -> Option<Session> {
        self.lock().session.clone()
    }

    /// Number of password sign-in calls that reached the provider.
    pub fn sign_in_calls(&self) -> usize {
        self.lock().sign_in_calls
    }

    pub fn sign_out_calls(&self) -> usize {
        self.lock().sign_out_calls
    }

    /// Make the next `get_session` call fail with `error`.
    pub fn fail_next_get_session(&self, error: AuthError) {
        self.lock().get_session_failure = Some(error);
    }

    /// Make the next `sign_out` call fail with `error`.
    pub fn fail_next_sign_out(&self, error: AuthError) {
        self.lock().sign_out_failure = Some(error);
    }

    /// Report successful sign-ins without a user or session.
    pub fn respond_without_user(&self, enabled: bool) {
        self.lock().omit_user = enabled;
    }

    /// Deliver an event as if it came from the provider (another tab, token
    /// expiry, ...). The stored session is updated to match.
    pub fn emit(&self, event: AuthEvent) {
        {
            let mut state = self.lock();
            match event.kind {
                AuthEventKind::SignedIn | AuthEventKind::TokenRefreshed => {
                    if let Some(session) = &event.session {
                        state.session = Some(session.clone());
                    }
                }
                AuthEventKind::SignedOut => state.session = None,
                _ => {}
            }
        }
        self.listeners.emit(&event);
    }

    /// Number of live event subscriptions.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}

fn issue_session(state: &mut MemoryState, user: User) -> Session {
    state.next_id += 1;
    Session {
        access_token: format!("memory-access-{}", state.next_id),
        token_type: "bearer".to_string(),
        refresh_token: Some(format!("memory-refresh-{}", state.next_id)),
        expires_in: None,
        expires_at: None,
        user,
    }
}

impl AuthClient for MemoryClient {
    async fn get_session(&self) -> Result<Option<Session>, AuthError> {
        let mut state = self.lock();
        if let Some(error) = state.get_session_failure.take() {
            return Err(error);
        }
        Ok(state.session.clone())
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<SignInResponse, AuthError> {
        let session = {
            let mut state = self.lock();
            state.sign_in_calls += 1;

            let user = match state.accounts.get(&normalize(email)) {
                Some(account) if account.password == password => account.user.clone(),
                _ => return Err(AuthError::InvalidCredentials),
            };
            if state.omit_user {
                return Ok(SignInResponse::default());
            }

            let session = issue_session(&mut state, user);
            state.session = Some(session.clone());
            session
        };

        self.listeners.emit(&AuthEvent::signed_in(session.clone()));
        Ok(SignInResponse {
            user: Some(session.user.clone()),
            session: Some(session),
        })
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        {
            let mut state = self.lock();
            state.sign_out_calls += 1;
            if let Some(error) = state.sign_out_failure.take() {
                return Err(error);
            }
            state.session = None;
        }
        self.listeners.emit(&AuthEvent::signed_out());
        Ok(())
    }

    fn on_auth_state_change<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&AuthEvent) + Send + Sync + 'static,
    {
        self.listeners.subscribe(listener)
    }
}
