//! # Session mirror: provider auth state reflected into observable state
//!
//! [`SessionMirror`] owns an [`AuthState`] and keeps it in step with an
//! [`AuthClient`]. It is generic over the client and over the [`Notifier`] used
//! for user-visible errors, so the same logic runs against the hosted HTTP
//! client in the browser and against [`MemoryClient`](crate::MemoryClient) in
//! tests.
//!
//! ## Lifecycle
//!
//! | Step | Method | Effect |
//! |------|--------|--------|
//! | Mount | [`mount`](SessionMirror::mount) | Default state (`loading = true`, no user) and a provider event subscription. |
//! | Initialize | [`initialize`](SessionMirror::initialize) | Reads the provider's current session, then `loading = false`. |
//! | Operate | [`sign_in`](SessionMirror::sign_in) / [`sign_out`](SessionMirror::sign_out) | Delegate to the provider and update state from the result. |
//! | Teardown | [`teardown`](SessionMirror::teardown) | Releases the subscription; reads and operations return [`AuthError::NotMounted`]. |
//!
//! ## State
//!
//! The state lives in a [`tokio::sync::watch`] channel. Readers get a
//! [`watch::Receiver`] from [`watch`](SessionMirror::watch) and never write.
//! Provider events and explicit operations both write the same channel and the
//! last write wins; there is no ordering between them beyond that.
//!
//! `authenticated` is not stored: [`AuthState::is_authenticated`] is derived
//! from the presence of a user, so the two can never disagree.
//!
//! ## Events
//!
//! `SIGNED_IN` with a session sets the user, `SIGNED_OUT` clears it, and both
//! settle `loading`. Every other event kind leaves the state untouched.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;

use crate::client::{AuthClient, Subscription};
use crate::error::AuthError;
use crate::models::{AuthEvent, AuthEventKind, User};
use crate::notify::{Notice, Notifier};

/// Authentication state as seen by the application.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthState {
    pub user: Option<User>,
    pub loading: bool,
}

impl Default for AuthState {
    fn default() -> Self {
        Self {
            user: None,
            loading: true,
        }
    }
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

/// Apply `f` and log when it changed anything.
fn update(state: &watch::Sender<AuthState>, f: impl FnOnce(&mut AuthState)) {
    let changed = state.send_if_modified(|current| {
        let before = current.clone();
        f(current);
        *current != before
    });
    if changed {
        let current = state.borrow();
        tracing::info!(
            authenticated = current.is_authenticated(),
            has_user = current.user.is_some(),
            loading = current.loading,
            "auth state updated"
        );
    }
}

fn apply_event(state: &mut AuthState, event: &AuthEvent) {
    match (event.kind, &event.session) {
        (AuthEventKind::SignedIn, Some(session)) => {
            state.user = Some(session.user.clone());
            state.loading = false;
        }
        (AuthEventKind::SignedOut, _) => {
            state.user = None;
            state.loading = false;
        }
        _ => {}
    }
}

/// Holds `loading = true` for its lifetime.
struct LoadingGuard<'a> {
    state: &'a watch::Sender<AuthState>,
}

impl<'a> LoadingGuard<'a> {
    fn engage(state: &'a watch::Sender<AuthState>) -> Self {
        update(state, |s| s.loading = true);
        Self { state }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        update(self.state, |s| s.loading = false);
    }
}

/// In-process reflection of the provider's authentication state.
pub struct SessionMirror<C, N> {
    client: C,
    notifier: N,
    state: Arc<watch::Sender<AuthState>>,
    subscription: Mutex<Option<Subscription>>,
}

impl<C: AuthClient, N: Notifier> SessionMirror<C, N> {
    /// Create the mirror and subscribe to provider events.
    pub fn mount(client: C, notifier: N) -> Self {
        let (sender, _) = watch::channel(AuthState::default());
        let state = Arc::new(sender);

        let listener_state = state.clone();
        let subscription = client.on_auth_state_change(move |event: &AuthEvent| {
            tracing::info!(
                event = %event.kind,
                has_session = event.session.is_some(),
                user_id = ?event.user().map(|u| u.id.as_str()),
                "auth event from provider"
            );
            update(&listener_state, |s| apply_event(s, event));
        });
        tracing::info!("session mirror mounted");

        Self {
            client,
            notifier,
            state,
            subscription: Mutex::new(Some(subscription)),
        }
    }

    /// [`mount`](Self::mount) followed by [`initialize`](Self::initialize).
    pub async fn start(client: C, notifier: N) -> Self {
        let mirror = Self::mount(client, notifier);
        mirror.initialize().await;
        mirror
    }

    /// Load the provider's current session into the mirror.
    ///
    /// Errors are logged, not returned: the mirror stays unauthenticated and
    /// `loading` still settles to `false`.
    pub async fn initialize(&self) {
        if !self.is_mounted() {
            tracing::debug!("initialize called after teardown");
            return;
        }
        tracing::info!("checking for an existing session");

        match self.client.get_session().await {
            Ok(Some(session)) => {
                tracing::info!(
                    user_id = %session.user.id,
                    email = ?session.user.email,
                    "existing session found"
                );
                update(&self.state, |s| {
                    s.user = Some(session.user);
                    s.loading = false;
                });
            }
            Ok(None) => {
                tracing::info!("no session found");
                update(&self.state, |s| {
                    s.user = None;
                    s.loading = false;
                });
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to check current session");
                update(&self.state, |s| s.loading = false);
            }
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Current state.
    pub fn snapshot(&self) -> Result<AuthState, AuthError> {
        self.ensure_mounted()?;
        Ok(self.state.borrow().clone())
    }

    /// A receiver that observes every subsequent state change.
    pub fn watch(&self) -> Result<watch::Receiver<AuthState>, AuthError> {
        self.ensure_mounted()?;
        Ok(self.state.subscribe())
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Sign in with email and password.
    ///
    /// An existing provider session is adopted as-is without contacting the
    /// provider again. Failures raise one error notice and are returned.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<(), AuthError> {
        self.ensure_mounted()?;
        tracing::info!(email, "starting sign in");
        let _loading = LoadingGuard::engage(&self.state);

        match self.client.get_session().await {
            Ok(Some(session)) => {
                if session.user.has_email(email) {
                    tracing::info!(
                        user_id = %session.user.id,
                        "existing session found during sign in"
                    );
                } else {
                    tracing::warn!(
                        requested = email,
                        session_user = %session.user.id,
                        "adopting existing session of a different account; supplied credentials not used"
                    );
                }
                self.set_user(Some(session.user));
                return Ok(());
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error = %e, "could not read current session before sign in");
            }
        }

        let response = match self.client.sign_in_with_password(email, password).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(error = %e, "sign in failed");
                self.notifier.notify(Notice::error(e.user_message()));
                return Err(e);
            }
        };

        match response.user {
            Some(user) => {
                tracing::info!(user_id = %user.id, email = ?user.email, "sign in succeeded");
                self.set_user(Some(user));
            }
            None => tracing::warn!("sign in returned no error but no user"),
        }
        Ok(())
    }

    /// End the provider session.
    ///
    /// On failure the current user stays in place and one error notice is raised.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        self.ensure_mounted()?;
        let _loading = LoadingGuard::engage(&self.state);

        if let Err(e) = self.client.sign_out().await {
            tracing::error!(error = %e, "sign out failed");
            self.notifier.notify(Notice::error("Could not sign out"));
            return Err(e);
        }

        self.set_user(None);
        tracing::info!("signed out");
        Ok(())
    }

    /// Release the provider subscription. Later calls are no-ops.
    pub fn teardown(&self) {
        let released = self
            .subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(subscription) = released {
            subscription.unsubscribe();
            tracing::info!("session mirror torn down");
        }
    }

    fn set_user(&self, user: Option<User>) {
        update(&self.state, |s| s.user = user);
    }

    fn ensure_mounted(&self) -> Result<(), AuthError> {
        if self.is_mounted() {
            Ok(())
        } else {
            Err(AuthError::NotMounted)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryClient;
    use crate::models::Session;
    use crate::notify::{NoticeBuffer, NoticeKind};

    const EMAIL: &str = "ana@example.com";
    const PASSWORD: &str = "correct horse";

    type Mirror = SessionMirror<MemoryClient, NoticeBuffer>;

    fn provider() -> MemoryClient {
        MemoryClient::new().with_account(EMAIL, PASSWORD)
    }

    async fn started(client: &MemoryClient, notices: &NoticeBuffer) -> Mirror {
        SessionMirror::start(client.clone(), notices.clone()).await
    }

    fn session_for(email: &str) -> Session {
        Session {
            access_token: "external".into(),
            token_type: "bearer".into(),
            refresh_token: None,
            expires_in: None,
            expires_at: None,
            user: User::new("external-user", email),
        }
    }

    #[tokio::test]
    async fn test_initial_state_is_loading() {
        let mirror = SessionMirror::mount(provider(), NoticeBuffer::new());
        let state = mirror.snapshot().unwrap();
        assert!(state.loading);
        assert!(!state.is_authenticated());
    }

    #[tokio::test]
    async fn test_initialize_without_session() {
        let client = provider();
        let mirror = started(&client, &NoticeBuffer::new()).await;

        let state = mirror.snapshot().unwrap();
        assert!(!state.loading);
        assert!(state.user.is_none());
        assert!(!state.is_authenticated());
    }

    #[tokio::test]
    async fn test_initialize_adopts_existing_session() {
        let client = provider();
        let session = client.sign_in_silently(EMAIL).unwrap();
        let mirror = started(&client, &NoticeBuffer::new()).await;

        let state = mirror.snapshot().unwrap();
        assert!(!state.loading);
        assert!(state.is_authenticated());
        assert_eq!(state.user, Some(session.user));
    }

    #[tokio::test]
    async fn test_initialize_error_leaves_unauthenticated() {
        let client = provider();
        client.fail_next_get_session(AuthError::Transport("connection refused".into()));
        let notices = NoticeBuffer::new();
        let mirror = started(&client, &notices).await;

        let state = mirror.snapshot().unwrap();
        assert!(!state.loading);
        assert!(!state.is_authenticated());
        assert!(notices.notices().is_empty());
    }

    #[tokio::test]
    async fn test_provider_events_update_state() {
        let client = provider();
        let mirror = started(&client, &NoticeBuffer::new()).await;

        client.emit(AuthEvent::signed_in(session_for("bob@example.com")));
        let state = mirror.snapshot().unwrap();
        assert!(state.is_authenticated());
        assert_eq!(state.user.unwrap().id, "external-user");

        client.emit(AuthEvent::signed_out());
        assert!(!mirror.snapshot().unwrap().is_authenticated());
    }

    #[tokio::test]
    async fn test_other_events_are_ignored() {
        let client = provider();
        let mirror = started(&client, &NoticeBuffer::new()).await;
        let mut rx = mirror.watch().unwrap();
        rx.borrow_and_update();

        for kind in [
            AuthEventKind::TokenRefreshed,
            AuthEventKind::UserUpdated,
            AuthEventKind::InitialSession,
            AuthEventKind::Unknown,
        ] {
            client.emit(AuthEvent {
                kind,
                session: Some(session_for("bob@example.com")),
            });
        }
        // Signed in without a session carries nothing to adopt.
        client.emit(AuthEvent {
            kind: AuthEventKind::SignedIn,
            session: None,
        });

        assert!(!rx.has_changed().unwrap());
        assert!(!mirror.snapshot().unwrap().is_authenticated());
    }

    #[tokio::test]
    async fn test_state_follows_last_recognized_event() {
        let events = [
            AuthEvent::signed_in(session_for("bob@example.com")),
            AuthEvent::signed_out(),
            AuthEvent {
                kind: AuthEventKind::TokenRefreshed,
                session: Some(session_for("carol@example.com")),
            },
            AuthEvent {
                kind: AuthEventKind::SignedIn,
                session: None,
            },
        ];

        for a in &events {
            for b in &events {
                for c in &events {
                    let client = provider();
                    let mirror = started(&client, &NoticeBuffer::new()).await;

                    let mut expected: Option<User> = None;
                    for event in [a, b, c] {
                        client.emit(event.clone());
                        match (event.kind, &event.session) {
                            (AuthEventKind::SignedIn, Some(s)) => expected = Some(s.user.clone()),
                            (AuthEventKind::SignedOut, _) => expected = None,
                            _ => {}
                        }
                    }

                    let state = mirror.snapshot().unwrap();
                    assert!(!state.loading);
                    assert_eq!(state.user, expected);
                    assert_eq!(state.is_authenticated(), state.user.is_some());
                }
            }
        }
    }

    #[tokio::test]
    async fn test_sign_in_success() {
        let client = provider();
        let notices = NoticeBuffer::new();
        let mirror = started(&client, &notices).await;

        mirror.sign_in(EMAIL, PASSWORD).await.unwrap();

        let state = mirror.snapshot().unwrap();
        assert!(state.is_authenticated());
        assert!(!state.loading);
        assert_eq!(state.user.unwrap().email.as_deref(), Some(EMAIL));
        assert_eq!(client.sign_in_calls(), 1);
        assert!(notices.notices().is_empty());
    }

    #[tokio::test]
    async fn test_sign_in_adopts_existing_session_without_network_call() {
        let client = provider();
        client.sign_in_silently(EMAIL).unwrap();
        let mirror = started(&client, &NoticeBuffer::new()).await;

        mirror.sign_in(EMAIL, "irrelevant").await.unwrap();

        assert_eq!(client.sign_in_calls(), 0);
        let state = mirror.snapshot().unwrap();
        assert!(state.is_authenticated());
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn test_sign_in_adopts_session_of_other_account() {
        let client = provider();
        client.add_account("bob@example.com", "pw");
        client.sign_in_silently("bob@example.com").unwrap();
        let mirror = started(&client, &NoticeBuffer::new()).await;

        mirror.sign_in(EMAIL, PASSWORD).await.unwrap();

        assert_eq!(client.sign_in_calls(), 0);
        let user = mirror.snapshot().unwrap().user.unwrap();
        assert_eq!(user.email.as_deref(), Some("bob@example.com"));
    }

    #[tokio::test]
    async fn test_sign_in_invalid_credentials() {
        let client = provider();
        let notices = NoticeBuffer::new();
        let mirror = started(&client, &notices).await;

        let err = mirror.sign_in(EMAIL, "wrong").await.unwrap_err();

        assert_eq!(err, AuthError::InvalidCredentials);
        let state = mirror.snapshot().unwrap();
        assert!(!state.is_authenticated());
        assert!(!state.loading);
        assert_eq!(
            notices.notices(),
            vec![Notice::new(NoticeKind::Error, "Invalid email or password")]
        );
    }

    #[tokio::test]
    async fn test_sign_in_without_user_stays_unauthenticated() {
        let client = provider();
        client.respond_without_user(true);
        let notices = NoticeBuffer::new();
        let mirror = started(&client, &notices).await;

        mirror.sign_in(EMAIL, PASSWORD).await.unwrap();

        let state = mirror.snapshot().unwrap();
        assert!(!state.is_authenticated());
        assert!(!state.loading);
        assert!(notices.notices().is_empty());
    }

    #[tokio::test]
    async fn test_sign_in_proceeds_when_session_check_fails() {
        let client = provider();
        let mirror = started(&client, &NoticeBuffer::new()).await;
        client.fail_next_get_session(AuthError::Transport("timeout".into()));

        mirror.sign_in(EMAIL, PASSWORD).await.unwrap();

        assert_eq!(client.sign_in_calls(), 1);
        assert!(mirror.snapshot().unwrap().is_authenticated());
    }

    #[tokio::test]
    async fn test_loading_is_set_while_sign_in_runs() {
        let client = provider();
        let observed: Arc<Mutex<Vec<bool>>> = Arc::new(Mutex::new(Vec::new()));
        let probe_rx: Arc<Mutex<Option<watch::Receiver<AuthState>>>> = Arc::new(Mutex::new(None));

        // Registered before the mirror, so it runs first on each event.
        let _probe = {
            let observed = observed.clone();
            let probe_rx = probe_rx.clone();
            client.on_auth_state_change(move |_| {
                if let Some(rx) = probe_rx.lock().unwrap().as_ref() {
                    observed.lock().unwrap().push(rx.borrow().loading);
                }
            })
        };

        let mirror = started(&client, &NoticeBuffer::new()).await;
        *probe_rx.lock().unwrap() = Some(mirror.watch().unwrap());

        mirror.sign_in(EMAIL, PASSWORD).await.unwrap();

        assert_eq!(*observed.lock().unwrap(), vec![true]);
        assert!(!mirror.snapshot().unwrap().loading);
    }

    #[tokio::test]
    async fn test_sign_out_clears_user() {
        let client = provider();
        let mirror = started(&client, &NoticeBuffer::new()).await;
        mirror.sign_in(EMAIL, PASSWORD).await.unwrap();

        mirror.sign_out().await.unwrap();

        let state = mirror.snapshot().unwrap();
        assert!(!state.is_authenticated());
        assert!(state.user.is_none());
        assert!(!state.loading);
        assert!(client.current_session().is_none());
    }

    #[tokio::test]
    async fn test_sign_out_failure_keeps_user() {
        let client = provider();
        let notices = NoticeBuffer::new();
        let mirror = started(&client, &notices).await;
        mirror.sign_in(EMAIL, PASSWORD).await.unwrap();
        client.fail_next_sign_out(AuthError::Provider {
            status: 500,
            message: "internal".into(),
        });

        let err = mirror.sign_out().await.unwrap_err();

        assert!(matches!(err, AuthError::Provider { status: 500, .. }));
        let state = mirror.snapshot().unwrap();
        assert!(state.is_authenticated());
        assert!(!state.loading);
        assert_eq!(notices.errors(), 1);
        assert_eq!(notices.notices()[0].message, "Could not sign out");
    }

    #[tokio::test]
    async fn test_teardown_stops_event_updates() {
        let client = provider();
        let mirror = started(&client, &NoticeBuffer::new()).await;
        let mut rx = mirror.watch().unwrap();
        rx.borrow_and_update();
        assert_eq!(client.listener_count(), 1);

        mirror.teardown();
        mirror.teardown();

        assert_eq!(client.listener_count(), 0);
        client.emit(AuthEvent::signed_in(session_for("bob@example.com")));
        assert!(!rx.has_changed().unwrap());
        assert!(rx.borrow().user.is_none());
    }

    #[tokio::test]
    async fn test_reads_and_operations_fail_after_teardown() {
        let client = provider();
        let mirror = started(&client, &NoticeBuffer::new()).await;
        mirror.teardown();

        assert_eq!(mirror.snapshot().unwrap_err(), AuthError::NotMounted);
        assert!(mirror.watch().is_err());
        assert_eq!(
            mirror.sign_in(EMAIL, PASSWORD).await.unwrap_err(),
            AuthError::NotMounted
        );
        assert_eq!(mirror.sign_out().await.unwrap_err(), AuthError::NotMounted);
        assert_eq!(client.sign_in_calls(), 0);
        assert_eq!(client.sign_out_calls(), 0);
    }

    #[tokio::test]
    async fn test_drop_releases_subscription() {
        let client = provider();
        let mirror = started(&client, &NoticeBuffer::new()).await;
        let rx = mirror.watch().unwrap();

        drop(mirror);

        assert_eq!(client.listener_count(), 0);
        assert!(rx.has_changed().is_err());
    }
}
