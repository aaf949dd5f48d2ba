//! # Hosted provider client
//!
//! [`HostedClient`] implements [`AuthClient`] against the provider's REST API
//! (GoTrue style, rooted at `{url}/auth/v1`). It is constructed explicitly from
//! a [`ProviderConfig`] and handed to whoever needs it; there is no global
//! instance.
//!
//! ## Endpoints
//!
//! | Operation | Request | Event on success |
//! |-----------|---------|------------------|
//! | [`sign_in_with_password`](AuthClient::sign_in_with_password) | `POST /token?grant_type=password` | `SIGNED_IN` |
//! | [`get_session`](AuthClient::get_session) (expiring session) | `POST /token?grant_type=refresh_token` | `TOKEN_REFRESHED` |
//! | [`sign_out`](AuthClient::sign_out) | `POST /logout` with bearer token | `SIGNED_OUT` |
//! | [`check_connection`](HostedClient::check_connection) | `GET /health` | none |
//!
//! Every request carries the `apikey` header. The session lives in memory only;
//! nothing is persisted across reloads.
//!
//! A refresh the provider rejects ends the session (`SIGNED_OUT`). A refresh
//! that fails in transit keeps the stored session and returns the error.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Serialize;
use session::{
    AuthClient, AuthError, AuthEvent, AuthEventKind, AuthListeners, Session, SignInResponse,
    Subscription,
};

use crate::config::ProviderConfig;
use crate::wire::{self, PasswordGrant, RefreshGrant, TokenResponse};

/// Sessions are refreshed this many seconds before they expire.
pub const EXPIRY_MARGIN_SECS: i64 = 30;

struct Inner {
    config: ProviderConfig,
    http: Client,
    session: Mutex<Option<Session>>,
    listeners: AuthListeners,
}

/// Client for the hosted authentication provider. Clones share state.
#[derive(Clone)]
pub struct HostedClient {
    inner: Arc<Inner>,
}

impl HostedClient {
    pub fn new(config: ProviderConfig) -> Self {
        Self::with_http_client(config, Client::new())
    }

    pub fn with_http_client(config: ProviderConfig, http: Client) -> Self {
        tracing::info!(url = %config.url, "auth provider client created");
        Self {
            inner: Arc::new(Inner {
                config,
                http,
                session: Mutex::new(None),
                listeners: AuthListeners::new(),
            }),
        }
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.inner.config
    }

    /// Stored session without refresh or network access.
    pub fn current_session(&self) -> Option<Session> {
        self.session_slot().as_ref().cloned()
    }

    /// Adopt a session obtained elsewhere (an earlier run, a redirect). No
    /// event is emitted; the next `get_session` returns it.
    pub fn restore_session(&self, session: Session) {
        self.store(Some(session));
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.len()
    }

    /// Probe the provider's health endpoint.
    pub async fn check_connection(&self) -> Result<(), AuthError> {
        let response = self
            .request(self.inner.http.get(self.inner.config.auth_endpoint("health")))
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(wire::provider_error(status.as_u16(), &body))
    }

    fn request(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.header("apikey", &self.inner.config.anon_key)
    }

    async fn request_token<B: Serialize>(
        &self,
        grant_type: &str,
        body: &B,
    ) -> Result<(StatusCode, String), AuthError> {
        let response = self
            .request(self.inner.http.post(self.inner.config.auth_endpoint("token")))
            .query(&[("grant_type", grant_type)])
            .json(body)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        let text = response.text().await.map_err(transport)?;
        Ok((status, text))
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session, AuthError> {
        let (status, body) = self
            .request_token("refresh_token", &RefreshGrant { refresh_token })
            .await?;
        if !status.is_success() {
            return Err(wire::provider_error(status.as_u16(), &body));
        }

        let token: TokenResponse = serde_json::from_str(&body).map_err(malformed)?;
        token
            .into_session(now())
            .ok_or_else(|| AuthError::MalformedResponse("refresh response without session".into()))
    }

    fn store(&self, session: Option<Session>) {
        *self.session_slot() = session;
    }

    fn end_session(&self) {
        self.store(None);
        self.inner.listeners.emit(&AuthEvent::signed_out());
    }

    fn session_slot(&self) -> MutexGuard<'_, Option<Session>> {
        self.inner
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl PartialEq for HostedClient {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for HostedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostedClient")
            .field("url", &self.inner.config.url)
            .field("has_session", &self.session_slot().is_some())
            .finish()
    }
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

fn transport(e: reqwest::Error) -> AuthError {
    AuthError::Transport(e.to_string())
}

fn malformed(e: serde_json::Error) -> AuthError {
    AuthError::MalformedResponse(e.to_string())
}

impl AuthClient for HostedClient {
    async fn get_session(&self) -> Result<Option<Session>, AuthError> {
        let Some(session) = self.current_session() else {
            return Ok(None);
        };
        if !self.inner.config.auto_refresh_token
            || !session.expires_within(now(), EXPIRY_MARGIN_SECS)
        {
            return Ok(Some(session));
        }

        let Some(refresh_token) = session.refresh_token.clone() else {
            if session.expires_within(now(), 0) {
                tracing::info!("stored session expired and cannot be refreshed");
                self.end_session();
                return Ok(None);
            }
            return Ok(Some(session));
        };

        tracing::info!("refreshing session");
        match self.refresh(&refresh_token).await {
            Ok(refreshed) => {
                self.store(Some(refreshed.clone()));
                self.inner.listeners.emit(&AuthEvent {
                    kind: AuthEventKind::TokenRefreshed,
                    session: Some(refreshed.clone()),
                });
                Ok(Some(refreshed))
            }
            Err(e @ AuthError::Transport(_)) => {
                tracing::warn!(error = %e, "session refresh could not reach the provider");
                Err(e)
            }
            Err(e) => {
                tracing::warn!(error = %e, "session refresh rejected; ending session");
                self.end_session();
                Err(e)
            }
        }
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<SignInResponse, AuthError> {
        let (status, body) = self
            .request_token("password", &PasswordGrant { email, password })
            .await?;
        if !status.is_success() {
            return Err(wire::sign_in_error(status.as_u16(), &body));
        }

        let token: TokenResponse = serde_json::from_str(&body).map_err(malformed)?;
        let response = token.into_sign_in(now());
        if let Some(session) = &response.session {
            self.store(Some(session.clone()));
            self.inner
                .listeners
                .emit(&AuthEvent::signed_in(session.clone()));
        }
        Ok(response)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        let Some(session) = self.current_session() else {
            self.end_session();
            return Ok(());
        };

        let response = self
            .request(self.inner.http.post(self.inner.config.auth_endpoint("logout")))
            .bearer_auth(&session.access_token)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        // The provider no longer knows the session; locally it is gone as well.
        let already_gone = matches!(
            status,
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND
        );
        if status.is_success() || already_gone {
            self.end_session();
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(wire::provider_error(status.as_u16(), &body))
    }

    fn on_auth_state_change<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&AuthEvent) + Send + Sync + 'static,
    {
        self.inner.listeners.subscribe(listener)
    }
}
