//! Request and response bodies of the provider's REST API.
//!
//! The provider has changed its error shape over time: older deployments send
//! `{"error": "invalid_grant", "error_description": "..."}`, newer ones send
//! `{"code": 400, "error_code": "invalid_credentials", "msg": "..."}`, and a few
//! endpoints use `{"message": "..."}`. [`ErrorBody`] accepts all of them.

use serde::{Deserialize, Serialize};
use session::{AuthError, Session, SignInResponse, User};

#[derive(Debug, Serialize)]
pub(crate) struct PasswordGrant<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct RefreshGrant<'a> {
    pub refresh_token: &'a str,
}

/// Body of a successful `/token` call.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    user: Option<User>,
}

impl TokenResponse {
    /// Convert into a session. `now` fills in `expires_at` when the provider
    /// only sent `expires_in`. Returns `None` without a token or user.
    pub(crate) fn into_session(self, now: i64) -> Option<Session> {
        let access_token = self.access_token?;
        let user = self.user?;
        let expires_at = self
            .expires_at
            .or_else(|| self.expires_in.map(|secs| now.saturating_add(secs)));

        Some(Session {
            access_token,
            token_type: self.token_type.unwrap_or_else(|| "bearer".to_string()),
            refresh_token: self.refresh_token,
            expires_in: self.expires_in,
            expires_at,
            user,
        })
    }

    /// A user without a token is not a usable sign-in, so both halves are
    /// dropped together.
    pub(crate) fn into_sign_in(self, now: i64) -> SignInResponse {
        match self.into_session(now) {
            Some(session) => SignInResponse {
                user: Some(session.user.clone()),
                session: Some(session),
            },
            None => SignInResponse::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl ErrorBody {
    fn parse(body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_default()
    }

    fn message(&self) -> Option<&str> {
        self.error_description
            .as_deref()
            .or(self.msg.as_deref())
            .or(self.message.as_deref())
            .or(self.error.as_deref())
    }

    fn is_invalid_credentials(&self) -> bool {
        self.error_code.as_deref() == Some("invalid_credentials")
            || self.error.as_deref() == Some("invalid_grant")
    }
}

/// Map a failed password sign-in.
pub(crate) fn sign_in_error(status: u16, body: &str) -> AuthError {
    let parsed = ErrorBody::parse(body);
    if matches!(status, 400 | 401 | 422) && parsed.is_invalid_credentials() {
        return AuthError::InvalidCredentials;
    }
    provider_error_from(status, body, &parsed)
}

/// Map any other failed call.
pub(crate) fn provider_error(status: u16, body: &str) -> AuthError {
    provider_error_from(status, body, &ErrorBody::parse(body))
}

fn provider_error_from(status: u16, body: &str, parsed: &ErrorBody) -> AuthError {
    let message = match parsed.message() {
        Some(message) => message.to_string(),
        None if body.trim().is_empty() => "empty response body".to_string(),
        None => body.trim().to_string(),
    };
    AuthError::Provider { status, message }
}
