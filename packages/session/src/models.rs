//! # Provider data model
//!
//! The records the hosted provider hands back and the events it emits. None of
//! these are defined by this workspace in any meaningful sense: the mirror
//! forwards them as-is, so every field beyond `id` is optional or defaulted and
//! unknown fields are ignored on deserialization.
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`User`] | Account record (`id`, `email`, `role`, metadata). |
//! | [`Session`] | Access/refresh token pair plus the [`User`] it belongs to. |
//! | [`AuthEventKind`] / [`AuthEvent`] | Change notifications from the provider's event stream. |
//! | [`SignInResponse`] | Result of a password sign-in; both halves may be absent. |

use serde::{Deserialize, Serialize};

/// Account record supplied by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub aud: Option<String>,
    #[serde(default)]
    pub user_metadata: serde_json::Value,
}

impl User {
    /// Create a user with only an id and email set.
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: Some(email.into()),
            role: Some("authenticated".to_string()),
            aud: None,
            user_metadata: serde_json::Value::Null,
        }
    }

    /// Name from the profile metadata, falling back to email, then id.
    pub fn display_name(&self) -> &str {
        ["full_name", "name"]
            .iter()
            .find_map(|key| self.user_metadata.get(key).and_then(|v| v.as_str()))
            .or(self.email.as_deref())
            .unwrap_or(&self.id)
    }

    /// Case-insensitive email comparison.
    pub fn has_email(&self, email: &str) -> bool {
        self.email
            .as_deref()
            .is_some_and(|own| own.trim().eq_ignore_ascii_case(email.trim()))
    }
}

/// An authenticated session as held by the provider client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime in seconds at the time of issue.
    #[serde(default)]
    pub expires_in: Option<i64>,
    /// Unix timestamp (seconds).
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: User,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl Session {
    /// Whether the session is expired or will be within `margin` seconds of `now`.
    /// Sessions without an expiry never expire.
    pub fn expires_within(&self, now: i64, margin: i64) -> bool {
        self.expires_at.is_some_and(|at| at.saturating_sub(margin) <= now)
    }
}

/// Kinds of change notification emitted by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthEventKind {
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
    PasswordRecovery,
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for AuthEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::InitialSession => "INITIAL_SESSION",
            Self::SignedIn => "SIGNED_IN",
            Self::SignedOut => "SIGNED_OUT",
            Self::TokenRefreshed => "TOKEN_REFRESHED",
            Self::UserUpdated => "USER_UPDATED",
            Self::PasswordRecovery => "PASSWORD_RECOVERY",
            Self::Unknown => "UNKNOWN",
        };
        f.write_str(name)
    }
}

/// A single notification from the provider's event stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthEvent {
    pub kind: AuthEventKind,
    pub session: Option<Session>,
}

impl AuthEvent {
    pub fn signed_in(session: Session) -> Self {
        Self {
            kind: AuthEventKind::SignedIn,
            session: Some(session),
        }
    }

    pub fn signed_out() -> Self {
        Self {
            kind: AuthEventKind::SignedOut,
            session: None,
        }
    }

    pub fn user(&self) -> Option<&User> {
        self.session.as_ref().map(|s| &s.user)
    }
}

/// Outcome of a password sign-in. A provider may report success without
/// returning a user; callers treat that as anomalous.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignInResponse {
    pub user: Option<User>,
    pub session: Option<Session>,
}
