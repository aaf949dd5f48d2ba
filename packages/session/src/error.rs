//! Errors surfaced by provider calls and the session mirror.

use thiserror::Error;

/// Failure of a single provider call or mirror operation.
///
/// Nothing is retried; the error goes straight back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("invalid login credentials")]
    InvalidCredentials,
    #[error("provider returned {status}: {message}")]
    Provider { status: u16, message: String },
    #[error("provider unreachable: {0}")]
    Transport(String),
    #[error("unexpected provider response: {0}")]
    MalformedResponse(String),
    #[error("session mirror is not mounted")]
    NotMounted,
}

impl AuthError {
    /// Short text suitable for a toast.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => "Invalid email or password",
            Self::Transport(_) => "Could not reach the authentication service",
            Self::Provider { .. } | Self::MalformedResponse(_) => {
                "The authentication service returned an error"
            }
            Self::NotMounted => "Authentication is not available",
        }
    }
}
