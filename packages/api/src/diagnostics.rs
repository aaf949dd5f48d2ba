//! Development-only helpers: auth event tracing and a startup connection test.

use session::{AuthClient, Subscription};

use crate::client::HostedClient;

/// Log every provider auth event at debug level until the handle drops.
pub fn log_auth_events(client: &HostedClient) -> Subscription {
    client.on_auth_state_change(|event| {
        let user = event.user();
        tracing::debug!(
            event = %event.kind,
            user = ?user.and_then(|u| u.email.as_deref()),
            role = ?user.and_then(|u| u.role.as_deref()),
            "auth state changed"
        );
    })
}

/// Probe the provider once. Returns whether it answered.
pub async fn test_connection(client: &HostedClient) -> bool {
    match client.check_connection().await {
        Ok(()) => {
            tracing::debug!("auth provider reachable");
            true
        }
        Err(e) => {
            tracing::error!(error = %e, "initial connection test failed");
            false
        }
    }
}
