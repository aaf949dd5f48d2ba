//! This crate contains all shared UI for the workspace.

// Re-export icon library
pub use dioxus_free_icons::Icon;
pub mod icons {
    pub use dioxus_free_icons::icons::fa_solid_icons::*;
}

mod auth;
pub use auth::{try_use_auth, use_auth, AuthContext, AuthProvider, LoginForm, SignOutButton};

mod session_badge;
pub use session_badge::SessionBadge;

pub mod toast;
pub use toast::{use_toast_notifier, use_toasts, ToastNotifier, ToastProvider, ToastStack};
