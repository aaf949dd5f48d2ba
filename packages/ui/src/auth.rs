//! Authentication context and hooks for the UI.
//!
//! [`AuthProvider`] owns a [`SessionMirror`] for the lifetime of the component
//! and copies every state change into a `Signal`, so components re-render when
//! the user signs in or out.

use std::rc::Rc;

use api::HostedClient;
use dioxus::prelude::*;
use session::{AuthError, AuthState, SessionMirror, User};

use crate::toast::{use_toast_notifier, ToastNotifier};

type Mirror = SessionMirror<HostedClient, ToastNotifier>;

/// Handle to the authentication state, provided by [`AuthProvider`].
#[derive(Clone)]
pub struct AuthContext {
    mirror: Rc<Mirror>,
    state: Signal<AuthState>,
}

impl AuthContext {
    pub fn state(&self) -> AuthState {
        (self.state)()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.read().is_authenticated()
    }

    pub fn loading(&self) -> bool {
        self.state.read().loading
    }

    pub fn user(&self) -> Option<User> {
        self.state.read().user.clone()
    }

    /// Errors are already shown as a toast; the result is for callers that
    /// need to react further.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<(), AuthError> {
        self.mirror.sign_in(email, password).await
    }

    pub async fn sign_out(&self) -> Result<(), AuthError> {
        self.mirror.sign_out().await
    }
}

/// Get the authentication context.
///
/// Panics when called outside an [`AuthProvider`].
pub fn use_auth() -> AuthContext {
    use_context::<AuthContext>()
}

/// Like [`use_auth`], but reports a missing provider as an error.
pub fn try_use_auth() -> Result<AuthContext, AuthError> {
    try_use_context::<AuthContext>().ok_or(AuthError::NotMounted)
}

/// Provider component that manages authentication state.
/// Must sit inside a `ToastProvider`.
#[component]
pub fn AuthProvider(client: HostedClient, children: Element) -> Element {
    let notifier = use_toast_notifier();
    let mirror = use_hook(|| Rc::new(SessionMirror::mount(client.clone(), notifier)));
    let mut state = use_signal(AuthState::default);

    let bridge = mirror.clone();
    use_future(move || {
        let mirror = bridge.clone();
        async move {
            let Ok(mut changes) = mirror.watch() else {
                return;
            };
            state.set(changes.borrow_and_update().clone());
            while changes.changed().await.is_ok() {
                state.set(changes.borrow_and_update().clone());
            }
        }
    });

    let init = mirror.clone();
    use_future(move || {
        let mirror = init.clone();
        async move { mirror.initialize().await }
    });

    let teardown = mirror.clone();
    use_drop(move || teardown.teardown());

    use_context_provider(|| AuthContext {
        mirror: mirror.clone(),
        state,
    });

    rsx! {
        {children}
    }
}

/// Email and password form. Calls `on_signed_in` once the user is set.
#[component]
pub fn LoginForm(
    #[props(default)] on_signed_in: EventHandler<()>,
    #[props(default = "Sign in".to_string())] label: String,
) -> Element {
    let auth = use_auth();
    let mut email = use_signal(String::new);
    let mut password = use_signal(String::new);
    let mut pending = use_signal(|| false);

    let busy = pending() || auth.loading();

    let onsubmit = move |evt: FormEvent| {
        evt.prevent_default();
        let auth = auth.clone();
        async move {
            pending.set(true);
            let result = auth.sign_in(&email(), &password()).await;
            pending.set(false);
            if result.is_ok() && auth.is_authenticated() {
                password.set(String::new());
                on_signed_in.call(());
            }
        }
    };

    rsx! {
        form {
            class: "login-form",
            onsubmit: onsubmit,
            label {
                r#for: "login-email",
                "Email"
            }
            input {
                id: "login-email",
                r#type: "email",
                autocomplete: "username",
                required: true,
                value: "{email}",
                oninput: move |evt| email.set(evt.value()),
            }
            label {
                r#for: "login-password",
                "Password"
            }
            input {
                id: "login-password",
                r#type: "password",
                autocomplete: "current-password",
                required: true,
                value: "{password}",
                oninput: move |evt| password.set(evt.value()),
            }
            button {
                class: "login-btn",
                r#type: "submit",
                disabled: busy,
                if busy {
                    "Signing in..."
                } else {
                    "{label}"
                }
            }
        }
    }
}

/// Button to sign the current user out.
#[component]
pub fn SignOutButton(
    #[props(default = "Sign out".to_string())] label: String,
    #[props(default = "".to_string())] class: String,
) -> Element {
    let auth = use_auth();
    let disabled = !auth.is_authenticated() || auth.loading();

    let onclick = move |_| {
        let auth = auth.clone();
        async move {
            if let Err(e) = auth.sign_out().await {
                tracing::error!("Failed to sign out: {}", e);
            }
        }
    };

    rsx! {
        button {
            class: "{class}",
            disabled: disabled,
            onclick: onclick,
            "{label}"
        }
    }
}
