use dioxus::prelude::*;
use ui::{use_auth, SessionBadge, SignOutButton};

use crate::Route;

/// Landing page for signed-in users. Sends everyone else to `/login`.
#[component]
pub fn Home() -> Element {
    let auth = use_auth();
    let nav = use_navigator();

    let guard = auth.clone();
    use_effect(move || {
        let state = guard.state();
        if !state.loading && !state.is_authenticated() {
            nav.replace(Route::Login {});
        }
    });

    let state = auth.state();
    if state.loading {
        return rsx! {
            div { class: "page", p { "Loading..." } }
        };
    }

    let name = state
        .user
        .as_ref()
        .map(|u| u.display_name().to_string())
        .unwrap_or_default();

    rsx! {
        div {
            class: "page",
            SessionBadge {}
            h1 { "Welcome, {name}" }
            SignOutButton { class: "sign-out-btn" }
        }
    }
}
