//! Login page with the email/password form.

use dioxus::prelude::*;
use ui::{use_auth, LoginForm};

use crate::Route;

#[component]
pub fn Login() -> Element {
    let auth = use_auth();
    let nav = use_navigator();

    // Already signed in: go home.
    let signed_in = auth.clone();
    use_effect(move || {
        let state = signed_in.state();
        if !state.loading && state.is_authenticated() {
            nav.replace(Route::Home {});
        }
    });

    rsx! {
        div {
            class: "page",
            h1 { "Sign in" }
            p { "Use the email and password of your account." }
            LoginForm {
                on_signed_in: move |_| {
                    nav.replace(Route::Home {});
                },
            }
        }
    }
}
