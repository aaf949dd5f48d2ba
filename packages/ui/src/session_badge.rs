//! Signed-in/out status badge.

use dioxus::prelude::*;

use crate::auth::use_auth;
use crate::icons::{FaCircleUser, FaUserSlash};
use crate::Icon;

/// A small icon with the current user's name, or a signed-out marker.
/// Renders nothing while the session is still loading.
#[component]
pub fn SessionBadge() -> Element {
    let auth = use_auth();
    let state = auth.state();

    if state.loading {
        return rsx! {};
    }

    match &state.user {
        Some(user) => {
            let name = user.display_name().to_string();
            rsx! {
                span {
                    class: "session-badge session-badge--signed-in",
                    title: "Signed in",
                    Icon { icon: FaCircleUser, width: 14, height: 14 }
                    span { class: "session-badge-name", "{name}" }
                }
            }
        }
        None => rsx! {
            span {
                class: "session-badge session-badge--signed-out",
                title: "Signed out",
                Icon { icon: FaUserSlash, width: 14, height: 14 }
            }
        },
    }
}
