//! Toast notifications: the UI side of [`Notifier`].

use dioxus::prelude::*;
use session::{Notice, NoticeKind, Notifier};

use crate::icons::FaXmark;
use crate::Icon;

const TOAST_CSS: Asset = asset!("/assets/styling/toast.css");

#[derive(Clone, Debug, PartialEq)]
pub struct Toast {
    pub id: u64,
    pub kind: NoticeKind,
    pub message: String,
    pub timestamp: String,
}

#[derive(Clone, Debug, Default)]
pub struct ToastLog {
    pub entries: Vec<Toast>,
    next_id: u64,
}

impl ToastLog {
    pub fn push(&mut self, notice: Notice) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push(Toast {
            id,
            kind: notice.kind,
            message: notice.message,
            timestamp: current_time(),
        });
        id
    }

    pub fn dismiss(&mut self, id: u64) {
        self.entries.retain(|t| t.id != id);
    }
}

pub fn use_toasts() -> Signal<ToastLog> {
    use_context::<Signal<ToastLog>>()
}

/// [`Notifier`] that appends to the toast log in context.
#[derive(Clone, Copy)]
pub struct ToastNotifier {
    log: Signal<ToastLog>,
}

impl ToastNotifier {
    pub fn new(log: Signal<ToastLog>) -> Self {
        Self { log }
    }
}

impl Notifier for ToastNotifier {
    fn notify(&self, notice: Notice) {
        let mut log = self.log;
        log.write().push(notice);
    }
}

pub fn use_toast_notifier() -> ToastNotifier {
    ToastNotifier::new(use_toasts())
}

#[component]
pub fn ToastProvider(children: Element) -> Element {
    use_context_provider(|| Signal::new(ToastLog::default()));

    rsx! {
        {children}
    }
}

#[component]
pub fn ToastStack() -> Element {
    let mut log = use_toasts();
    let entries = log().entries.clone();

    if entries.is_empty() {
        return rsx! {};
    }

    rsx! {
        document::Stylesheet { href: TOAST_CSS }

        div {
            class: "toast-stack",
            for toast in entries {
                div {
                    key: "{toast.id}",
                    class: match toast.kind {
                        NoticeKind::Error => "toast error",
                        NoticeKind::Warning => "toast warning",
                        NoticeKind::Success => "toast success",
                        NoticeKind::Info => "toast info",
                    },
                    role: "alert",
                    span { class: "toast-time", "{toast.timestamp}" }
                    span { class: "toast-message", "{toast.message}" }
                    button {
                        class: "toast-dismiss",
                        title: "Dismiss",
                        onclick: move |_| log.write().dismiss(toast.id),
                        Icon { icon: FaXmark, width: 12, height: 12 }
                    }
                }
            }
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn current_time() -> String {
    let date = js_sys::Date::new_0();
    let h = date.get_hours();
    let m = date.get_minutes();
    let s = date.get_seconds();
    format!("{h:02}:{m:02}:{s:02}")
}

#[cfg(not(target_arch = "wasm32"))]
fn current_time() -> String {
    "00:00:00".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_assigns_increasing_ids() {
        let mut log = ToastLog::default();
        let first = log.push(Notice::error("Invalid email or password"));
        let second = log.push(Notice::new(NoticeKind::Info, "Signed in"));

        assert!(second > first);
        assert_eq!(log.entries.len(), 2);
        assert_eq!(log.entries[0].kind, NoticeKind::Error);
    }

    #[test]
    fn test_dismiss_removes_only_that_toast() {
        let mut log = ToastLog::default();
        let first = log.push(Notice::error("Could not sign out"));
        log.push(Notice::error("Could not sign out"));

        log.dismiss(first);

        assert_eq!(log.entries.len(), 1);
        assert_ne!(log.entries[0].id, first);
    }
}
