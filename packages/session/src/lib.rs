//! Framework-agnostic session state: the provider boundary and the mirror that
//! reflects it into observable state.

pub mod client;
pub mod error;
pub mod mirror;
pub mod models;
pub mod notify;

mod memory;
pub use memory::MemoryClient;

pub use client::{AuthClient, AuthListeners, Subscription};
pub use error::AuthError;
pub use mirror::{AuthState, SessionMirror};
pub use models::{AuthEvent, AuthEventKind, Session, SignInResponse, User};
pub use notify::{Notice, NoticeBuffer, NoticeKind, Notifier};
