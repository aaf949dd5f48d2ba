//! # API crate: hosted authentication provider access
//!
//! Everything that talks to the hosted provider lives here. The session mirror
//! in the `session` crate only sees the [`AuthClient`](session::AuthClient)
//! trait; this crate supplies the implementation the apps use.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | [`ProviderConfig`] from environment variables (runtime or compile time), [`ConfigError`] |
//! | [`client`] | [`HostedClient`]: password sign-in, sign-out, session refresh, health check over `reqwest` |
//! | [`diagnostics`] | Debug-build helpers: auth event tracing and the startup connection test |
//!
//! Request/response bodies are private to the crate (`wire`).

pub mod client;
pub mod config;
pub mod diagnostics;
mod wire;

pub use client::HostedClient;
pub use config::{ConfigError, ProviderConfig};
pub use session::{AuthError, Session, User};
