//! Client-side session handling for the lexgate legal assistant.
//!
//! The [`auth::TokenStore`] owns the one persisted bearer credential and
//! re-validates it on every read. The [`api::ApiClient`] wraps every backend
//! call in the [`api::RequestGate`], which attaches the credential, aborts
//! on a just-expired one, and purges it when the server rejects it.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

#[cfg(test)]
mod testing;

pub use api::{ApiClient, ApiError, LossReason, SessionLoss};
pub use auth::{AuthSession, AuthState, Credential, TokenStore};
pub use config::Config;
