//! REST API client module for the legal-assistant backend.
//!
//! This module provides the `ApiClient` for communicating with the backend,
//! and the `RequestGate` that attaches, withholds, or purges the bearer
//! credential around every call.
//!
//! Session loss (expired credential, server rejection, logout) is announced
//! as a `SessionLoss` on a channel; the host decides how to navigate.

pub mod client;
pub mod error;
pub mod gate;

pub use client::ApiClient;
pub use error::ApiError;
pub use gate::{Inbound, LossReason, Outbound, RequestGate, SessionLoss};
