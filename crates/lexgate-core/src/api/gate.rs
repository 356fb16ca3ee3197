//! Request gate: the interceptors around every backend call.
//!
//! Outbound, the gate asks the token store for a valid credential and either
//! attaches it, sends the request anonymously, or aborts when a stored
//! credential just turned out to be invalid. Inbound, a 401 from anything but
//! a credential-issuing exchange purges the store.
//!
//! Navigation is left to the host: every session loss is announced as a
//! [`SessionLoss`] on an unbounded channel.

use std::sync::Arc;

use reqwest::{RequestBuilder, StatusCode};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::auth::{Credential, Lookup, TokenStore, Validity};
use crate::config::Config;

use super::ApiError;

/// Path fragments of admin endpoints, which answer 404 to non-admins.
const ADMIN_PATHS: [&str; 2] = ["/admin/", "/dashboard/admin/"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LossReason {
    /// Stored credential was past its expiry (or had an unreadable payload)
    Expired,
    /// Stored credential did not have three segments
    Malformed,
    /// Backend answered 401 on a protected endpoint
    Rejected,
    Logout,
}

impl std::fmt::Display for LossReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            LossReason::Expired => "credential expired",
            LossReason::Malformed => "credential malformed",
            LossReason::Rejected => "rejected by server",
            LossReason::Logout => "signed out",
        };
        f.write_str(text)
    }
}

/// Signal that the client went from authenticated to anonymous.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionLoss {
    pub reason: LossReason,
    /// Login entry point the host should navigate to
    pub redirect_to: String,
}

/// Outcome of the outbound check for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Authorized(Credential),
    Anonymous,
}

/// Outcome of the inbound check for one response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inbound {
    PassThrough,
    /// 401 on a protected endpoint; the store has been purged.
    SessionRejected,
}

pub struct RequestGate {
    store: Arc<TokenStore>,
    events: UnboundedSender<SessionLoss>,
    login_path: String,
    auth_endpoints: Vec<String>,
}

impl RequestGate {
    pub fn new(config: &Config, store: Arc<TokenStore>, events: UnboundedSender<SessionLoss>) -> Self {
        Self {
            store,
            events,
            login_path: config.login_path.clone(),
            auth_endpoints: config.auth_endpoints.clone(),
        }
    }

    pub fn store(&self) -> &Arc<TokenStore> {
        &self.store
    }

    /// Decide how an outgoing request is authenticated.
    ///
    /// A credential that was present but failed validation aborts the
    /// request with [`ApiError::SessionLost`]. An empty store sends the
    /// request anonymously without any signal.
    pub fn outbound(&self) -> Result<Outbound, ApiError> {
        match self.store.lookup() {
            Lookup::Valid(credential) => Ok(Outbound::Authorized(credential)),
            Lookup::Empty => Ok(Outbound::Anonymous),
            Lookup::Purged(validity) => {
                let reason = match validity {
                    Validity::Malformed => LossReason::Malformed,
                    Validity::Expired | Validity::Valid => LossReason::Expired,
                };
                info!(%reason, "Aborting request, stored session is no longer valid");
                self.notify(reason);
                Err(ApiError::SessionLost)
            }
        }
    }

    /// Apply [`outbound`](Self::outbound) to a request.
    pub fn authorize(&self, request: RequestBuilder) -> Result<RequestBuilder, ApiError> {
        Ok(match self.outbound()? {
            Outbound::Authorized(credential) => request.bearer_auth(credential.raw()),
            Outbound::Anonymous => request,
        })
    }

    /// React to the status of a response from `path`.
    pub fn inbound(&self, path: &str, status: StatusCode) -> Inbound {
        if !status.is_success() && !(status == StatusCode::NOT_FOUND && is_admin_endpoint(path)) {
            warn!(path = path, status = status.as_u16(), "API error");
        }

        if status != StatusCode::UNAUTHORIZED {
            return Inbound::PassThrough;
        }

        if self.is_auth_exchange(path) {
            debug!(path = path, "401 from credential exchange, leaving session alone");
            return Inbound::PassThrough;
        }

        info!(path = path, "Session rejected by server, purging credential");
        self.store.purge();
        self.notify(LossReason::Rejected);
        Inbound::SessionRejected
    }

    /// Login and registration answer 401 for bad credentials, which says
    /// nothing about the stored session.
    pub fn is_auth_exchange(&self, path: &str) -> bool {
        self.auth_endpoints
            .iter()
            .any(|endpoint| path.contains(endpoint.as_str()))
    }

    /// Announce a session loss to the host.
    pub fn notify(&self, reason: LossReason) {
        let loss = SessionLoss {
            reason,
            redirect_to: self.login_path.clone(),
        };
        if self.events.send(loss).is_err() {
            debug!(%reason, "No listener for session events");
        }
    }
}

fn is_admin_endpoint(path: &str) -> bool {
    ADMIN_PATHS.iter().any(|fragment| path.contains(fragment))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::storage::{MemoryStorage, SlotStorage};
    use crate::auth::{ManualClock, SystemClock};
    use crate::testing::token_with;
    use chrono::{DateTime, Duration};
    use serde_json::json;
    use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver};

    const NOW: i64 = 1_800_000_000;

    struct Fixture {
        storage: Arc<MemoryStorage>,
        clock: Arc<ManualClock>,
        gate: RequestGate,
        events: UnboundedReceiver<SessionLoss>,
    }

    fn fixture() -> Fixture {
        let storage = Arc::new(MemoryStorage::new());
        let clock = Arc::new(ManualClock::new(DateTime::from_timestamp(NOW, 0).unwrap()));
        let store = Arc::new(TokenStore::new(storage.clone(), clock.clone()));
        let (tx, rx) = mpsc::unbounded_channel();
        Fixture {
            storage,
            clock,
            gate: RequestGate::new(&Config::default(), store, tx),
            events: rx,
        }
    }

    #[test]
    fn test_outbound_without_credential_is_anonymous() {
        let mut f = fixture();
        assert_eq!(f.gate.outbound().unwrap(), Outbound::Anonymous);
        assert_eq!(f.events.try_recv(), Err(TryRecvError::Empty));
    }

    #[test]
    fn test_outbound_attaches_valid_credential() {
        let mut f = fixture();
        let raw = token_with(json!({"exp": NOW + 600}));
        f.gate.store().persist(&raw).unwrap();

        match f.gate.outbound().unwrap() {
            Outbound::Authorized(credential) => assert_eq!(credential.raw(), raw),
            other => panic!("expected credential, got {other:?}"),
        }
        assert_eq!(f.events.try_recv(), Err(TryRecvError::Empty));
    }

    #[test]
    fn test_outbound_aborts_when_credential_just_expired() {
        let mut f = fixture();
        f.gate.store().persist(&token_with(json!({"exp": NOW + 5}))).unwrap();
        f.clock.advance(Duration::seconds(6));

        assert!(matches!(f.gate.outbound(), Err(ApiError::SessionLost)));
        assert_eq!(f.storage.read().unwrap(), None);
        assert_eq!(
            f.events.try_recv().unwrap(),
            SessionLoss {
                reason: LossReason::Expired,
                redirect_to: "/login".to_string(),
            }
        );

        // Slot is now empty, so the next request goes out anonymously
        assert_eq!(f.gate.outbound().unwrap(), Outbound::Anonymous);
        assert_eq!(f.events.try_recv(), Err(TryRecvError::Empty));
    }

    #[test]
    fn test_outbound_aborts_on_malformed_storage() {
        let storage = Arc::new(MemoryStorage::with_value("one.two"));
        let store = Arc::new(TokenStore::new(storage, Arc::new(SystemClock)));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let gate = RequestGate::new(&Config::default(), store, tx);

        assert!(matches!(gate.outbound(), Err(ApiError::SessionLost)));
        assert_eq!(rx.try_recv().unwrap().reason, LossReason::Malformed);
    }

    #[test]
    fn test_inbound_401_on_protected_endpoint_purges() {
        let mut f = fixture();
        f.gate.store().persist(&token_with(json!({}))).unwrap();

        assert_eq!(
            f.gate.inbound("/dashboard/history", StatusCode::UNAUTHORIZED),
            Inbound::SessionRejected
        );
        assert_eq!(f.storage.read().unwrap(), None);
        assert_eq!(f.events.try_recv().unwrap().reason, LossReason::Rejected);
    }

    #[test]
    fn test_inbound_401_on_login_leaves_session() {
        let mut f = fixture();
        let raw = token_with(json!({}));
        f.gate.store().persist(&raw).unwrap();

        for path in ["/auth/login", "/auth/register"] {
            assert_eq!(f.gate.inbound(path, StatusCode::UNAUTHORIZED), Inbound::PassThrough);
        }
        assert_eq!(f.storage.read().unwrap().as_deref(), Some(raw.as_str()));
        assert_eq!(f.events.try_recv(), Err(TryRecvError::Empty));
    }

    #[test]
    fn test_inbound_other_statuses_pass_through() {
        let mut f = fixture();
        let raw = token_with(json!({}));
        f.gate.store().persist(&raw).unwrap();

        for status in [
            StatusCode::OK,
            StatusCode::FORBIDDEN,
            StatusCode::NOT_FOUND,
            StatusCode::INTERNAL_SERVER_ERROR,
        ] {
            assert_eq!(f.gate.inbound("/auth/admin/users", status), Inbound::PassThrough);
        }
        assert!(f.storage.read().unwrap().is_some());
        assert_eq!(f.events.try_recv(), Err(TryRecvError::Empty));
    }

    #[test]
    fn test_is_auth_exchange() {
        let f = fixture();
        assert!(f.gate.is_auth_exchange("/auth/login"));
        assert!(f.gate.is_auth_exchange("/v1/auth/register?next=/"));
        assert!(!f.gate.is_auth_exchange("/auth/me"));
        assert!(!f.gate.is_auth_exchange("/auth/change-password"));
    }

    #[test]
    fn test_notify_without_listener_does_not_fail() {
        let f = fixture();
        drop(f.events);
        f.gate.notify(LossReason::Logout);
    }

    #[test]
    fn test_is_admin_endpoint() {
        assert!(is_admin_endpoint("/dashboard/admin/system-stats"));
        assert!(is_admin_endpoint("/auth/admin/users"));
        assert!(!is_admin_endpoint("/dashboard/history"));
    }
}
