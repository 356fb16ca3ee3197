//! Auth state container: anonymous or signed in as a known user.
//!
//! The only way into `Authenticated` is a credential-issuing exchange (or a
//! restored credential the backend still accepts). There is no refresh.

use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError, LossReason, SessionLoss};
use crate::auth::Lookup;
use crate::models::{AuthResponse, LoginCredentials, RegisterCredentials, User};

#[derive(Debug, Clone, PartialEq)]
pub enum AuthState {
    Anonymous,
    Authenticated(User),
}

pub struct AuthSession {
    api: ApiClient,
    state: AuthState,
}

impl AuthSession {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            state: AuthState::Anonymous,
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    pub fn user(&self) -> Option<&User> {
        match &self.state {
            AuthState::Authenticated(user) => Some(user),
            AuthState::Anonymous => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.state, AuthState::Authenticated(_))
    }

    /// Pick up a persisted session at startup.
    ///
    /// A stored credential is only trusted once the backend confirms it; any
    /// failure fetching the profile purges it.
    pub async fn restore(&mut self) -> &AuthState {
        if self.api.store().retrieve().is_none() {
            debug!("No stored session to restore");
            self.state = AuthState::Anonymous;
            return &self.state;
        }

        self.state = match self.api.me().await {
            Ok(user) => {
                info!(user = %user.username, "Session restored");
                AuthState::Authenticated(user)
            }
            Err(e) => {
                warn!(error = %e, "Stored session not accepted, clearing it");
                self.api.store().purge();
                AuthState::Anonymous
            }
        };
        &self.state
    }

    pub async fn login(&mut self, email: &str, password: &str) -> Result<User, ApiError> {
        let credentials = LoginCredentials {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.discard_stale_credential();
        let response = self.api.login(&credentials).await.map_err(|e| {
            warn!(error = %e, "Login failed");
            e
        })?;
        self.establish(response)
    }

    pub async fn register(
        &mut self,
        email: &str,
        username: &str,
        password: &str,
        full_name: &str,
    ) -> Result<User, ApiError> {
        let credentials = RegisterCredentials {
            email: email.to_string(),
            username: username.to_string(),
            password: password.to_string(),
            full_name: full_name.to_string(),
        };
        self.discard_stale_credential();
        let response = self.api.register(&credentials).await.map_err(|e| {
            warn!(error = %e, "Registration failed");
            e
        })?;
        self.establish(response)
    }

    /// Drop a stored credential that is no longer valid, so the outbound
    /// gate does not abort the exchange that replaces it.
    fn discard_stale_credential(&self) {
        if let Lookup::Purged(validity) = self.api.store().lookup() {
            debug!(?validity, "Discarded stale credential before signing in");
        }
    }

    /// Store the issued credential, then switch to the returned user.
    /// A malformed credential leaves both the store and the state as they were.
    fn establish(&mut self, response: AuthResponse) -> Result<User, ApiError> {
        self.api.store().persist(&response.access_token)?;
        info!(user = %response.user.username, "Signed in");
        self.state = AuthState::Authenticated(response.user.clone());
        Ok(response.user)
    }

    pub fn logout(&mut self) {
        self.api.store().purge();
        self.state = AuthState::Anonymous;
        info!("Signed out");
        self.api.gate().notify(LossReason::Logout);
    }

    /// Fold a loss reported by the request gate into the state.
    pub fn on_session_lost(&mut self, loss: &SessionLoss) {
        if self.is_authenticated() {
            info!(reason = %loss.reason, "Session ended");
        }
        self.state = AuthState::Anonymous;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::storage::{MemoryStorage, SlotStorage};
    use crate::auth::{SystemClock, TokenError, TokenStore};
    use crate::config::Config;
    use crate::testing::token_with;
    use chrono::Utc;
    use serde_json::json;
    use std::sync::Arc;
    use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver};
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct Fixture {
        server: MockServer,
        storage: Arc<MemoryStorage>,
        session: AuthSession,
        events: UnboundedReceiver<SessionLoss>,
    }

    async fn fixture() -> Fixture {
        let server = MockServer::start().await;
        let storage = Arc::new(MemoryStorage::new());
        let store = Arc::new(TokenStore::new(storage.clone(), Arc::new(SystemClock)));
        let (tx, rx) = mpsc::unbounded_channel();
        let config = Config {
            api_base_url: server.uri(),
            ..Config::default()
        };
        let api = ApiClient::new(&config, store, tx).unwrap();
        Fixture {
            server,
            storage,
            session: AuthSession::new(api),
            events: rx,
        }
    }

    fn user_json() -> serde_json::Value {
        json!({"id": "u-1", "email": "av@example.com", "username": "av", "full_name": "Ayse Vural", "role": "free"})
    }

    fn valid_token() -> String {
        token_with(json!({"exp": Utc::now().timestamp() + 3600, "user_id": "u-1"}))
    }

    #[tokio::test]
    async fn test_restore_without_credential_stays_anonymous() {
        let mut f = fixture().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(user_json()))
            .expect(0)
            .mount(&f.server)
            .await;

        assert_eq!(f.session.restore().await, &AuthState::Anonymous);
    }

    #[tokio::test]
    async fn test_restore_with_accepted_credential() {
        let mut f = fixture().await;
        f.storage.write(&valid_token()).unwrap();
        Mock::given(method("GET"))
            .and(path("/auth/me"))
            .respond_with(ResponseTemplate::new(200).set_body_json(user_json()))
            .expect(1)
            .mount(&f.server)
            .await;

        f.session.restore().await;
        assert!(f.session.is_authenticated());
        assert_eq!(f.session.user().unwrap().email, "av@example.com");
    }

    #[tokio::test]
    async fn test_restore_with_rejected_credential_purges() {
        let mut f = fixture().await;
        f.storage.write(&valid_token()).unwrap();
        Mock::given(method("GET"))
            .and(path("/auth/me"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&f.server)
            .await;

        assert_eq!(f.session.restore().await, &AuthState::Anonymous);
        assert_eq!(f.storage.read().unwrap(), None);
    }

    #[tokio::test]
    async fn test_login_persists_issued_credential() {
        let mut f = fixture().await;
        let token = valid_token();
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .and(body_json(json!({"email": "av@example.com", "password": "s3cret"})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"access_token": token.clone(), "user": user_json()})),
            )
            .mount(&f.server)
            .await;

        let user = f.session.login("av@example.com", "s3cret").await.unwrap();
        assert_eq!(user.username, "av");
        assert!(f.session.is_authenticated());
        assert_eq!(f.session.api().store().retrieve().unwrap().raw(), token);
    }

    #[tokio::test]
    async fn test_login_replaces_expired_credential() {
        let mut f = fixture().await;
        f.storage
            .write(&token_with(json!({"exp": Utc::now().timestamp() - 10})))
            .unwrap();
        let fresh = valid_token();
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"access_token": fresh.clone(), "user": user_json()})),
            )
            .expect(1)
            .mount(&f.server)
            .await;

        f.session.login("av@example.com", "s3cret").await.unwrap();
        assert!(f.session.is_authenticated());
        assert_eq!(f.storage.read().unwrap().as_deref(), Some(fresh.as_str()));
        // Signing in over a stale credential is not a session loss
        assert_eq!(f.events.try_recv(), Err(TryRecvError::Empty));
    }

    #[tokio::test]
    async fn test_register_replaces_malformed_credential() {
        let mut f = fixture().await;
        f.storage.write("left-over").unwrap();
        Mock::given(method("POST"))
            .and(path("/auth/register"))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(json!({"access_token": valid_token(), "user": user_json()})),
            )
            .expect(1)
            .mount(&f.server)
            .await;

        f.session
            .register("av@example.com", "av", "s3cret", "Ayse Vural")
            .await
            .unwrap();
        assert!(f.session.is_authenticated());
        assert_eq!(f.events.try_recv(), Err(TryRecvError::Empty));
    }

    #[tokio::test]
    async fn test_login_with_malformed_credential_fails() {
        let mut f = fixture().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"access_token": "opaque-session-id", "user": user_json()})),
            )
            .mount(&f.server)
            .await;

        let err = f.session.login("av@example.com", "s3cret").await.unwrap_err();
        assert!(matches!(
            err,
            ApiError::Credential(TokenError::MalformedCredential(1))
        ));
        assert!(!f.session.is_authenticated());
        assert_eq!(f.storage.read().unwrap(), None);
    }

    #[tokio::test]
    async fn test_register_signs_in() {
        let mut f = fixture().await;
        Mock::given(method("POST"))
            .and(path("/auth/register"))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(json!({"access_token": valid_token(), "user": user_json()})),
            )
            .mount(&f.server)
            .await;

        f.session
            .register("av@example.com", "av", "s3cret", "Ayse Vural")
            .await
            .unwrap();
        assert!(f.session.is_authenticated());
    }

    #[tokio::test]
    async fn test_failed_login_surfaces_server_detail() {
        let mut f = fixture().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "Hesap askiya alindi"})))
            .mount(&f.server)
            .await;

        let err = f.session.login("av@example.com", "x").await.unwrap_err();
        assert_eq!(err.to_string(), "Unauthorized: Hesap askiya alindi");
        assert_eq!(f.events.try_recv(), Err(TryRecvError::Empty));
    }

    #[tokio::test]
    async fn test_logout_purges_and_signals() {
        let mut f = fixture().await;
        f.storage.write(&valid_token()).unwrap();

        f.session.logout();
        assert_eq!(f.session.state(), &AuthState::Anonymous);
        assert_eq!(f.storage.read().unwrap(), None);

        let loss = f.events.try_recv().unwrap();
        assert_eq!(loss.reason, LossReason::Logout);
        assert_eq!(loss.redirect_to, "/login");
    }

    #[tokio::test]
    async fn test_on_session_lost_resets_state() {
        let mut f = fixture().await;
        f.session.state = AuthState::Authenticated(serde_json::from_value(user_json()).unwrap());

        f.session.on_session_lost(&SessionLoss {
            reason: LossReason::Rejected,
            redirect_to: "/login".to_string(),
        });
        assert!(!f.session.is_authenticated());
    }
}
