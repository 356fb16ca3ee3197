//! API client for the legal-assistant backend.
//!
//! Every call goes through one path: gate outbound check, send, gate inbound
//! check, status mapping. Nothing here retries; callers decide that.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{header, Client, Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

use crate::auth::TokenStore;
use crate::config::Config;
use crate::models::admin::{RoleUpdate, StatusUpdate};
use crate::models::{
    AdminUser, AuthResponse, ChangePasswordCredentials, ChatSessionResponse, Dashboard, DayRange,
    FeedbackRequest, LoginCredentials, MessageResponse, Page, RagQueryRequest, RagQueryResponse,
    RegisterCredentials, SystemStats, UsageChart, User, UserAnalytics, UserListPage, UserQuery,
    UserRole, UserStats,
};

use super::gate::{RequestGate, SessionLoss};
use super::ApiError;

/// API client pre-wired with the request gate.
/// Clone is cheap - reqwest::Client and the gate are both shared.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    gate: Arc<RequestGate>,
}

impl ApiClient {
    pub fn new(
        config: &Config,
        store: Arc<TokenStore>,
        events: UnboundedSender<SessionLoss>,
    ) -> Result<Self, ApiError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            gate: Arc::new(RequestGate::new(config, store, events)),
        })
    }

    pub fn gate(&self) -> &RequestGate {
        &self.gate
    }

    pub fn store(&self) -> &Arc<TokenStore> {
        self.gate.store()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: Response) -> Result<Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn send(&self, path: &str, request: RequestBuilder) -> Result<Response, ApiError> {
        let request = self.gate.authorize(request)?;
        let response = request.send().await?;
        self.gate.inbound(path, response.status());
        Self::check_response(response).await
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        request: RequestBuilder,
    ) -> Result<T, ApiError> {
        debug!(%method, path = path, "API request");
        let response = self.send(path, request).await?;
        response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("{} {}: {}", method, path, e)))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let request = self.client.get(self.url(path));
        self.request(Method::GET, path, request).await
    }

    async fn get_with_query<T: DeserializeOwned, Q: Serialize>(
        &self,
        path: &str,
        query: &Q,
    ) -> Result<T, ApiError> {
        let request = self.client.get(self.url(path)).query(query);
        self.request(Method::GET, path, request).await
    }

    async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T, ApiError> {
        let request = self.client.post(self.url(path)).json(body);
        self.request(Method::POST, path, request).await
    }

    async fn put<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T, ApiError> {
        let request = self.client.put(self.url(path)).json(body);
        self.request(Method::PUT, path, request).await
    }

    // ===== Auth =====

    /// Exchange email and password for a credential. The caller stores it.
    pub async fn login(&self, credentials: &LoginCredentials) -> Result<AuthResponse, ApiError> {
        self.post("/auth/login", credentials).await
    }

    pub async fn register(&self, credentials: &RegisterCredentials) -> Result<AuthResponse, ApiError> {
        self.post("/auth/register", credentials).await
    }

    /// Profile of the account the stored credential belongs to
    pub async fn me(&self) -> Result<User, ApiError> {
        self.get("/auth/me").await
    }

    pub async fn change_password(
        &self,
        credentials: &ChangePasswordCredentials,
    ) -> Result<MessageResponse, ApiError> {
        self.post("/auth/change-password", credentials).await
    }

    // ===== Questions =====

    pub async fn ask(&self, question: &str) -> Result<RagQueryResponse, ApiError> {
        let request = RagQueryRequest {
            question: question.to_string(),
        };
        self.post("/ask", &request).await
    }

    // ===== History =====

    pub async fn history(&self, page: &Page) -> Result<Vec<UserQuery>, ApiError> {
        self.get_with_query("/dashboard/history", page).await
    }

    pub async fn query_detail(&self, query_id: &str) -> Result<UserQuery, ApiError> {
        self.get(&format!("/dashboard/history/{}", query_id)).await
    }

    pub async fn stats(&self) -> Result<UserStats, ApiError> {
        self.get("/dashboard/stats").await
    }

    pub async fn sessions(&self, page: &Page) -> Result<Vec<ChatSessionResponse>, ApiError> {
        self.get_with_query("/dashboard/sessions", page).await
    }

    pub async fn submit_feedback(&self, feedback: &FeedbackRequest) -> Result<MessageResponse, ApiError> {
        self.post("/dashboard/feedback", feedback).await
    }

    pub async fn dashboard(&self) -> Result<Dashboard, ApiError> {
        self.get("/dashboard/").await
    }

    pub async fn usage_chart(&self, range: &DayRange) -> Result<UsageChart, ApiError> {
        self.get_with_query("/dashboard/usage-chart", range).await
    }

    // ===== Admin =====

    pub async fn system_stats(&self) -> Result<SystemStats, ApiError> {
        self.get("/dashboard/admin/system-stats").await
    }

    pub async fn user_analytics(&self, range: &DayRange) -> Result<UserAnalytics, ApiError> {
        self.get_with_query("/dashboard/admin/user-analytics", range).await
    }

    pub async fn list_users(&self, page: &UserListPage) -> Result<Vec<AdminUser>, ApiError> {
        self.get_with_query("/auth/admin/users", page).await
    }

    pub async fn update_user_role(&self, user_id: &str, role: UserRole) -> Result<MessageResponse, ApiError> {
        let path = format!("/auth/admin/users/{}/role", user_id);
        self.put(&path, &RoleUpdate { new_role: role }).await
    }

    pub async fn update_user_status(&self, user_id: &str, is_active: bool) -> Result<MessageResponse, ApiError> {
        let path = format!("/auth/admin/users/{}/status", user_id);
        self.put(&path, &StatusUpdate { is_active }).await
    }
}
