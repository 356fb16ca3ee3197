use thiserror::Error;

use crate::auth::TokenError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The stored credential was expired or malformed; the request was not sent.
    #[error("Token expired or invalid - sign in again")]
    SessionLost,

    #[error(transparent)]
    Credential(#[from] TokenError),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// The backend's human-readable reason, from a `detail` or `message` field.
    fn server_detail(body: &str) -> Option<String> {
        let value: serde_json::Value = serde_json::from_str(body).ok()?;
        ["detail", "message"]
            .iter()
            .find_map(|key| value.get(key)?.as_str().map(str::to_string))
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let reason = Self::server_detail(body).unwrap_or_else(|| Self::truncate_body(body));
        match status.as_u16() {
            401 => ApiError::Unauthorized(reason),
            403 => ApiError::AccessDenied(reason),
            404 => ApiError::NotFound(reason),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(reason),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, reason)),
        }
    }

    /// Whether this error means the caller is no longer signed in.
    pub fn is_session_end(&self) -> bool {
        matches!(self, ApiError::Unauthorized(_) | ApiError::SessionLost)
    }
}
