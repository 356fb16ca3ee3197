//! Administrator views: system statistics and account management.
//!
//! Non-admin callers get 404 from these endpoints.

use serde::{Deserialize, Serialize};

use super::user::UserRole;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(default)]
pub struct SystemStats {
    pub total_users: u64,
    pub active_users: u64,
    pub total_queries: u64,
    pub queries_today: u64,
    pub avg_response_time_ms: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(default)]
pub struct UserAnalytics {
    pub period_days: u32,
    pub new_users: u64,
    pub active_users: u64,
    pub role_distribution: RoleCounts,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(default)]
pub struct RoleCounts {
    pub free: u64,
    pub premium: u64,
    pub admin: u64,
}

/// An account as listed to administrators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct AdminUser {
    pub id: String,
    pub email: String,
    pub username: String,
    pub full_name: String,
    pub role: UserRole,
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub last_login: Option<String>,
    #[serde(default)]
    pub total_queries: u64,
}

/// Paging for the account list, which counts from `skip`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UserListPage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub(crate) struct RoleUpdate {
    pub new_role: UserRole,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub(crate) struct StatusUpdate {
    pub is_active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_admin_user() {
        let json = r#"{"id":"u-9","email":"k@b.tr","username":"kb","full_name":"Kemal Bal","role":"admin","is_active":false}"#;
        let user: AdminUser = serde_json::from_str(json).unwrap();
        assert_eq!(user.role, UserRole::Admin);
        assert!(!user.is_active);
        assert_eq!(user.total_queries, 0);
    }

    #[test]
    fn test_update_bodies() {
        assert_eq!(
            serde_json::to_string(&RoleUpdate { new_role: UserRole::Premium }).unwrap(),
            r#"{"new_role":"premium"}"#
        );
        assert_eq!(
            serde_json::to_string(&StatusUpdate { is_active: true }).unwrap(),
            r#"{"is_active":true}"#
        );
    }
}
