//! Wire types exchanged with the legal-assistant backend.
//!
//! With the `ts` feature enabled these also derive TypeScript bindings for
//! the browser client.

pub mod admin;
pub mod history;
pub mod query;
pub mod user;

pub use admin::{AdminUser, RoleCounts, SystemStats, UserAnalytics, UserListPage};
pub use history::{
    ChatSessionResponse, Dashboard, DayRange, FeedbackRequest, Page, UsageChart, UsagePoint,
    UsageSummary, UserQuery, UserStats,
};
pub use query::{QuerySource, RagQueryRequest, RagQueryResponse, SourceCounts, SourceKind};
pub use user::{
    AuthResponse, ChangePasswordCredentials, LoginCredentials, MessageResponse,
    RegisterCredentials, User, UserRole,
};
