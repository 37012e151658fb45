//! Code-hosting API abstraction layer
//!
//! The scan only needs a handful of read operations from the hosting provider.
//! They are collected behind [`HostingApi`] so the enumeration logic can run
//! against GitHub in production and against scripted data in tests.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Current API quota as reported by the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateStatus {
    /// Requests left in the current window
    pub remaining: u64,

    /// When the window resets
    pub reset_at: DateTime<Utc>,
}

/// A branch as listed on a repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchRef {
    pub name: String,

    /// SHA of the HEAD commit
    pub head_sha: String,
}

/// Read operations consumed from the code-hosting API
///
/// Every method that talks to the provider costs quota, except
/// [`HostingApi::rate_status`].
#[async_trait]
pub trait HostingApi: Send + Sync {
    /// Query remaining quota and reset time
    async fn rate_status(&self) -> Result<RateStatus>;

    /// Organization logins visible to the authenticated user
    async fn list_organizations(&self) -> Result<Vec<String>>;

    /// Repository names owned by `org`
    async fn list_repositories(&self, org: &str) -> Result<Vec<String>>;

    /// Branches of `org/repo`
    async fn list_branches(&self, org: &str, repo: &str) -> Result<Vec<BranchRef>>;

    /// Committer timestamp of the given branch's HEAD commit
    async fn head_commit_time(
        &self,
        org: &str,
        repo: &str,
        branch: &BranchRef,
    ) -> Result<DateTime<Utc>>;

    /// Provider name for display/logging
    fn provider_name(&self) -> &'static str;
}
