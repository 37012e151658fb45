//! BranchSentry - Daily report of non-primary branches across GitHub organizations
//!
//! BranchSentry walks every repository owned by the organizations of the
//! authenticated user, collects branches other than the primary branch,
//! optionally flags the ones whose HEAD commit is older than a threshold, and
//! mails the result as a single report.
//!
//! ## Core Features
//!
//! - **Quota-aware scanning**: Proactive backoff before the GitHub rate limit is hit
//! - **Best-effort enumeration**: Failing organizations, repositories and branches are skipped, not fatal
//! - **Staleness classification**: Optional HEAD commit age check per branch
//! - **Pluggable rendering**: Hierarchical, tabular or flat reports
//!
//! ## Modules
//!
//! - [`config`]: Configuration management and parsing
//! - [`scan`]: Organization / repository / branch enumeration
//! - [`report`]: Report renderers
//! - [`job`]: The end-to-end scheduled run

pub mod clock;
pub mod config;
pub mod credentials;
pub mod github;
pub mod health;
pub mod hosting;
pub mod job;
pub mod notify;
pub mod rate_limit;
pub mod report;
pub mod scan;
pub mod staleness;

pub use clock::{Clock, SystemClock};
pub use config::Config;
pub use github::GitHubClient;
pub use health::HealthCheck;
pub use hosting::{BranchRef, HostingApi, RateStatus};
pub use job::{Delivery, Pipeline, RunOutcome};
pub use notify::{DeliveryError, Notifier};
pub use rate_limit::RateLimiter;
pub use report::{Report, ReportFormat, ReportRenderer};
pub use scan::{BranchEnumerator, BranchRecord, ScanSummary, Skip};
pub use staleness::StalenessClassifier;
