//! Common test utilities and fakes for BranchSentry tests
#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use branchsentry::notify::{DeliveryError, Notifier};
use branchsentry::{BranchRef, Clock, HostingApi, RateStatus, Report};
use chrono::{DateTime, TimeZone, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

/// Fixed "now" used across scenarios: Wednesday, July 02, 2025 15:58 UTC
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 7, 2, 15, 58, 0).unwrap()
}

/// Clock whose time only moves when the code under test sleeps
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
    sleeps: Mutex<Vec<Duration>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
            sleeps: Mutex::new(Vec::new()),
        }
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }

    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
        let mut now = self.now.lock().unwrap();
        *now = *now + chrono::Duration::from_std(duration).unwrap();
    }
}

/// Scripted hosting API
///
/// Entities are registered with the builder methods; anything marked as
/// failing returns an error when listed. Every call is recorded in order.
#[derive(Default)]
pub struct FakeHosting {
    orgs: Vec<String>,
    fail_org_listing: bool,
    repos: HashMap<String, Vec<String>>,
    failing_repo_listings: Vec<String>,
    branches: HashMap<(String, String), Vec<String>>,
    failing_branch_listings: Vec<(String, String)>,
    commits: HashMap<(String, String, String), DateTime<Utc>>,
    rate_statuses: Mutex<VecDeque<Result<RateStatus, String>>>,
    calls: Mutex<Vec<String>>,
}

impl FakeHosting {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn org(mut self, org: &str) -> Self {
        self.orgs.push(org.to_string());
        self.repos.entry(org.to_string()).or_default();
        self
    }

    pub fn repo(mut self, org: &str, repo: &str, branches: &[&str]) -> Self {
        if !self.orgs.iter().any(|o| o == org) {
            self = self.org(org);
        }
        self.repos
            .entry(org.to_string())
            .or_default()
            .push(repo.to_string());
        self.branches.insert(
            (org.to_string(), repo.to_string()),
            branches.iter().map(|b| b.to_string()).collect(),
        );
        self
    }

    pub fn commit(mut self, org: &str, repo: &str, branch: &str, at: DateTime<Utc>) -> Self {
        self.commits
            .insert((org.to_string(), repo.to_string(), branch.to_string()), at);
        self
    }

    pub fn failing_org_listing(mut self) -> Self {
        self.fail_org_listing = true;
        self
    }

    pub fn failing_repo_listing(mut self, org: &str) -> Self {
        self.failing_repo_listings.push(org.to_string());
        self
    }

    pub fn failing_branch_listing(mut self, org: &str, repo: &str) -> Self {
        self.failing_branch_listings
            .push((org.to_string(), repo.to_string()));
        self
    }

    /// Queue rate statuses returned by successive `rate_status` calls
    pub fn rate_statuses(self, statuses: Vec<Result<RateStatus, String>>) -> Self {
        self.rate_statuses.lock().unwrap().extend(statuses);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_starting_with(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl HostingApi for FakeHosting {
    async fn rate_status(&self) -> Result<RateStatus> {
        self.record("rate_status".to_string());
        match self.rate_statuses.lock().unwrap().pop_front() {
            Some(Ok(status)) => Ok(status),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Ok(RateStatus {
                remaining: 5000,
                reset_at: base_time() + chrono::Duration::hours(1),
            }),
        }
    }

    async fn list_organizations(&self) -> Result<Vec<String>> {
        self.record("list_organizations".to_string());
        if self.fail_org_listing {
            return Err(anyhow!("401 Bad credentials"));
        }
        Ok(self.orgs.clone())
    }

    async fn list_repositories(&self, org: &str) -> Result<Vec<String>> {
        self.record(format!("list_repositories {}", org));
        if self.failing_repo_listings.iter().any(|o| o == org) {
            return Err(anyhow!("403 Forbidden"));
        }
        Ok(self.repos.get(org).cloned().unwrap_or_default())
    }

    async fn list_branches(&self, org: &str, repo: &str) -> Result<Vec<BranchRef>> {
        self.record(format!("list_branches {}/{}", org, repo));
        let key = (org.to_string(), repo.to_string());
        if self.failing_branch_listings.contains(&key) {
            return Err(anyhow!("502 Bad Gateway"));
        }
        Ok(self
            .branches
            .get(&key)
            .map(|names| {
                names
                    .iter()
                    .map(|name| BranchRef {
                        name: name.clone(),
                        head_sha: format!("sha-{}", name),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn head_commit_time(
        &self,
        org: &str,
        repo: &str,
        branch: &BranchRef,
    ) -> Result<DateTime<Utc>> {
        self.record(format!("head_commit_time {}/{}@{}", org, repo, branch.name));
        self.commits
            .get(&(org.to_string(), repo.to_string(), branch.name.clone()))
            .copied()
            .ok_or_else(|| anyhow!("404 No commit found for SHA: {}", branch.head_sha))
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }
}

/// Notifier that keeps every report it is asked to send
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Report>>,
    reject: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            reject: true,
        }
    }

    pub fn sent(&self) -> Vec<Report> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, report: &Report) -> Result<(), DeliveryError> {
        if self.reject {
            return Err(DeliveryError::Rejected {
                status: 403,
                body: "Email address is not verified".to_string(),
            });
        }
        self.sent.lock().unwrap().push(report.clone());
        Ok(())
    }
}

/// Assertion helpers for test validation
pub fn assert_contains_all(text: &str, expected: &[&str]) {
    for item in expected {
        assert!(
            text.contains(item),
            "Expected text to contain '{}', but it didn't. Text: {}",
            item,
            text
        );
    }
}
