//! Branch enumeration - walks organizations, repositories and branches
//!
//! The scan is best-effort: a failure on one organization, repository or
//! branch is recorded as a [`Skip`] and the walk continues with the next
//! sibling. Only the initial organization listing is fatal.

use anyhow::{Context, Result};
use regex::Regex;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::Config;
use crate::hosting::{BranchRef, HostingApi};
use crate::rate_limit::RateLimiter;
use crate::staleness::StalenessClassifier;

/// One non-primary branch found during the scan
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct BranchRecord {
    pub organization: String,
    pub repository: String,
    pub branch: String,
    /// `None` when staleness was not computed
    pub is_stale: Option<bool>,
}

/// Level of the hierarchy at which an entity was skipped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityLevel {
    Organization,
    Repository,
    Branch,
}

/// An entity dropped from the scan and why
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skip {
    pub level: EntityLevel,
    pub organization: String,
    pub repository: Option<String>,
    pub branch: Option<String>,
    pub reason: String,
}

impl Skip {
    fn organization(org: &str, error: &anyhow::Error) -> Self {
        Self {
            level: EntityLevel::Organization,
            organization: org.to_string(),
            repository: None,
            branch: None,
            reason: format!("{:#}", error),
        }
    }

    fn repository(org: &str, repo: &str, error: &anyhow::Error) -> Self {
        Self {
            level: EntityLevel::Repository,
            organization: org.to_string(),
            repository: Some(repo.to_string()),
            branch: None,
            reason: format!("{:#}", error),
        }
    }

    fn branch(org: &str, repo: &str, branch: &str, error: &anyhow::Error) -> Self {
        Self {
            level: EntityLevel::Branch,
            organization: org.to_string(),
            repository: Some(repo.to_string()),
            branch: Some(branch.to_string()),
            reason: format!("{:#}", error),
        }
    }
}

impl fmt::Display for Skip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.repository, &self.branch) {
            (Some(repo), Some(branch)) => write!(
                f,
                "branch {} in {}/{}: {}",
                branch, self.organization, repo, self.reason
            ),
            (Some(repo), None) => {
                write!(f, "repository {}/{}: {}", self.organization, repo, self.reason)
            }
            _ => write!(f, "organization {}: {}", self.organization, self.reason),
        }
    }
}

/// Results from a complete scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Sorted by (organization, repository, branch)
    pub records: Vec<BranchRecord>,
    /// Repositories visited, with or without branch records
    pub repo_count: usize,
    pub skipped: Vec<Skip>,
}

impl ScanSummary {
    /// Skips recorded at `level`
    pub fn skipped_at(&self, level: EntityLevel) -> impl Iterator<Item = &Skip> {
        self.skipped.iter().filter(move |skip| skip.level == level)
    }
}

/// Walks every organization-owned repository looking for non-primary branches
pub struct BranchEnumerator {
    api: Arc<dyn HostingApi>,
    limiter: RateLimiter,
    clock: Arc<dyn Clock>,
    classifier: Option<StalenessClassifier>,
    primary_branch: String,
    exclude_patterns: Vec<Regex>,
}

impl BranchEnumerator {
    pub fn new(api: Arc<dyn HostingApi>, limiter: RateLimiter, clock: Arc<dyn Clock>) -> Self {
        Self {
            api,
            limiter,
            clock,
            classifier: None,
            primary_branch: "main".to_string(),
            exclude_patterns: Vec::new(),
        }
    }

    /// Build an enumerator from the scan, report and rate limit settings
    pub fn from_config(
        api: Arc<dyn HostingApi>,
        clock: Arc<dyn Clock>,
        config: &Config,
    ) -> Result<Self> {
        let limiter = RateLimiter::from_config(clock.clone(), &config.rate_limit);
        let mut enumerator = Self::new(api, limiter, clock)
            .with_primary_branch(&config.scan.primary_branch)
            .with_exclude_patterns(&config.scan.exclude_repos)?;

        if config.report.check_staleness {
            enumerator = enumerator.with_staleness(StalenessClassifier::new(config.stale_after()?));
        }

        Ok(enumerator)
    }

    /// Fetch each branch's HEAD commit and classify it
    pub fn with_staleness(mut self, classifier: StalenessClassifier) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn with_primary_branch(mut self, name: &str) -> Self {
        self.primary_branch = name.to_string();
        self
    }

    /// Skip repositories whose name matches one of the glob patterns (`*` wildcard)
    pub fn with_exclude_patterns(mut self, patterns: &[String]) -> Result<Self> {
        self.exclude_patterns = patterns
            .iter()
            .map(|pattern| glob_to_regex(pattern))
            .collect::<Result<_>>()?;
        Ok(self)
    }

    /// Run the scan
    pub async fn enumerate(&self) -> Result<ScanSummary> {
        let api = self.api.as_ref();
        let mut summary = ScanSummary::default();

        self.limiter.ensure_capacity(api).await?;
        info!("Fetching organizations from {}", api.provider_name());
        let organizations = api
            .list_organizations()
            .await
            .context("Failed to fetch organizations")?;

        for org in &organizations {
            if let Err(e) = self.scan_organization(org, &mut summary).await {
                warn!("Error processing organization {}: {:#}", org, e);
                summary.skipped.push(Skip::organization(org, &e));
            }
        }

        summary.records.sort();

        info!(
            "Scan completed: {} organizations, {} repositories, {} branches, {} skipped",
            organizations.len(),
            summary.repo_count,
            summary.records.len(),
            summary.skipped.len()
        );

        Ok(summary)
    }

    async fn scan_organization(&self, org: &str, summary: &mut ScanSummary) -> Result<()> {
        self.limiter.ensure_capacity(self.api.as_ref()).await?;
        info!("Processing organization: {}", org);

        let repositories = self.api.list_repositories(org).await?;

        for repo in &repositories {
            if self.is_excluded(repo) {
                debug!("Excluding repository due to pattern match: {}/{}", org, repo);
                continue;
            }

            if let Err(e) = self.scan_repository(org, repo, summary).await {
                warn!("Error processing repo {} in {}: {:#}", repo, org, e);
                summary.skipped.push(Skip::repository(org, repo, &e));
            }
        }

        Ok(())
    }

    async fn scan_repository(&self, org: &str, repo: &str, summary: &mut ScanSummary) -> Result<()> {
        self.limiter.ensure_capacity(self.api.as_ref()).await?;
        info!("Processing repo: {} in {}", repo, org);
        summary.repo_count += 1;

        let branches = self.api.list_branches(org, repo).await?;
        let mut seen = HashSet::new();

        for branch in &branches {
            if branch.name == self.primary_branch || !seen.insert(branch.name.as_str()) {
                continue;
            }

            match self.branch_record(org, repo, branch).await {
                Ok(record) => summary.records.push(record),
                Err(e) => {
                    warn!("Error processing branch {} in repo {}/{}: {:#}", branch.name, org, repo, e);
                    summary.skipped.push(Skip::branch(org, repo, &branch.name, &e));
                }
            }
        }

        Ok(())
    }

    async fn branch_record(&self, org: &str, repo: &str, branch: &BranchRef) -> Result<BranchRecord> {
        let is_stale = match &self.classifier {
            Some(classifier) => {
                self.limiter.ensure_capacity(self.api.as_ref()).await?;
                let committed_at = self.api.head_commit_time(org, repo, branch).await?;
                Some(classifier.is_stale(committed_at, self.clock.now()))
            }
            None => None,
        };

        Ok(BranchRecord {
            organization: org.to_string(),
            repository: repo.to_string(),
            branch: branch.name.clone(),
            is_stale,
        })
    }

    fn is_excluded(&self, repo: &str) -> bool {
        self.exclude_patterns.iter().any(|re| re.is_match(repo))
    }
}

/// Compile a simple `*` glob into an anchored regex
fn glob_to_regex(pattern: &str) -> Result<Regex> {
    let escaped = regex::escape(pattern).replace(r"\*", ".*");
    Regex::new(&format!("^{}$", escaped))
        .with_context(|| format!("Invalid repository exclusion pattern: {}", pattern))
}
