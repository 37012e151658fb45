use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use octocrab::Octocrab;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::hosting::{BranchRef, HostingApi, RateStatus};

/// GitHub returns at most this many items per page
const PER_PAGE: u8 = 100;

/// GitHub client wrapper implementing [`HostingApi`]
pub struct GitHubClient {
    client: Octocrab,
}

/// Subset of `GET /repos/{owner}/{repo}/commits/{ref}` needed for staleness
#[derive(Debug, Deserialize)]
struct CommitDetail {
    commit: CommitData,
}

#[derive(Debug, Deserialize)]
struct CommitData {
    committer: Option<GitSignature>,
}

#[derive(Debug, Deserialize)]
struct GitSignature {
    date: Option<DateTime<Utc>>,
}

impl GitHubClient {
    /// Create a new GitHub client authenticated with a personal access token
    pub fn new(token: String) -> Result<Self> {
        let client = Octocrab::builder()
            .personal_token(token)
            .build()
            .context("Failed to create GitHub client")?;

        Ok(Self { client })
    }

    #[cfg(test)]
    fn with_base_uri(token: String, base_uri: &str) -> Result<Self> {
        let client = Octocrab::builder()
            .base_uri(base_uri)
            .with_context(|| format!("Invalid GitHub API base URI: {}", base_uri))?
            .personal_token(token)
            .build()
            .context("Failed to create GitHub client")?;

        Ok(Self { client })
    }

    /// Login of the authenticated user
    pub async fn current_login(&self) -> Result<String> {
        let user = self
            .client
            .current()
            .user()
            .await
            .context("Failed to get current user information. Check your authentication.")?;

        info!("Authenticated as GitHub user: {}", user.login);
        Ok(user.login)
    }
}

#[async_trait]
impl HostingApi for GitHubClient {
    async fn rate_status(&self) -> Result<RateStatus> {
        let rate_limit = self
            .client
            .ratelimit()
            .get()
            .await
            .context("Failed to fetch GitHub rate limit")?;

        let core = rate_limit.resources.core;
        let reset_at = Utc
            .timestamp_opt(core.reset as i64, 0)
            .single()
            .ok_or_else(|| anyhow!("Invalid rate limit reset timestamp: {}", core.reset))?;

        debug!("GitHub core quota: {}/{} remaining", core.remaining, core.limit);

        Ok(RateStatus {
            remaining: core.remaining as u64,
            reset_at,
        })
    }

    async fn list_organizations(&self) -> Result<Vec<String>> {
        debug!("Fetching organizations for authenticated user");

        let mut org_names = Vec::new();
        let mut page = 1u8;

        loop {
            let memberships = self
                .client
                .current()
                .list_org_memberships_for_authenticated_user()
                .per_page(PER_PAGE)
                .page(page)
                .send()
                .await
                .with_context(|| format!("Failed to fetch user organizations page {}", page))?;

            let last_page = memberships.next.is_none();
            org_names.extend(memberships.items.into_iter().map(|m| m.organization.login));

            if last_page {
                break;
            }
            // GitHub API pagination limit for u8
            if page >= 255 {
                warn!("Reached maximum pagination limit (255 pages) for organizations");
                break;
            }
            page += 1;
        }

        info!("Found {} organizations: {:?}", org_names.len(), org_names);
        Ok(org_names)
    }

    async fn list_repositories(&self, org: &str) -> Result<Vec<String>> {
        debug!("Fetching repositories for organization: {}", org);

        let mut repositories = Vec::new();
        let mut page = 1u8;

        loop {
            let page_repos = self
                .client
                .orgs(org)
                .list_repos()
                .per_page(PER_PAGE)
                .page(page)
                .send()
                .await
                .with_context(|| {
                    format!("Failed to fetch repositories for organization {} page {}", org, page)
                })?;

            let last_page = page_repos.next.is_none();
            repositories.extend(page_repos.items.into_iter().map(|repo| repo.name));

            if last_page {
                break;
            }
            if page >= 255 {
                warn!("Reached maximum pagination limit (255 pages) for org: {}", org);
                break;
            }
            page += 1;
        }

        debug!("Found {} repositories for organization: {}", repositories.len(), org);
        Ok(repositories)
    }

    async fn list_branches(&self, org: &str, repo: &str) -> Result<Vec<BranchRef>> {
        debug!("Fetching branches for {}/{}", org, repo);

        let mut branches = Vec::new();
        let mut page = 1u8;

        loop {
            let page_branches = self
                .client
                .repos(org, repo)
                .list_branches()
                .per_page(PER_PAGE)
                .page(page)
                .send()
                .await
                .with_context(|| format!("Failed to fetch branches for {}/{} page {}", org, repo, page))?;

            let last_page = page_branches.next.is_none();
            branches.extend(page_branches.items.into_iter().map(|branch| BranchRef {
                name: branch.name,
                head_sha: branch.commit.sha,
            }));

            if last_page {
                break;
            }
            if page >= 255 {
                warn!("Reached maximum pagination limit (255 pages) for {}/{}", org, repo);
                break;
            }
            page += 1;
        }

        Ok(branches)
    }

    async fn head_commit_time(
        &self,
        org: &str,
        repo: &str,
        branch: &BranchRef,
    ) -> Result<DateTime<Utc>> {
        let route = format!("/repos/{}/{}/commits/{}", org, repo, branch.head_sha);
        let detail: CommitDetail = self
            .client
            .get(route, None::<&()>)
            .await
            .with_context(|| format!("Failed to fetch HEAD commit of {}/{}@{}", org, repo, branch.name))?;

        committer_date(detail)
            .ok_or_else(|| anyhow!("HEAD commit of {}/{}@{} has no committer date", org, repo, branch.name))
    }

    fn provider_name(&self) -> &'static str {
        "GitHub"
    }
}

fn committer_date(detail: CommitDetail) -> Option<DateTime<Utc>> {
    detail.commit.committer.and_then(|committer| committer.date)
}
