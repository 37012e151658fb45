//! The scheduled reporting job
//!
//! credentials -> scan -> render -> deliver. Any failure that escapes the
//! scan's per-entity isolation aborts the run before an email is sent.

use anyhow::{Context, Result};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::{Config, MAIL_API_KEY_ENV};
use crate::credentials::{AuthStrategy, CredentialProvider, Credentials, SecretStore};
use crate::github::GitHubClient;
use crate::hosting::HostingApi;
use crate::notify::{HttpMailer, Notifier, StdoutNotifier};
use crate::report::{RenderContext, Report};
use crate::scan::{BranchEnumerator, ScanSummary};

/// Where the rendered report goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Send through the mail API
    Email,
    /// Print to stdout
    Preview,
}

/// Final status of a run, printed as `{"statusCode": .., "body": ..}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunOutcome {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: String,
}

impl RunOutcome {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status_code: 200,
            body: message.into(),
        }
    }

    pub fn failure(error: &anyhow::Error) -> Self {
        Self {
            status_code: 500,
            body: format!("Error: {:#}", error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status_code == 200
    }

    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            0
        } else {
            1
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| self.body.clone())
    }
}

/// Collaborators for one run
pub struct Pipeline {
    pub hosting: Arc<dyn HostingApi>,
    pub notifier: Arc<dyn Notifier>,
    pub clock: Arc<dyn Clock>,
}

/// Result of a successful run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub scan: ScanSummary,
    pub report: Report,
}

/// Scan, render and deliver exactly one report
pub async fn execute(config: &Config, pipeline: &Pipeline) -> Result<RunSummary> {
    let enumerator =
        BranchEnumerator::from_config(pipeline.hosting.clone(), pipeline.clock.clone(), config)?;
    let scan = enumerator.enumerate().await?;

    for skip in &scan.skipped {
        warn!("Skipped {}", skip);
    }

    let ctx = RenderContext::new(&config.scan.primary_branch, pipeline.clock.now());
    let report = config
        .report
        .format
        .renderer()
        .render(&scan.records, scan.repo_count, &ctx);

    pipeline
        .notifier
        .send(&report)
        .await
        .context("Failed to deliver report")?;

    Ok(RunSummary { scan, report })
}

/// Resolve credentials, failing before any hosting API call is made
pub async fn resolve_credentials(
    config: &Config,
    strategy: &AuthStrategy,
    provider: &dyn CredentialProvider,
) -> Result<Credentials> {
    let secret_name = if strategy.requires_secret_name() {
        config.secret_name()?
    } else {
        config.github.secret_name.as_deref().unwrap_or_default()
    };

    provider
        .fetch(secret_name)
        .await
        .with_context(|| format!("Error retrieving secret {:?}", secret_name))
}

/// Build the production notifier for `delivery`
fn notifier_for(
    config: &Config,
    credentials: &Credentials,
    delivery: Delivery,
) -> Result<Arc<dyn Notifier>> {
    match delivery {
        Delivery::Preview => Ok(Arc::new(StdoutNotifier)),
        Delivery::Email => {
            let api_key = credentials
                .mail_api_key
                .clone()
                .or_else(|| std::env::var(MAIL_API_KEY_ENV).ok())
                .context("No mail_api_key in secret and MAIL_API_KEY not set; cannot send email")?;
            Ok(Arc::new(HttpMailer::new(
                config.mail.endpoint.clone(),
                api_key,
                config.sender()?,
                config.recipient()?,
            )))
        }
    }
}

/// Entry point used by the CLI: run against GitHub and map the result to an outcome
pub async fn run(config: &Config, delivery: Delivery) -> RunOutcome {
    let started = Instant::now();

    match run_inner(config, delivery).await {
        Ok(summary) => {
            info!(
                "Run completed in {:.2}s: {} branches across {} repositories",
                started.elapsed().as_secs_f64(),
                summary.scan.records.len(),
                summary.scan.repo_count
            );
            match delivery {
                Delivery::Email => RunOutcome::success("Successfully processed and sent email"),
                Delivery::Preview => RunOutcome::success("Successfully processed report preview"),
            }
        }
        Err(e) => {
            error!("Run failed: {:#}", e);
            RunOutcome::failure(&e)
        }
    }
}

async fn run_inner(config: &Config, delivery: Delivery) -> Result<RunSummary> {
    if delivery == Delivery::Email {
        // fail on missing addresses before spending any API quota
        config.sender()?;
        config.recipient()?;
    }

    let strategy = AuthStrategy::from_config(config)?;
    let store = SecretStore::new(strategy.clone());
    let credentials = resolve_credentials(config, &strategy, &store).await?;

    let pipeline = Pipeline {
        hosting: Arc::new(GitHubClient::new(credentials.github_token.clone())?),
        notifier: notifier_for(config, &credentials, delivery)?,
        clock: Arc::new(SystemClock),
    };

    execute(config, &pipeline).await
}
