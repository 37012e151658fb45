//! Preflight checks for BranchSentry
//!
//! `branchsentry doctor` verifies configuration, credentials and GitHub access
//! without spending more than a couple of API calls.

use crate::config::{Config, MAIL_API_KEY_ENV};
use crate::credentials::{AuthStrategy, Credentials, SecretStore};
use crate::github::GitHubClient;
use crate::hosting::HostingApi;
use crate::job::resolve_credentials;

/// Result of system health checks
#[derive(Debug, Clone)]
pub struct HealthCheck {
    /// Sender, recipient and secret name are present
    pub config: CheckResult,
    /// Secret retrieval status
    pub credentials: CheckResult,
    /// GitHub authentication and quota
    pub github_auth: CheckResult,
    /// Mail API key availability (warning only)
    pub mail_key: CheckResult,
}

/// Result of an individual health check
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub passed: bool,
    pub message: String,
    pub details: Option<String>,
    pub is_warning: bool,
}

impl CheckResult {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            passed: true,
            message: message.into(),
            details: None,
            is_warning: false,
        }
    }

    fn ok_with_details(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            passed: true,
            message: message.into(),
            details: Some(details.into()),
            is_warning: false,
        }
    }

    fn error_with_details(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            passed: false,
            message: message.into(),
            details: Some(details.into()),
            is_warning: false,
        }
    }

    fn warning_with_details(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            passed: true,
            message: message.into(),
            details: Some(details.into()),
            is_warning: true,
        }
    }
}

impl HealthCheck {
    /// Run all health checks
    pub async fn run(config: &Config) -> Self {
        let config_check = Self::check_config(config);

        let credentials = match AuthStrategy::from_config(config) {
            Ok(strategy) => {
                resolve_credentials(config, &strategy, &SecretStore::new(strategy.clone())).await
            }
            Err(e) => Err(e),
        };

        let (credentials_check, github_auth, mail_key) = match credentials {
            Ok(creds) => (
                CheckResult::ok("Credentials retrieved"),
                Self::check_github_auth(&creds).await,
                Self::check_mail_key(&creds),
            ),
            Err(e) => (
                CheckResult::error_with_details("Credential retrieval failed", format!("{:#}", e)),
                CheckResult::error_with_details(
                    "GitHub authentication not attempted",
                    "Fix credential retrieval first",
                ),
                CheckResult::warning_with_details(
                    "Mail API key unknown",
                    "Fix credential retrieval first",
                ),
            ),
        };

        Self {
            config: config_check,
            credentials: credentials_check,
            github_auth,
            mail_key,
        }
    }

    /// Check if all required checks passed (excludes warnings)
    pub fn all_passed(&self) -> bool {
        self.config.passed && self.credentials.passed && self.github_auth.passed
    }

    /// Get list of failed checks (errors only, not warnings)
    pub fn errors(&self) -> Vec<&CheckResult> {
        self.all_checks()
            .into_iter()
            .map(|(_, result)| result)
            .filter(|r| !r.passed && !r.is_warning)
            .collect()
    }

    /// Get list of warnings
    pub fn warnings(&self) -> Vec<&CheckResult> {
        self.all_checks()
            .into_iter()
            .map(|(_, result)| result)
            .filter(|r| r.is_warning)
            .collect()
    }

    /// Check required run settings
    fn check_config(config: &Config) -> CheckResult {
        let needs_secret = AuthStrategy::from_config(config)
            .map(|strategy| strategy.requires_secret_name())
            .unwrap_or(true);

        let mut missing = Vec::new();
        if let Err(e) = config.sender() {
            missing.push(e.to_string());
        }
        if let Err(e) = config.recipient() {
            missing.push(e.to_string());
        }
        if needs_secret {
            if let Err(e) = config.secret_name() {
                missing.push(e.to_string());
            }
        }

        if missing.is_empty() {
            CheckResult::ok_with_details(
                "Configuration complete",
                format!(
                    "Format: {:?}, staleness: {}, primary branch: {}",
                    config.report.format, config.report.check_staleness, config.scan.primary_branch
                ),
            )
        } else {
            CheckResult::error_with_details("Configuration incomplete", missing.join("\n"))
        }
    }

    /// Check GitHub authentication and current quota
    async fn check_github_auth(credentials: &Credentials) -> CheckResult {
        let client = match GitHubClient::new(credentials.github_token.clone()) {
            Ok(client) => client,
            Err(e) => {
                return CheckResult::error_with_details("GitHub client setup failed", format!("{:#}", e))
            }
        };

        match (client.current_login().await, client.rate_status().await) {
            (Ok(login), Ok(rate)) => CheckResult::ok_with_details(
                "GitHub authentication successful",
                format!(
                    "Username: {}\nQuota: {} remaining, resets at {}",
                    login, rate.remaining, rate.reset_at
                ),
            ),
            (Err(e), _) | (_, Err(e)) => {
                CheckResult::error_with_details("GitHub authentication failed", format!("{:#}", e))
            }
        }
    }

    fn check_mail_key(credentials: &Credentials) -> CheckResult {
        if credentials.mail_api_key.is_some() {
            CheckResult::ok("Mail API key found in secret")
        } else if std::env::var(MAIL_API_KEY_ENV).is_ok() {
            CheckResult::ok_with_details("Mail API key found", format!("From {}", MAIL_API_KEY_ENV))
        } else {
            CheckResult::warning_with_details(
                "No mail API key",
                format!(
                    "Add mail_api_key to the secret or set {}; only `preview` will work",
                    MAIL_API_KEY_ENV
                ),
            )
        }
    }

    /// Get all checks as a slice for iteration
    pub fn all_checks(&self) -> [(&'static str, &CheckResult); 4] {
        [
            ("Configuration", &self.config),
            ("Credentials", &self.credentials),
            ("GitHub Authentication", &self.github_auth),
            ("Mail Delivery", &self.mail_key),
        ]
    }
}
