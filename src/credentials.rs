use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::Config;

/// Credentials resolved for a run
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    /// Personal access token for the hosting API
    pub github_token: String,

    /// API key for the mail service, when stored alongside the token
    #[serde(default)]
    pub mail_api_key: Option<String>,
}

/// Source of API credentials
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Fetch the credentials stored under `secret_name`
    async fn fetch(&self, secret_name: &str) -> Result<Credentials>;
}

/// GitHub authentication strategies
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthStrategy {
    /// Named JSON secret from the environment or the secrets directory
    SecretStore { secrets_dir: PathBuf },
    /// Use GitHub CLI authentication
    GitHubCLI,
    /// Use environment variable token
    EnvironmentToken,
}

impl AuthStrategy {
    pub fn from_config(config: &Config) -> Result<Self> {
        match config.github.auth_method.as_str() {
            "secret" => Ok(Self::SecretStore {
                secrets_dir: PathBuf::from(&config.github.secrets_dir),
            }),
            "gh_cli" => Ok(Self::GitHubCLI),
            "token" => Ok(Self::EnvironmentToken),
            other => Err(anyhow!("Unknown auth method: {}", other)),
        }
    }

    /// Whether this strategy needs a secret name to resolve
    pub fn requires_secret_name(&self) -> bool {
        matches!(self, Self::SecretStore { .. })
    }
}

/// Credential provider driven by an [`AuthStrategy`]
#[derive(Debug, Clone)]
pub struct SecretStore {
    strategy: AuthStrategy,
}

impl SecretStore {
    pub fn new(strategy: AuthStrategy) -> Self {
        Self { strategy }
    }

    /// Look up a named secret document: env var first, then `<dir>/<name>.json`
    fn read_secret_document(secrets_dir: &Path, secret_name: &str) -> Result<Credentials> {
        validate_secret_name(secret_name)?;

        let raw = match env::var(secret_name) {
            Ok(value) if !value.trim().is_empty() => {
                debug!("Reading secret {} from environment", secret_name);
                value
            }
            _ => {
                let path = secrets_dir.join(format!("{}.json", secret_name));
                debug!("Reading secret {} from {:?}", secret_name, path);
                std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read secret {} at {:?}", secret_name, path))?
            }
        };

        parse_secret_document(&raw)
            .with_context(|| format!("Secret {} is not a valid credential document", secret_name))
    }

    /// Try to get token from GitHub CLI
    async fn try_github_cli() -> Result<String> {
        debug!("Attempting GitHub CLI authentication");

        let token_output = Command::new("gh")
            .args(["auth", "token"])
            .output()
            .await
            .context("Failed to run GitHub CLI (gh). Is it installed?")?;

        if !token_output.status.success() {
            return Err(anyhow!(
                "Failed to retrieve token from GitHub CLI: {}",
                String::from_utf8_lossy(&token_output.stderr)
            ));
        }

        let token = String::from_utf8(token_output.stdout)
            .context("GitHub CLI token is not valid UTF-8")?
            .trim()
            .to_string();

        if token.is_empty() {
            return Err(anyhow!("GitHub CLI returned empty token"));
        }

        Ok(token)
    }

    /// Try to get token from environment variable
    fn try_environment_token() -> Result<String> {
        debug!("Attempting environment variable authentication");

        let token = env::var("GITHUB_TOKEN").context("GITHUB_TOKEN environment variable not set")?;
        if token.is_empty() {
            return Err(anyhow!("GITHUB_TOKEN is empty"));
        }
        Ok(token)
    }
}

#[async_trait]
impl CredentialProvider for SecretStore {
    async fn fetch(&self, secret_name: &str) -> Result<Credentials> {
        info!("Using authentication strategy: {:?}", self.strategy);

        let credentials = match &self.strategy {
            AuthStrategy::SecretStore { secrets_dir } => {
                Self::read_secret_document(secrets_dir, secret_name)?
            }
            AuthStrategy::GitHubCLI => Credentials {
                github_token: Self::try_github_cli()
                    .await
                    .context("GitHub CLI authentication failed. Run: gh auth login")?,
                mail_api_key: None,
            },
            AuthStrategy::EnvironmentToken => Credentials {
                github_token: Self::try_environment_token()?,
                mail_api_key: None,
            },
        };

        check_token_shape(&credentials.github_token);
        Ok(credentials)
    }
}

/// Secret names are plain identifiers; anything else is a configuration mistake
pub fn validate_secret_name(name: &str) -> Result<()> {
    anyhow::ensure!(!name.trim().is_empty(), "secret name must not be empty");
    anyhow::ensure!(
        name.chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-' | '.' | '/')),
        "secret name {:?} must contain only A-Z, a-z, 0-9, '_', '-', '.' or '/'",
        name
    );
    anyhow::ensure!(!name.contains(".."), "secret name {:?} must not contain '..'", name);
    // Secret names resolve inside secrets_dir
    anyhow::ensure!(
        name.split('/').all(|segment| !segment.is_empty()),
        "secret name {:?} must be a relative path without empty segments",
        name
    );
    Ok(())
}

/// Parse `{"github_token": "...", "mail_api_key": "..."}`
pub fn parse_secret_document(raw: &str) -> Result<Credentials> {
    let credentials: Credentials =
        serde_json::from_str(raw).context("Failed to parse secret JSON")?;

    if credentials.github_token.trim().is_empty() {
        return Err(anyhow!("github_token is empty"));
    }

    Ok(credentials)
}

fn check_token_shape(token: &str) {
    const PREFIXES: [&str; 4] = ["ghp_", "gho_", "ghs_", "github_pat_"];
    if !PREFIXES.iter().any(|prefix| token.starts_with(prefix)) {
        warn!("GitHub token doesn't look like a valid GitHub token (expected ghp_, gho_, ghs_ or github_pat_ prefix)");
    }
}
