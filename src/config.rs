use anyhow::{anyhow, Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::report::ReportFormat;

/// Main configuration structure for BranchSentry
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    /// GitHub authentication settings
    #[serde(default)]
    pub github: GitHubConfig,

    /// Email delivery settings
    #[serde(default)]
    pub mail: MailConfig,

    /// Enumeration behavior
    #[serde(default)]
    pub scan: ScanConfig,

    /// Report rendering
    #[serde(default)]
    pub report: ReportConfig,

    /// Quota backoff settings
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

/// GitHub configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GitHubConfig {
    /// Authentication method
    #[serde(default = "default_auth_method")]
    pub auth_method: String, // "secret", "gh_cli", "token"

    /// Name of the stored secret holding the token
    pub secret_name: Option<String>,

    /// Directory holding `<secret_name>.json` documents
    #[serde(default = "default_secrets_dir")]
    pub secrets_dir: String,
}

/// Mail delivery configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MailConfig {
    /// Verified sender address
    pub sender: Option<String>,

    /// Report recipient
    pub recipient: Option<String>,

    /// Email API endpoint
    #[serde(default = "default_mail_endpoint")]
    pub endpoint: String,
}

/// Enumeration configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ScanConfig {
    /// Branch excluded from the report
    #[serde(default = "default_primary_branch")]
    pub primary_branch: String,

    /// Repository exclusion patterns
    #[serde(default)]
    pub exclude_repos: Vec<String>,
}

/// Report configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ReportConfig {
    /// Rendering strategy
    #[serde(default)]
    pub format: ReportFormat,

    /// Fetch HEAD commits and classify staleness
    #[serde(default = "default_true")]
    pub check_staleness: bool,

    /// Age after which a branch counts as stale
    #[serde(default = "default_stale_after_hours")]
    pub stale_after_hours: i64,
}

/// Rate limit backoff configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RateLimitConfig {
    /// Remaining quota below which the scan pauses
    #[serde(default = "default_threshold")]
    pub threshold: u64,

    /// Extra seconds to wait past the reset time
    #[serde(default = "default_buffer_secs")]
    pub buffer_secs: u64,
}

// Default value functions
fn default_auth_method() -> String {
    "secret".to_string()
}
fn default_true() -> bool {
    true
}
fn default_secrets_dir() -> String {
    config_dir()
        .map(|dir| dir.join("branchsentry").join("secrets"))
        .unwrap_or_else(|| PathBuf::from("${HOME}/.config/branchsentry/secrets"))
        .to_string_lossy()
        .into_owned()
}
fn default_mail_endpoint() -> String {
    "https://api.resend.com/emails".to_string()
}
fn default_primary_branch() -> String {
    "main".to_string()
}
fn default_stale_after_hours() -> i64 {
    crate::staleness::DEFAULT_STALE_AFTER_HOURS
}
fn default_threshold() -> u64 {
    100
}
fn default_buffer_secs() -> u64 {
    10
}

// Default implementations
impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            auth_method: default_auth_method(),
            secret_name: None,
            secrets_dir: default_secrets_dir(),
        }
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            sender: None,
            recipient: None,
            endpoint: default_mail_endpoint(),
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            primary_branch: default_primary_branch(),
            exclude_repos: Vec::new(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            format: ReportFormat::default(),
            check_staleness: default_true(),
            stale_after_hours: default_stale_after_hours(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            buffer_secs: default_buffer_secs(),
        }
    }
}

/// Environment variables that override file settings
pub const SECRET_NAME_ENV: &str = "GITHUB_SECRET_NAME";
pub const SENDER_ENV: &str = "SENDER_EMAIL";
pub const RECIPIENT_ENV: &str = "RECIPIENT_EMAIL";
/// Mail API key fallback when the secret document has none
pub const MAIL_API_KEY_ENV: &str = "MAIL_API_KEY";

impl Config {
    /// Load configuration from the default location, falling back to defaults
    pub fn load_or_default() -> Result<Self> {
        let config_path = Self::default_config_path()?;

        let mut config = if config_path.exists() {
            Self::load(&config_path)?
        } else {
            tracing::debug!("No configuration at {:?}, using defaults", config_path);
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let mut config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        // Expand environment variables in paths
        config.expand_paths()?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self).context("Failed to serialize configuration")?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;

        Ok(())
    }

    /// Get the default configuration file path (XDG compliant)
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = config_dir().context("Failed to get user config directory")?;

        Ok(config_dir.join("branchsentry").join("config.yml"))
    }

    /// Expand environment variables in configuration paths
    pub fn expand_paths(&mut self) -> Result<()> {
        self.github.secrets_dir = shellexpand::full(&self.github.secrets_dir)
            .context("Failed to expand secrets_dir path")?
            .into_owned();

        Ok(())
    }

    /// Apply `GITHUB_SECRET_NAME`, `SENDER_EMAIL` and `RECIPIENT_EMAIL`
    pub fn apply_env_overrides(&mut self) {
        if let Some(value) = non_empty_env(SECRET_NAME_ENV) {
            self.github.secret_name = Some(value);
        }
        if let Some(value) = non_empty_env(SENDER_ENV) {
            self.mail.sender = Some(value);
        }
        if let Some(value) = non_empty_env(RECIPIENT_ENV) {
            self.mail.recipient = Some(value);
        }
    }

    /// Secret name required by the `secret` auth method
    pub fn secret_name(&self) -> Result<&str> {
        required(&self.github.secret_name, SECRET_NAME_ENV)
    }

    pub fn sender(&self) -> Result<&str> {
        required(&self.mail.sender, SENDER_ENV)
    }

    pub fn recipient(&self) -> Result<&str> {
        required(&self.mail.recipient, RECIPIENT_ENV)
    }

    /// Staleness threshold as a chrono duration
    pub fn stale_after(&self) -> Result<chrono::Duration> {
        let hours = self.report.stale_after_hours;
        if hours < 0 {
            return Err(anyhow!("report.stale_after_hours must not be negative: {}", hours));
        }
        chrono::Duration::try_hours(hours)
            .with_context(|| format!("report.stale_after_hours out of range: {}", hours))
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn required<'a>(value: &'a Option<String>, env_key: &str) -> Result<&'a str> {
    value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| anyhow!("Missing configuration: set {} or the config file entry", env_key))
}

impl Default for Config {
    fn default() -> Self {
        Self {
            github: GitHubConfig::default(),
            mail: MailConfig::default(),
            scan: ScanConfig::default(),
            report: ReportConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}
