// ABOUTME: Configuration loading and validation for slacker.
// ABOUTME: Supports TOML config files with environment variable expansion.

use crate::error::{CliError, Result};
use serde::Deserialize;
use slacker_core::{EnrichOptions, DEFAULT_CONCURRENCY, PREVIEW_LEN};
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;
use url::Url;

/// Top-level configuration structure for slacker.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub slack: SlackConfig,
    #[serde(default)]
    pub enrich: EnrichConfig,
}

/// Browser-session credentials for the Slack web API.
#[derive(Clone, Deserialize)]
pub struct SlackConfig {
    /// Client token (xoxc-...) or user token (xoxp-...).
    pub token: String,
    /// Value of the `d` session cookie.
    pub cookie: String,
    /// Workspace URL (e.g., "https://acme.slack.com"). Discovered through
    /// `auth.test` when omitted.
    #[serde(default)]
    pub workspace_url: Option<String>,
}

impl std::fmt::Debug for SlackConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackConfig")
            .field("token", &"[REDACTED]")
            .field("cookie", &"[REDACTED]")
            .field("workspace_url", &self.workspace_url)
            .finish()
    }
}

/// Enrichment tuning.
#[derive(Debug, Clone, Deserialize)]
pub struct EnrichConfig {
    /// Maximum simultaneous Slack calls.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Preview length in characters.
    #[serde(default = "default_preview_len")]
    pub preview_len: usize,

    /// Seconds to wait for name lookups before showing raw ids. 0 disables.
    #[serde(default = "default_time_budget_secs")]
    pub time_budget_secs: u64,
}

impl Default for EnrichConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            preview_len: default_preview_len(),
            time_budget_secs: default_time_budget_secs(),
        }
    }
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

fn default_preview_len() -> usize {
    PREVIEW_LEN
}

fn default_time_budget_secs() -> u64 {
    10
}

impl EnrichConfig {
    pub fn time_budget(&self) -> Option<Duration> {
        (self.time_budget_secs > 0).then(|| Duration::from_secs(self.time_budget_secs))
    }

    pub fn options(&self) -> EnrichOptions {
        EnrichOptions {
            preview_len: self.preview_len,
            time_budget: self.time_budget(),
        }
    }
}

impl Config {
    /// Load configuration from the specified path or default location.
    ///
    /// Default location: `~/.config/slacker/config.toml`
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let path = path
            .or_else(default_path)
            .ok_or_else(|| CliError::Config("Could not determine config path".into()))?;

        let contents = std::fs::read_to_string(&path).map_err(|e| {
            CliError::Config(format!("Failed to read config from {:?}: {}", path, e))
        })?;

        Self::parse(&contents)
    }

    /// Parse and validate TOML text, expanding `${VAR}` references first.
    pub fn parse(contents: &str) -> Result<Self> {
        // Undefined variables expand to empty strings with a warning.
        let contents = shellexpand::env_with_context_no_errors(contents, |var: &str| {
            match std::env::var(var) {
                Ok(val) => Some(val),
                Err(_) => {
                    warn!(
                        variable = %var,
                        "Environment variable not defined, using empty string"
                    );
                    Some(String::new())
                }
            }
        });

        let config: Config = toml::from_str(&contents)
            .map_err(|e| CliError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate that required fields are present and properly formatted.
    fn validate(&self) -> Result<()> {
        let token = self.slack.token.trim();
        if token.is_empty() {
            return Err(CliError::Config("slack.token is required".into()));
        }
        if !token.starts_with("xoxc-") && !token.starts_with("xoxp-") {
            return Err(CliError::Config(
                "slack.token must start with 'xoxc-' (client token) or 'xoxp-' (user token)"
                    .into(),
            ));
        }
        if self.slack.cookie.trim().is_empty() {
            return Err(CliError::Config("slack.cookie is required".into()));
        }
        if let Some(workspace) = &self.slack.workspace_url {
            let url = Url::parse(workspace).map_err(|e| {
                CliError::Config(format!("slack.workspace_url is not a valid URL: {}", e))
            })?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(CliError::Config(
                    "slack.workspace_url must be an http(s) URL".into(),
                ));
            }
        }
        if self.enrich.concurrency == 0 {
            return Err(CliError::Config("enrich.concurrency must be at least 1".into()));
        }
        if self.enrich.preview_len < 2 {
            return Err(CliError::Config("enrich.preview_len must be at least 2".into()));
        }
        Ok(())
    }
}

/// `~/.config/slacker/config.toml`
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("slacker").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enrich_config_default() {
        let config = EnrichConfig::default();
        assert_eq!(config.concurrency, 8);
        assert_eq!(config.preview_len, 80);
        assert_eq!(config.time_budget(), Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_zero_budget_disables_it() {
        let config = EnrichConfig {
            time_budget_secs: 0,
            ..Default::default()
        };
        assert_eq!(config.options().time_budget, None);
    }

    #[test]
    fn test_default_path_under_slacker() {
        if let Some(path) = default_path() {
            assert!(path.ends_with("slacker/config.toml"));
        }
    }
}
