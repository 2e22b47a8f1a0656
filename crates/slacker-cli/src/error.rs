// ABOUTME: Error types for slacker-cli.
// ABOUTME: Defines CliError covering config, usage, enrichment, Slack, IO, and JSON failures.

use slacker_core::{EnrichError, LookupError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Usage(String),

    #[error(transparent)]
    Enrich(#[from] EnrichError),

    #[error("Slack request failed: {0}")]
    Slack(#[from] LookupError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Process exit status: 2 for bad invocations, 1 for everything else.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Usage(_) | CliError::Enrich(EnrichError::InvalidTab(_)) => 2,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_message_names_slack() {
        let err = CliError::from(EnrichError::Unavailable("timed out".into()));
        assert_eq!(err.to_string(), "could not reach Slack: timed out");
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_usage_errors_exit_2() {
        assert_eq!(CliError::Usage("bad".into()).exit_code(), 2);
        assert_eq!(
            CliError::from(EnrichError::InvalidTab("dms".into())).exit_code(),
            2
        );
    }
}
