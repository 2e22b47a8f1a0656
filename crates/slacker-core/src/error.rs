// ABOUTME: Error types for slacker-core.
// ABOUTME: Separates per-lookup failures (absorbed) from pass-level failures (surfaced).

use thiserror::Error;

/// Failure of a single upstream call.
///
/// These never abort a view on their own; the resolver turns them into
/// fallback names and the loaders count them as skipped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("access denied: {0}")]
    Forbidden(String),

    #[error("Slack API error: {0}")]
    Api(String),

    #[error("transport error: {0}")]
    Transport(String),
}

impl LookupError {
    /// Whether this failure says anything about reachability of the service.
    pub fn is_transport(&self) -> bool {
        matches!(self, LookupError::Transport(_))
    }
}

/// Errors that abort an enrichment pass.
#[derive(Error, Debug)]
pub enum EnrichError {
    #[error("could not reach Slack: {0}")]
    Unavailable(String),

    #[error("unknown activity tab '{0}' (expected one of: all, mentions, threads, reactions)")]
    InvalidTab(String),
}

/// A raw record lacking a field the views need.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("record is missing {0}")]
pub struct MalformedRecord(pub &'static str);

pub type Result<T> = std::result::Result<T, EnrichError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_classification() {
        assert!(LookupError::Transport("reset".into()).is_transport());
        assert!(!LookupError::NotFound("U1".into()).is_transport());
        assert!(!LookupError::Forbidden("C1".into()).is_transport());
        assert!(!LookupError::Api("ratelimited".into()).is_transport());
    }

    #[test]
    fn test_error_display() {
        let err = EnrichError::InvalidTab("dms".to_string());
        assert!(err.to_string().starts_with("unknown activity tab 'dms'"));

        let err = EnrichError::Unavailable("connection refused".to_string());
        assert_eq!(err.to_string(), "could not reach Slack: connection refused");
    }
}
