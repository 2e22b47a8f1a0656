// ABOUTME: Identifier keys and resolved display names.
// ABOUTME: Keys are the resolver's cache keys; names carry the raw-id fallback.

use std::fmt;

/// Which lookup endpoint an identifier belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IdentifierKind {
    User,
    Channel,
    Team,
}

/// A Slack identifier tagged with its kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentifierKey {
    kind: IdentifierKind,
    id: String,
}

impl IdentifierKey {
    pub fn new(kind: IdentifierKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    pub fn user(id: impl Into<String>) -> Self {
        Self::new(IdentifierKind::User, id)
    }

    pub fn channel(id: impl Into<String>) -> Self {
        Self::new(IdentifierKind::Channel, id)
    }

    pub fn team(id: impl Into<String>) -> Self {
        Self::new(IdentifierKind::Team, id)
    }

    /// Key for the author of an event. Workspace (`T…`) and enterprise
    /// (`E…`) ids are teams; everything else is a user.
    pub fn actor(id: impl Into<String>) -> Self {
        let id = id.into();
        if id.starts_with('T') || id.starts_with('E') {
            Self::team(id)
        } else {
            Self::user(id)
        }
    }

    pub fn kind(&self) -> IdentifierKind {
        self.kind
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for IdentifierKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.kind {
            IdentifierKind::User => "user",
            IdentifierKind::Channel => "channel",
            IdentifierKind::Team => "team",
        };
        write!(f, "{}:{}", tag, self.id)
    }
}

/// Outcome of resolving an identifier.
///
/// `display` is `None` when the lookup failed, was never attempted, or
/// returned a blank name; callers then fall back to the raw id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedName {
    key: IdentifierKey,
    display: Option<String>,
}

impl ResolvedName {
    /// A successful resolution. Blank names are stored as failures.
    pub fn resolved(key: IdentifierKey, display: impl Into<String>) -> Self {
        let display = display.into();
        let display = display.trim();
        if display.is_empty() {
            Self::failed(key)
        } else {
            Self {
                key,
                display: Some(display.to_string()),
            }
        }
    }

    /// The failure sentinel for `key`.
    pub fn failed(key: IdentifierKey) -> Self {
        Self { key, display: None }
    }

    pub fn key(&self) -> &IdentifierKey {
        &self.key
    }

    pub fn is_resolved(&self) -> bool {
        self.display.is_some()
    }

    /// The resolved display name, if any.
    pub fn display(&self) -> Option<&str> {
        self.display.as_deref()
    }

    /// The display name, or the raw id when resolution failed.
    pub fn display_or_id(&self) -> &str {
        self.display.as_deref().unwrap_or(self.key.id())
    }
}
