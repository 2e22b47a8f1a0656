// ABOUTME: Collaborator traits the engine consumes: name lookups and record sources.
// ABOUTME: The CLI implements both over HTTP; tests implement them with canned data.

use async_trait::async_trait;

use crate::error::LookupError;
use crate::feed::{ActivityItem, Conversation, HistoryMessage};
use crate::record::Ts;
use crate::views::ActivityTab;

/// What `conversations.info` tells us about a channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelInfo {
    pub name: Option<String>,
    /// Counterpart user of a 1:1 DM.
    pub im_user: Option<String>,
}

impl ChannelInfo {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            im_user: None,
        }
    }

    pub fn direct(user_id: impl Into<String>) -> Self {
        Self {
            name: None,
            im_user: Some(user_id.into()),
        }
    }
}

/// Upstream display-name lookups, one per identifier kind.
#[async_trait]
pub trait SlackLookup: Send + Sync {
    /// The user's handle.
    async fn user_info(&self, user_id: &str) -> Result<String, LookupError>;

    async fn channel_info(&self, channel_id: &str) -> Result<ChannelInfo, LookupError>;

    /// The team (workspace) name.
    async fn team_info(&self, team_id: &str) -> Result<String, LookupError>;
}

/// Source of the raw records the views are built from.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Id of the user the credentials belong to.
    async fn auth_user_id(&self) -> Result<String, LookupError>;

    /// Latest page of the activity feed, optionally narrowed to one tab.
    async fn activity_feed(
        &self,
        tab: Option<ActivityTab>,
    ) -> Result<Vec<ActivityItem>, LookupError>;

    /// Text of the message at `ts` in `channel_id`, if it still exists.
    async fn message_text(&self, channel_id: &str, ts: &Ts)
        -> Result<Option<String>, LookupError>;

    /// Direct and group-direct conversations with their latest activity.
    async fn conversations(&self) -> Result<Vec<Conversation>, LookupError>;

    /// Messages in `channel_id` at or after `oldest`.
    async fn history(
        &self,
        channel_id: &str,
        oldest: &Ts,
    ) -> Result<Vec<HistoryMessage>, LookupError>;
}
