// ABOUTME: Raw and enriched record types shared by the assemblers and scheduler.
// ABOUTME: RawRecord holds identifiers and markup; EnrichedItem holds display-ready text.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::ident::IdentifierKey;

/// Slack message timestamp (`"1697040000.123456"`).
///
/// Kept as the original string so it can be passed back to the API
/// unchanged; ordering is numeric.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ts(String);

impl Ts {
    pub fn new(ts: impl Into<String>) -> Self {
        Self(ts.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Seconds since the epoch. Unparseable timestamps sort first.
    pub fn seconds(&self) -> f64 {
        self.0.trim().parse::<f64>().unwrap_or(0.0)
    }

    pub fn from_datetime<Tz: TimeZone>(at: &DateTime<Tz>) -> Self {
        let utc = at.with_timezone(&Utc);
        Self(format!(
            "{}.{:06}",
            utc.timestamp(),
            utc.timestamp_subsec_micros()
        ))
    }

    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        let (secs, frac) = match self.0.split_once('.') {
            Some((secs, frac)) => (secs, frac),
            None => (self.0.as_str(), ""),
        };
        let secs: i64 = secs.parse().ok()?;
        if !frac.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let micros: u32 = if frac.is_empty() {
            0
        } else {
            format!("{:0<6}", &frac[..frac.len().min(6)]).parse().ok()?
        };
        Utc.timestamp_opt(secs, micros * 1_000).single()
    }
}

impl fmt::Display for Ts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialOrd for Ts {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ts {
    fn cmp(&self, other: &Self) -> Ordering {
        self.seconds()
            .total_cmp(&other.seconds())
            .then_with(|| self.0.cmp(&other.0))
    }
}

/// What produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Mention,
    Thread,
    Reaction,
    Message,
}

impl RecordKind {
    /// Map an `activity.feed` item type onto a record kind.
    pub fn from_feed_type(feed_type: &str) -> Self {
        match feed_type {
            "at_user" | "at_user_group" | "at_channel" | "at_everyone" | "keyword"
            | "list_user_mentioned" | "unjoined_channel_mention" => RecordKind::Mention,
            "thread_v2" => RecordKind::Thread,
            "message_reaction" => RecordKind::Reaction,
            _ => RecordKind::Message,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Mention => "mention",
            RecordKind::Thread => "thread",
            RecordKind::Reaction => "reaction",
            RecordKind::Message => "message",
        }
    }
}

/// Direction of a direct message relative to the authenticated user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Incoming,
    Outgoing,
}

/// Kind of direct conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationKind {
    Direct,
    Group,
}

/// An event or message as delivered by the API, identifiers unresolved.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub kind: RecordKind,
    pub ts: Ts,
    pub channel_id: String,
    pub actor: Option<IdentifierKey>,
    pub text: String,
    pub unread: bool,
    pub reaction: Option<String>,
    pub direction: Option<Direction>,
    pub conversation: Option<ConversationKind>,
}

impl RawRecord {
    pub fn new(kind: RecordKind, ts: Ts, channel_id: impl Into<String>) -> Self {
        Self {
            kind,
            ts,
            channel_id: channel_id.into(),
            actor: None,
            text: String::new(),
            unread: false,
            reaction: None,
            direction: None,
            conversation: None,
        }
    }

    pub fn with_actor(mut self, actor: IdentifierKey) -> Self {
        self.actor = Some(actor);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_unread(mut self, unread: bool) -> Self {
        self.unread = unread;
        self
    }

    pub fn with_reaction(mut self, code: impl Into<String>) -> Self {
        self.reaction = Some(code.into());
        self
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = Some(direction);
        self
    }

    pub fn with_conversation(mut self, kind: ConversationKind) -> Self {
        self.conversation = Some(kind);
        self
    }

    pub fn channel_key(&self) -> IdentifierKey {
        IdentifierKey::channel(self.channel_id.clone())
    }
}

/// A display-ready record.
///
/// Field names are the contract with the output formatters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedItem {
    pub kind: RecordKind,
    pub ts: Ts,
    pub channel_id: String,
    pub channel: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub message: String,
    pub text: String,
    pub unread: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reaction: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation: Option<ConversationKind>,
}

/// Enriched items plus the diagnostics gathered while building them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct View {
    pub items: Vec<EnrichedItem>,
    /// Records dropped for missing fields, or conversations that could not be read.
    pub skipped: usize,
    /// Identifiers shown as raw ids because they could not be resolved.
    pub degraded: usize,
}

impl View {
    /// Items that came from conversations of `kind`.
    pub fn count_conversation(&self, kind: ConversationKind) -> usize {
        self.items
            .iter()
            .filter(|item| item.conversation == Some(kind))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ts_numeric_ordering() {
        let a = Ts::new("999.000100");
        let b = Ts::new("1000.000001");
        assert!(a < b);
        assert_eq!(a.seconds(), 999.0001);
    }

    #[test]
    fn test_ts_datetime_round_trip() {
        let ts = Ts::new("1700000000.123456");
        let at = ts.to_datetime().unwrap();
        assert_eq!(at.timestamp(), 1_700_000_000);
        assert_eq!(at.timestamp_subsec_micros(), 123_456);
        assert_eq!(Ts::from_datetime(&at), ts);
    }

    #[test]
    fn test_ts_short_fraction() {
        let at = Ts::new("1700000000.5").to_datetime().unwrap();
        assert_eq!(at.timestamp_subsec_micros(), 500_000);
        assert!(Ts::new("garbage").to_datetime().is_none());
    }

    #[test]
    fn test_count_conversation() {
        let item = |kind: Option<ConversationKind>| EnrichedItem {
            kind: RecordKind::Message,
            ts: Ts::new("1.0"),
            channel_id: "D1".to_string(),
            channel: "@bob".to_string(),
            username: None,
            message: String::new(),
            text: String::new(),
            unread: false,
            direction: None,
            reaction: None,
            conversation: kind,
        };
        let view = View {
            items: vec![
                item(Some(ConversationKind::Direct)),
                item(Some(ConversationKind::Group)),
                item(Some(ConversationKind::Direct)),
                item(None),
            ],
            ..Default::default()
        };
        assert_eq!(view.count_conversation(ConversationKind::Direct), 2);
        assert_eq!(view.count_conversation(ConversationKind::Group), 1);
        assert_eq!(
            serde_json::to_value(&view.items[1]).unwrap()["conversation"],
            "group"
        );
        assert!(serde_json::to_value(&view.items[3])
            .unwrap()
            .get("conversation")
            .is_none());
    }

    #[test]
    fn test_record_kind_from_feed_type() {
        assert_eq!(RecordKind::from_feed_type("at_user"), RecordKind::Mention);
        assert_eq!(RecordKind::from_feed_type("keyword"), RecordKind::Mention);
        assert_eq!(RecordKind::from_feed_type("thread_v2"), RecordKind::Thread);
        assert_eq!(
            RecordKind::from_feed_type("message_reaction"),
            RecordKind::Reaction
        );
        assert_eq!(
            RecordKind::from_feed_type("bot_dm_bundle"),
            RecordKind::Message
        );
    }
}
