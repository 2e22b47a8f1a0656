// ABOUTME: Wire shapes for activity feed items, DM conversations, and history messages.
// ABOUTME: Every field is optional on the wire; conversion into RawRecord validates them.

use serde::Deserialize;
use serde_json::Value;

use crate::error::MalformedRecord;
use crate::ident::IdentifierKey;
use crate::record::{RawRecord, RecordKind, Ts};
pub use crate::record::ConversationKind;

/// One entry of `activity.feed`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActivityItem {
    #[serde(default)]
    pub is_unread: bool,
    #[serde(default)]
    pub item: FeedPayload,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedPayload {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub message: Option<FeedMessage>,
    pub reaction: Option<FeedReaction>,
    pub bundle_info: Option<BundleInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedMessage {
    pub ts: Option<Ts>,
    pub channel: Option<String>,
    pub author_user_id: Option<String>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedReaction {
    pub user: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BundleInfo {
    #[serde(default)]
    pub payload: BundlePayload,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BundlePayload {
    pub thread_entry: Option<ThreadEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThreadEntry {
    pub channel_id: Option<String>,
    pub latest_ts: Option<Ts>,
}

impl ActivityItem {
    /// Validate and flatten into a record. Text is whatever the feed carried
    /// inline, usually nothing; the loader fills it in afterwards.
    pub fn into_record(self) -> Result<RawRecord, MalformedRecord> {
        let feed_type = self.item.kind.ok_or(MalformedRecord("type"))?;
        let kind = RecordKind::from_feed_type(&feed_type);

        let (channel, ts) = match kind {
            RecordKind::Thread => {
                let entry = self
                    .item
                    .bundle_info
                    .and_then(|b| b.payload.thread_entry)
                    .ok_or(MalformedRecord("thread entry"))?;
                (entry.channel_id, entry.latest_ts)
            }
            _ => {
                let message = self.item.message.clone().unwrap_or_default();
                (message.channel, message.ts)
            }
        };
        let channel = channel
            .filter(|c| !c.is_empty())
            .ok_or(MalformedRecord("channel"))?;
        let ts = ts.ok_or(MalformedRecord("timestamp"))?;

        let mut record = RawRecord::new(kind, ts, channel).with_unread(self.is_unread);
        if let Some(text) = self.item.message.as_ref().and_then(|m| m.text.clone()) {
            record = record.with_text(text);
        }

        match kind {
            RecordKind::Reaction => {
                let reaction = self.item.reaction.unwrap_or_default();
                if let Some(user) = reaction.user {
                    record = record.with_actor(IdentifierKey::actor(user));
                }
                if let Some(name) = reaction.name {
                    record = record.with_reaction(name);
                }
            }
            RecordKind::Mention | RecordKind::Message => {
                if let Some(author) = self.item.message.and_then(|m| m.author_user_id) {
                    record = record.with_actor(IdentifierKey::actor(author));
                }
            }
            RecordKind::Thread => {}
        }

        Ok(record)
    }
}

/// A DM or group DM from the conversation list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    pub id: String,
    pub kind: ConversationKind,
    /// Timestamp of the most recent message, if known.
    pub latest: Option<Ts>,
}

/// One message from `conversations.history`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryMessage {
    pub ts: Option<Ts>,
    pub user: Option<String>,
    pub bot_id: Option<String>,
    pub text: Option<String>,
    #[serde(default)]
    pub blocks: Vec<Value>,
    #[serde(default)]
    pub files: Vec<Value>,
}

impl HistoryMessage {
    /// Sender id: the user, or the bot for bot posts.
    pub fn sender(&self) -> Option<&str> {
        self.user.as_deref().or(self.bot_id.as_deref())
    }

    /// Markup text, falling back to rich-text blocks and then to a file
    /// placeholder.
    pub fn display_text(&self) -> String {
        if let Some(text) = self.text.as_deref().filter(|t| !t.is_empty()) {
            return text.to_string();
        }
        let from_blocks = rich_text(&self.blocks);
        if !from_blocks.is_empty() {
            return from_blocks;
        }
        if !self.files.is_empty() {
            return "[file attachment]".to_string();
        }
        String::new()
    }
}

/// Concatenate the plain `text` elements of `rich_text` sections.
pub fn rich_text(blocks: &[Value]) -> String {
    let mut out = String::new();
    let of_type =
        |value: &&Value, kind: &str| value.get("type").and_then(Value::as_str) == Some(kind);
    let elements = |value: &Value| -> Vec<Value> {
        value
            .get("elements")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default()
    };

    for block in blocks.iter().filter(|b| of_type(b, "rich_text")) {
        for section in elements(block).iter().filter(|e| of_type(e, "rich_text_section")) {
            for element in elements(section).iter().filter(|e| of_type(e, "text")) {
                if let Some(text) = element.get("text").and_then(Value::as_str) {
                    out.push_str(text);
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item(value: Value) -> ActivityItem {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_mention_item() {
        let record = item(json!({
            "is_unread": true,
            "item": {
                "type": "at_user",
                "message": { "ts": "1700000000.000100", "channel": "C1", "author_user_id": "U1" }
            }
        }))
        .into_record()
        .unwrap();

        assert_eq!(record.kind, RecordKind::Mention);
        assert_eq!(record.channel_id, "C1");
        assert_eq!(record.actor, Some(IdentifierKey::user("U1")));
        assert!(record.unread);
        assert!(record.text.is_empty());
    }

    #[test]
    fn test_thread_item() {
        let record = item(json!({
            "item": {
                "type": "thread_v2",
                "bundle_info": { "payload": { "thread_entry": {
                    "channel_id": "C2", "latest_ts": "1700000001.000000"
                }}}
            }
        }))
        .into_record()
        .unwrap();

        assert_eq!(record.kind, RecordKind::Thread);
        assert_eq!(record.channel_id, "C2");
        assert_eq!(record.ts, Ts::new("1700000001.000000"));
        assert!(record.actor.is_none());
    }

    #[test]
    fn test_reaction_item() {
        let record = item(json!({
            "item": {
                "type": "message_reaction",
                "message": { "ts": "1.0", "channel": "C3" },
                "reaction": { "user": "U7", "name": "tada" }
            }
        }))
        .into_record()
        .unwrap();

        assert_eq!(record.kind, RecordKind::Reaction);
        assert_eq!(record.actor, Some(IdentifierKey::user("U7")));
        assert_eq!(record.reaction.as_deref(), Some("tada"));
    }

    #[test]
    fn test_malformed_items() {
        let missing_channel = item(json!({
            "item": { "type": "at_user", "message": { "ts": "1.0" } }
        }));
        assert_eq!(
            missing_channel.into_record().unwrap_err(),
            MalformedRecord("channel")
        );

        let missing_ts = item(json!({
            "item": { "type": "at_user", "message": { "channel": "C1" } }
        }));
        assert_eq!(
            missing_ts.into_record().unwrap_err(),
            MalformedRecord("timestamp")
        );

        let bare_thread = item(json!({ "item": { "type": "thread_v2" } }));
        assert_eq!(
            bare_thread.into_record().unwrap_err(),
            MalformedRecord("thread entry")
        );

        assert_eq!(
            ActivityItem::default().into_record().unwrap_err(),
            MalformedRecord("type")
        );
    }

    #[test]
    fn test_history_text_fallbacks() {
        let plain: HistoryMessage =
            serde_json::from_value(json!({ "ts": "1.0", "user": "U1", "text": "hi" })).unwrap();
        assert_eq!(plain.display_text(), "hi");

        let blocks: HistoryMessage = serde_json::from_value(json!({
            "ts": "1.0",
            "text": "",
            "blocks": [{ "type": "rich_text", "elements": [
                { "type": "rich_text_section", "elements": [
                    { "type": "text", "text": "from " },
                    { "type": "user", "user_id": "U1" },
                    { "type": "text", "text": "blocks" }
                ]}
            ]}]
        }))
        .unwrap();
        assert_eq!(blocks.display_text(), "from blocks");

        let file: HistoryMessage = serde_json::from_value(json!({
            "ts": "1.0", "files": [{ "id": "F1" }]
        }))
        .unwrap();
        assert_eq!(file.display_text(), "[file attachment]");
    }

    #[test]
    fn test_history_sender() {
        let bot: HistoryMessage =
            serde_json::from_value(json!({ "ts": "1.0", "bot_id": "B1" })).unwrap();
        assert_eq!(bot.sender(), Some("B1"));
    }
}
