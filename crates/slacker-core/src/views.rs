// ABOUTME: View assemblers for the activity feed and direct messages.
// ABOUTME: Filter, order, and hydrate raw records before handing them to the Enricher.

use futures::future::join_all;
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use tracing::{debug, info, warn};

use crate::client::RecordSource;
use crate::error::{EnrichError, LookupError, Result};
use crate::feed::{ActivityItem, Conversation, HistoryMessage};
use crate::ident::IdentifierKey;
use crate::record::{Direction, RawRecord, RecordKind, Ts, View};
use crate::resolver::ResolverCache;
use crate::scheduler::Enricher;

/// Activity feed tabs. "all" is the absence of a tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityTab {
    Mentions,
    Threads,
    Reactions,
}

impl ActivityTab {
    /// Parse a user-supplied tab name. `all` means no filter.
    pub fn parse(value: &str) -> Result<Option<Self>> {
        match value.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(None),
            other => other.parse().map(Some),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityTab::Mentions => "mentions",
            ActivityTab::Threads => "threads",
            ActivityTab::Reactions => "reactions",
        }
    }

    /// Whether records of `kind` belong on this tab.
    pub fn includes(&self, kind: RecordKind) -> bool {
        match self {
            ActivityTab::Mentions => kind == RecordKind::Mention,
            ActivityTab::Threads => kind == RecordKind::Thread,
            ActivityTab::Reactions => kind == RecordKind::Reaction,
        }
    }

    /// Value of the `types` parameter for `activity.feed`.
    pub fn feed_types(tab: Option<Self>) -> &'static str {
        match tab {
            Some(ActivityTab::Mentions) => {
                "at_user,at_user_group,at_channel,at_everyone,keyword,list_user_mentioned"
            }
            Some(ActivityTab::Threads) => "thread_v2",
            Some(ActivityTab::Reactions) => "message_reaction",
            None => {
                "thread_v2,message_reaction,internal_channel_invite,list_record_edited,\
                 bot_dm_bundle,at_user,at_user_group,at_channel,at_everyone,keyword,\
                 list_record_assigned,list_user_mentioned,list_todo_notification,\
                 list_approval_request,list_approval_reviewed,unjoined_channel_mention,\
                 external_channel_invite,external_dm_invite"
            }
        }
    }
}

impl FromStr for ActivityTab {
    type Err = EnrichError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "mentions" => Ok(ActivityTab::Mentions),
            "threads" => Ok(ActivityTab::Threads),
            "reactions" => Ok(ActivityTab::Reactions),
            other => Err(EnrichError::InvalidTab(other.to_string())),
        }
    }
}

impl fmt::Display for ActivityTab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Records ready for enrichment plus how many inputs were dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Assembled {
    pub records: Vec<RawRecord>,
    pub skipped: usize,
}

/// Validate feed items and keep those on `tab`, in delivered order.
pub fn assemble_activity(items: Vec<ActivityItem>, tab: Option<ActivityTab>) -> Assembled {
    let mut assembled = Assembled::default();
    for item in items {
        match item.into_record() {
            Ok(record) if tab.map_or(true, |t| t.includes(record.kind)) => {
                assembled.records.push(record)
            }
            Ok(_) => {}
            Err(err) => {
                debug!(error = %err, "Skipping activity item");
                assembled.skipped += 1;
            }
        }
    }
    assembled
}

/// Fetch the feed and fill in each item's message text.
pub async fn load_activity(
    source: &dyn RecordSource,
    tab: Option<ActivityTab>,
    cache: &ResolverCache,
) -> Result<Assembled> {
    let items = source.activity_feed(tab).await.map_err(unavailable)?;
    info!(items = items.len(), tab = ?tab, "Fetched activity feed");

    let mut assembled = assemble_activity(items, tab);
    let records = std::mem::take(&mut assembled.records);
    assembled.records = join_all(
        records
            .into_iter()
            .map(|record| hydrate_text(source, cache, record)),
    )
    .await;
    Ok(assembled)
}

/// Run `call` under a limiter permit unless the cache is cancelled first.
async fn guarded<F: Future>(cache: &ResolverCache, call: F) -> Option<F::Output> {
    let cancel = cache.cancellation();
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        out = async {
            let limiter = cache.limiter();
            let _permit = limiter.acquire().await.ok()?;
            Some(call.await)
        } => out,
    }
}

async fn hydrate_text(
    source: &dyn RecordSource,
    cache: &ResolverCache,
    record: RawRecord,
) -> RawRecord {
    if !record.text.is_empty() {
        return record;
    }
    let fetched = guarded(cache, source.message_text(&record.channel_id, &record.ts)).await;
    match fetched {
        Some(Ok(Some(text))) => record.with_text(text),
        Some(Ok(None)) | None => record,
        Some(Err(err)) => {
            warn!(
                channel = %record.channel_id,
                ts = %record.ts,
                error = %err,
                "Could not fetch message text"
            );
            record
        }
    }
}

/// A conversation and the messages fetched for it.
#[derive(Debug, Clone)]
pub struct ConversationHistory {
    pub conversation: Conversation,
    pub messages: Vec<HistoryMessage>,
}

/// Whether a conversation may hold messages at or after `since`.
pub fn is_active_since(conversation: &Conversation, since: &Ts) -> bool {
    conversation.latest.as_ref().map_or(true, |latest| latest >= since)
}

/// Merge DM histories into one newest-first record list.
///
/// Messages before `since` are dropped; conversations left empty contribute
/// nothing. Messages sent by `me` are outgoing.
pub fn assemble_dms(me: &str, since: &Ts, histories: Vec<ConversationHistory>) -> Assembled {
    let mut assembled = Assembled::default();
    for history in histories {
        let channel = history.conversation.id;
        let kind = history.conversation.kind;
        for message in history.messages {
            let Some(ts) = message.ts.clone() else {
                assembled.skipped += 1;
                continue;
            };
            if &ts < since {
                continue;
            }
            let direction = match message.sender() {
                Some(sender) if sender == me => Direction::Outgoing,
                _ => Direction::Incoming,
            };
            let mut record = RawRecord::new(RecordKind::Message, ts, channel.clone())
                .with_text(message.display_text())
                .with_direction(direction)
                .with_conversation(kind);
            if let Some(sender) = message.sender() {
                record = record.with_actor(IdentifierKey::actor(sender));
            }
            assembled.records.push(record);
        }
    }
    assembled.records.sort_by(|a, b| b.ts.cmp(&a.ts));
    assembled
}

/// Fetch every DM conversation active since `since` and assemble its messages.
pub async fn load_dms(
    source: &dyn RecordSource,
    since: &Ts,
    cache: &ResolverCache,
) -> Result<Assembled> {
    let me = source.auth_user_id().await.map_err(unavailable)?;
    let conversations = source.conversations().await.map_err(unavailable)?;
    let total = conversations.len();

    let active: Vec<Conversation> = conversations
        .into_iter()
        .filter(|c| is_active_since(c, since))
        .collect();
    info!(
        conversations = total,
        active = active.len(),
        since = %since,
        "Listing direct messages"
    );

    let fetched = join_all(
        active
            .into_iter()
            .map(|conversation| fetch_history(source, cache, since, conversation)),
    )
    .await;

    let mut failed = 0;
    let histories: Vec<ConversationHistory> = fetched
        .into_iter()
        .filter_map(|history| {
            if history.is_none() {
                failed += 1;
            }
            history
        })
        .collect();

    let mut assembled = assemble_dms(&me, since, histories);
    assembled.skipped += failed;
    Ok(assembled)
}

async fn fetch_history(
    source: &dyn RecordSource,
    cache: &ResolverCache,
    since: &Ts,
    conversation: Conversation,
) -> Option<ConversationHistory> {
    let fetched = guarded(cache, source.history(&conversation.id, since)).await?;
    match fetched {
        Ok(messages) => Some(ConversationHistory {
            conversation,
            messages,
        }),
        Err(err) => {
            warn!(
                conversation = %conversation.id,
                error = %err,
                "Could not read conversation history"
            );
            None
        }
    }
}

/// Load and enrich the activity feed.
pub async fn activity_view(
    source: &dyn RecordSource,
    tab: Option<ActivityTab>,
    enricher: &Enricher<'_>,
) -> Result<View> {
    let assembled = enricher
        .within_budget(load_activity(source, tab, enricher.cache()))
        .await?;
    let mut view = enricher.enrich_view(&assembled.records).await?;
    view.skipped = assembled.skipped;
    Ok(view)
}

/// Load and enrich direct messages since `since`.
pub async fn dms_view(
    source: &dyn RecordSource,
    since: &Ts,
    enricher: &Enricher<'_>,
) -> Result<View> {
    let assembled = enricher
        .within_budget(load_dms(source, since, enricher.cache()))
        .await?;
    let mut view = enricher.enrich_view(&assembled.records).await?;
    view.skipped = assembled.skipped;
    Ok(view)
}

fn unavailable(err: LookupError) -> EnrichError {
    EnrichError::Unavailable(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::ConversationKind;
    use serde_json::json;

    fn feed(value: serde_json::Value) -> Vec<ActivityItem> {
        serde_json::from_value(value).unwrap()
    }

    fn message(ts: &str, user: &str, text: &str) -> HistoryMessage {
        serde_json::from_value(json!({ "ts": ts, "user": user, "text": text })).unwrap()
    }

    fn conversation(id: &str, latest: &str) -> Conversation {
        Conversation {
            id: id.to_string(),
            kind: ConversationKind::Direct,
            latest: Some(Ts::new(latest)),
        }
    }

    #[test]
    fn test_tab_parsing() {
        assert_eq!(ActivityTab::parse("all").unwrap(), None);
        assert_eq!(
            ActivityTab::parse("Mentions").unwrap(),
            Some(ActivityTab::Mentions)
        );
        assert_eq!(
            ActivityTab::parse("reactions").unwrap(),
            Some(ActivityTab::Reactions)
        );
        assert!(matches!(
            ActivityTab::parse("dms"),
            Err(EnrichError::InvalidTab(tab)) if tab == "dms"
        ));
    }

    #[test]
    fn test_feed_types() {
        assert_eq!(ActivityTab::feed_types(Some(ActivityTab::Threads)), "thread_v2");
        assert!(ActivityTab::feed_types(None).contains("message_reaction"));
        assert!(!ActivityTab::feed_types(None).contains(' '));
    }

    #[test]
    fn test_assemble_activity_filters_and_counts() {
        let items = feed(json!([
            { "item": { "type": "at_user",
                        "message": { "ts": "3.0", "channel": "C1", "author_user_id": "U1" } } },
            { "item": { "type": "message_reaction", "message": { "ts": "2.0", "channel": "C1" },
                        "reaction": { "user": "U2", "name": "eyes" } } },
            { "item": { "type": "at_channel", "message": { "ts": "1.0" } } },
            { "item": { "type": "keyword", "message": { "ts": "0.5", "channel": "C2" } } }
        ]));

        let all = assemble_activity(items.clone(), None);
        assert_eq!(all.records.len(), 3);
        assert_eq!(all.skipped, 1);
        assert_eq!(all.records[0].ts, Ts::new("3.0"));
        assert_eq!(all.records[2].ts, Ts::new("0.5"));

        let mentions = assemble_activity(items, Some(ActivityTab::Mentions));
        assert_eq!(mentions.records.len(), 2);
        assert!(mentions
            .records
            .iter()
            .all(|r| r.kind == RecordKind::Mention));
    }

    #[test]
    fn test_assemble_dms_direction_and_order() {
        let since = Ts::new("100.0");
        let histories = vec![
            ConversationHistory {
                conversation: conversation("D1", "150.0"),
                messages: vec![
                    message("150.0", "UME", "on my way"),
                    message("120.0", "U2", "where are you"),
                    message("50.0", "U2", "old news"),
                ],
            },
            ConversationHistory {
                conversation: conversation("D2", "130.0"),
                messages: vec![message("130.0", "U3", "lunch?")],
            },
        ];

        let assembled = assemble_dms("UME", &since, histories);
        let ts: Vec<_> = assembled.records.iter().map(|r| r.ts.as_str()).collect();
        assert_eq!(ts, vec!["150.0", "130.0", "120.0"]);
        assert_eq!(assembled.records[0].direction, Some(Direction::Outgoing));
        assert_eq!(assembled.records[1].direction, Some(Direction::Incoming));
        assert_eq!(assembled.records[1].channel_id, "D2");
        assert!(assembled
            .records
            .iter()
            .all(|r| r.conversation == Some(ConversationKind::Direct)));
        assert_eq!(assembled.skipped, 0);
    }

    #[test]
    fn test_assemble_dms_omits_stale_conversation() {
        let since = Ts::new("100.0");
        let histories = vec![ConversationHistory {
            conversation: conversation("D1", "99.0"),
            messages: vec![message("99.0", "U2", "yesterday")],
        }];
        let assembled = assemble_dms("UME", &since, histories);
        assert!(assembled.records.is_empty());
    }

    #[test]
    fn test_is_active_since() {
        let since = Ts::new("100.0");
        assert!(is_active_since(&conversation("D1", "100.0"), &since));
        assert!(!is_active_since(&conversation("D1", "99.9"), &since));

        let unknown = Conversation {
            latest: None,
            ..conversation("D1", "0")
        };
        assert!(is_active_since(&unknown, &since));
    }
}
