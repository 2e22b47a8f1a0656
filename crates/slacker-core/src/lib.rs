// ABOUTME: Library root for slacker-core.
// ABOUTME: Exports the resolver cache, markup renderer, enrichment scheduler, and view assemblers.

pub mod client;
pub mod emoji;
pub mod error;
pub mod feed;
pub mod ident;
pub mod markup;
pub mod record;
pub mod resolver;
pub mod scheduler;
pub mod views;

pub use client::{ChannelInfo, RecordSource, SlackLookup};
pub use error::{EnrichError, LookupError, MalformedRecord, Result};
pub use feed::{ActivityItem, Conversation, HistoryMessage};
pub use ident::{IdentifierKey, IdentifierKind, ResolvedName};
pub use markup::{render, RenderMode, PREVIEW_LEN};
pub use record::{
    ConversationKind, Direction, EnrichedItem, RawRecord, RecordKind, Ts, View,
};
pub use resolver::{LookupStats, ResolverCache, DEFAULT_CONCURRENCY};
pub use scheduler::{EnrichOptions, Enricher};
pub use views::{activity_view, dms_view, ActivityTab, Assembled};
