// ABOUTME: Per-invocation, single-flight cache of identifier display names.
// ABOUTME: Bounds upstream concurrency with a shared semaphore and honors cancellation.

use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{OnceCell, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::client::SlackLookup;
use crate::error::LookupError;
use crate::ident::{IdentifierKey, IdentifierKind, ResolvedName};

/// Default ceiling on simultaneous upstream lookups.
pub const DEFAULT_CONCURRENCY: usize = 8;

type Slot = Arc<OnceCell<ResolvedName>>;

/// Snapshot of upstream lookup counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LookupStats {
    pub issued: usize,
    pub failed: usize,
    pub transport_failures: usize,
}

impl LookupStats {
    /// Every lookup that went out failed to reach the service.
    pub fn is_total_outage(&self) -> bool {
        self.issued > 0 && self.transport_failures == self.issued
    }
}

#[derive(Default)]
struct Counters {
    issued: AtomicUsize,
    failed: AtomicUsize,
    transport_failures: AtomicUsize,
}

/// Why a slot was left empty.
struct Cancelled;

/// Read-through cache mapping identifiers to display names.
///
/// Each key owns a `OnceCell`; the first caller runs the lookup and every
/// concurrent caller for the same key awaits that same cell. Failures are
/// stored too, so a bad id is looked up once per invocation.
pub struct ResolverCache {
    lookup: Arc<dyn SlackLookup>,
    limiter: Arc<Semaphore>,
    slots: Mutex<HashMap<IdentifierKey, Slot>>,
    cancel: CancellationToken,
    counters: Counters,
}

impl ResolverCache {
    pub fn new(lookup: Arc<dyn SlackLookup>, concurrency: usize) -> Self {
        Self {
            lookup,
            limiter: Arc::new(Semaphore::new(concurrency.max(1))),
            slots: Mutex::new(HashMap::new()),
            cancel: CancellationToken::new(),
            counters: Counters::default(),
        }
    }

    /// Share an externally owned cancellation token.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// The semaphore guarding upstream calls. Loaders that fetch records
    /// acquire it too, so one ceiling covers the whole invocation.
    pub fn limiter(&self) -> Arc<Semaphore> {
        Arc::clone(&self.limiter)
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Stop issuing lookups. Pending and future callers get fallbacks.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn stats(&self) -> LookupStats {
        LookupStats {
            issued: self.counters.issued.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            transport_failures: self.counters.transport_failures.load(Ordering::Relaxed),
        }
    }

    /// Resolve one identifier, issuing at most one upstream call per key.
    pub async fn resolve(&self, key: &IdentifierKey) -> ResolvedName {
        let slot = self.slot(key);
        match slot.get_or_try_init(|| self.fetch(key)).await {
            Ok(name) => name.clone(),
            Err(Cancelled) => ResolvedName::failed(key.clone()),
        }
    }

    /// Resolve a batch of identifiers in one wave.
    ///
    /// Duplicates are collapsed and in-flight calls are bounded by the
    /// limiter, so wall time scales with distinct keys, not references.
    pub async fn prefetch<I>(&self, keys: I)
    where
        I: IntoIterator<Item = IdentifierKey>,
    {
        let distinct: HashSet<IdentifierKey> = keys.into_iter().collect();
        debug!(keys = distinct.len(), "Prefetching identifiers");

        let mut wave: FuturesUnordered<_> = distinct
            .iter()
            .map(|key| self.resolve(key))
            .collect();
        while wave.next().await.is_some() {}
    }

    /// Synchronous read of whatever the cache holds for `key`.
    ///
    /// Keys that were never resolved, or are still in flight, read as
    /// failures so rendering can proceed without waiting.
    pub fn peek(&self, key: &IdentifierKey) -> ResolvedName {
        let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots
            .get(key)
            .and_then(|slot| slot.get().cloned())
            .unwrap_or_else(|| ResolvedName::failed(key.clone()))
    }

    /// Whether a value (success or failure) is cached for `key`.
    pub fn contains(&self, key: &IdentifierKey) -> bool {
        let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.get(key).is_some_and(|slot| slot.initialized())
    }

    fn resolve_boxed(&self, key: IdentifierKey) -> BoxFuture<'_, ResolvedName> {
        Box::pin(async move { self.resolve(&key).await })
    }

    fn slot(&self, key: &IdentifierKey) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(slots.entry(key.clone()).or_default())
    }

    async fn fetch(&self, key: &IdentifierKey) -> Result<ResolvedName, Cancelled> {
        if self.cancel.is_cancelled() {
            return Err(Cancelled);
        }
        let permit = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(Cancelled),
            permit = self.limiter.acquire() => permit.map_err(|_| Cancelled)?,
        };

        self.counters.issued.fetch_add(1, Ordering::Relaxed);
        debug!(key = %key, "Looking up identifier");

        let outcome = match key.kind() {
            IdentifierKind::User => self.lookup.user_info(key.id()).await.map(Lookup::Name),
            IdentifierKind::Team => self.lookup.team_info(key.id()).await.map(Lookup::Name),
            IdentifierKind::Channel => {
                self.lookup.channel_info(key.id()).await.map(|info| match info.im_user {
                    Some(user) => Lookup::DirectWith(user),
                    None => Lookup::Name(info.name.unwrap_or_default()),
                })
            }
        };
        // The nested DM lookup below takes its own permit.
        drop(permit);

        match outcome {
            Ok(Lookup::Name(name)) => {
                let resolved = ResolvedName::resolved(key.clone(), name);
                if !resolved.is_resolved() {
                    self.counters.failed.fetch_add(1, Ordering::Relaxed);
                    debug!(key = %key, "Identifier resolved to a blank name");
                }
                Ok(resolved)
            }
            Ok(Lookup::DirectWith(user)) => {
                let user = self.resolve_boxed(IdentifierKey::user(user)).await;
                Ok(match user.display() {
                    Some(handle) => ResolvedName::resolved(key.clone(), format!("@{handle}")),
                    None => ResolvedName::failed(key.clone()),
                })
            }
            Err(err) => {
                self.record_failure(key, &err);
                Ok(ResolvedName::failed(key.clone()))
            }
        }
    }

    fn record_failure(&self, key: &IdentifierKey, err: &LookupError) {
        self.counters.failed.fetch_add(1, Ordering::Relaxed);
        if err.is_transport() {
            self.counters
                .transport_failures
                .fetch_add(1, Ordering::Relaxed);
            warn!(key = %key, error = %err, "Identifier lookup failed");
        } else {
            debug!(key = %key, error = %err, "Identifier not resolvable");
        }
    }
}

enum Lookup {
    Name(String),
    DirectWith(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ChannelInfo;
    use async_trait::async_trait;

    #[derive(Default)]
    struct Canned {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SlackLookup for Canned {
        async fn user_info(&self, user_id: &str) -> Result<String, LookupError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match user_id {
                "U2" => Ok("bob".to_string()),
                "UBLANK" => Ok(String::new()),
                "UDOWN" => Err(LookupError::Transport("connection refused".into())),
                other => Err(LookupError::NotFound(other.to_string())),
            }
        }

        async fn channel_info(&self, channel_id: &str) -> Result<ChannelInfo, LookupError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match channel_id {
                "C1" => Ok(ChannelInfo::named("general")),
                "D1" => Ok(ChannelInfo::direct("U2")),
                "D2" => Ok(ChannelInfo::direct("U404")),
                other => Err(LookupError::Forbidden(other.to_string())),
            }
        }

        async fn team_info(&self, _team_id: &str) -> Result<String, LookupError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok("Acme".to_string())
        }
    }

    fn cache() -> (Arc<Canned>, ResolverCache) {
        let lookup = Arc::new(Canned::default());
        let cache = ResolverCache::new(lookup.clone(), 4);
        (lookup, cache)
    }

    #[tokio::test]
    async fn test_resolve_is_idempotent() {
        let (lookup, cache) = cache();
        let key = IdentifierKey::user("U2");

        assert_eq!(cache.resolve(&key).await.display(), Some("bob"));
        assert_eq!(cache.resolve(&key).await.display(), Some("bob"));
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failures_are_cached() {
        let (lookup, cache) = cache();
        let key = IdentifierKey::user("U404");

        let first = cache.resolve(&key).await;
        let second = cache.resolve(&key).await;
        assert!(!first.is_resolved());
        assert_eq!(second.display_or_id(), "U404");
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats().failed, 1);
        assert!(!cache.stats().is_total_outage());
    }

    #[tokio::test]
    async fn test_blank_name_falls_back() {
        let (_, cache) = cache();
        let name = cache.resolve(&IdentifierKey::user("UBLANK")).await;
        assert_eq!(name.display_or_id(), "UBLANK");
    }

    #[tokio::test]
    async fn test_direct_message_channel_uses_handle() {
        let (lookup, cache) = cache();
        cache
            .prefetch([IdentifierKey::channel("D1"), IdentifierKey::user("U2")])
            .await;

        assert_eq!(cache.peek(&IdentifierKey::channel("D1")).display(), Some("@bob"));
        // channel info + one shared user lookup
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 2);

        let unknown = cache.resolve(&IdentifierKey::channel("D2")).await;
        assert_eq!(unknown.display_or_id(), "D2");
    }

    #[tokio::test]
    async fn test_team_lookup() {
        let (_, cache) = cache();
        let name = cache.resolve(&IdentifierKey::team("T1")).await;
        assert_eq!(name.display(), Some("Acme"));
    }

    #[tokio::test]
    async fn test_peek_unresolved_is_failure() {
        let (lookup, cache) = cache();
        let name = cache.peek(&IdentifierKey::user("U2"));
        assert!(!name.is_resolved());
        assert!(!cache.contains(&IdentifierKey::user("U2")));
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cancelled_cache_issues_nothing() {
        let (lookup, cache) = cache();
        cache.cancel();

        let name = cache.resolve(&IdentifierKey::user("U2")).await;
        assert_eq!(name.display_or_id(), "U2");
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 0);
        assert!(!cache.contains(&IdentifierKey::user("U2")));
    }

    #[tokio::test]
    async fn test_total_outage_detection() {
        let (_, cache) = cache();
        cache.resolve(&IdentifierKey::user("UDOWN")).await;
        let stats = cache.stats();
        assert_eq!(stats.issued, 1);
        assert_eq!(stats.transport_failures, 1);
        assert!(stats.is_total_outage());
    }

    #[test]
    fn test_empty_stats_are_not_outage() {
        assert!(!LookupStats::default().is_total_outage());
    }
}
