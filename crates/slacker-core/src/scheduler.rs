// ABOUTME: Enrichment pass: gather referenced identifiers, resolve them in one wave, render.
// ABOUTME: Output order matches input order; per-identifier failures degrade to raw ids.

use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::emoji;
use crate::error::{EnrichError, Result};
use crate::ident::IdentifierKey;
use crate::markup::{self, RenderMode, Token, PREVIEW_LEN};
use crate::record::{EnrichedItem, RawRecord, View};
use crate::resolver::ResolverCache;

/// Tuning for an enrichment pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnrichOptions {
    /// Preview length in grapheme clusters.
    pub preview_len: usize,
    /// Give up on outstanding calls this long after the pass started and
    /// render with whatever has resolved. Covers loading and resolution.
    pub time_budget: Option<Duration>,
}

impl Default for EnrichOptions {
    fn default() -> Self {
        Self {
            preview_len: PREVIEW_LEN,
            time_budget: None,
        }
    }
}

/// Turns raw records into display-ready items using a shared resolver cache.
pub struct Enricher<'a> {
    cache: &'a ResolverCache,
    options: EnrichOptions,
    started: Instant,
}

impl<'a> Enricher<'a> {
    pub fn new(cache: &'a ResolverCache) -> Self {
        Self {
            cache,
            options: EnrichOptions::default(),
            started: Instant::now(),
        }
    }

    pub fn with_options(mut self, options: EnrichOptions) -> Self {
        self.options = options;
        self
    }

    pub fn cache(&self) -> &'a ResolverCache {
        self.cache
    }

    /// Enrich `records`, preserving their order.
    ///
    /// Fails only when every upstream lookup failed to reach the service.
    pub async fn enrich(&self, records: &[RawRecord]) -> Result<Vec<EnrichedItem>> {
        Ok(self.enrich_view(records).await?.items)
    }

    /// Enrich `records` and report how many identifiers fell back to raw ids.
    pub async fn enrich_view(&self, records: &[RawRecord]) -> Result<View> {
        let tokenized: Vec<Vec<Token>> = records
            .iter()
            .map(|record| markup::tokenize(&record.text))
            .collect();

        let keys = referenced_keys(records, &tokenized);
        let distinct = keys.len();
        info!(records = records.len(), identifiers = distinct, "Enriching records");

        self.resolve_all(keys.iter().cloned()).await;

        let stats = self.cache.stats();
        if stats.is_total_outage() {
            return Err(EnrichError::Unavailable(format!(
                "all {} identifier lookups failed",
                stats.issued
            )));
        }

        let degraded = keys
            .iter()
            .filter(|key| !self.cache.peek(key).is_resolved())
            .count();
        if degraded > 0 {
            warn!(degraded, "Some identifiers could not be resolved; showing raw ids");
        }

        let items = records
            .iter()
            .zip(&tokenized)
            .map(|(record, tokens)| self.assemble(record, tokens))
            .collect();

        Ok(View {
            items,
            skipped: 0,
            degraded,
        })
    }

    /// Drive `work` to completion. Once the time budget is spent the cache is
    /// cancelled, so `work` winds down with whatever it already has.
    pub async fn within_budget<F: Future>(&self, work: F) -> F::Output {
        let Some(budget) = self.options.time_budget else {
            return work.await;
        };
        if self.cache.cancellation().is_cancelled() {
            return work.await;
        }
        tokio::pin!(work);
        tokio::select! {
            out = &mut work => out,
            _ = tokio::time::sleep_until(self.started + budget) => {
                warn!(budget_ms = budget.as_millis() as u64, "Time budget exhausted");
                self.cache.cancel();
                work.await
            }
        }
    }

    async fn resolve_all<I>(&self, keys: I)
    where
        I: IntoIterator<Item = IdentifierKey>,
    {
        let wave = self.cache.prefetch(keys);
        let cancel = self.cache.cancellation().clone();
        self.within_budget(async {
            tokio::select! {
                _ = wave => {}
                _ = cancel.cancelled() => debug!("Enrichment cancelled"),
            }
        })
        .await
    }

    /// Build one item from cache state. No I/O happens here.
    fn assemble(&self, record: &RawRecord, tokens: &[Token]) -> EnrichedItem {
        let lookup = |key: &IdentifierKey| self.cache.peek(key);

        let channel = self.cache.peek(&record.channel_key());
        let username = record
            .actor
            .as_ref()
            .map(|actor| self.cache.peek(actor).display_or_id().to_string());
        let reaction = record
            .reaction
            .as_ref()
            .map(|code| emoji::glyph(code).unwrap_or_else(|| format!(":{code}:")));

        EnrichedItem {
            kind: record.kind,
            ts: record.ts.clone(),
            channel_id: record.channel_id.clone(),
            channel: channel.display_or_id().to_string(),
            username,
            message: markup::render_tokens(
                tokens,
                lookup,
                RenderMode::Preview(self.options.preview_len),
            ),
            text: markup::render_tokens(tokens, lookup, RenderMode::Full),
            unread: record.unread,
            direction: record.direction,
            reaction,
            conversation: record.conversation,
        }
    }
}

/// Every distinct identifier a batch needs: actors, channels, inline references.
fn referenced_keys(records: &[RawRecord], tokenized: &[Vec<Token>]) -> Vec<IdentifierKey> {
    let mut seen = HashSet::new();
    let mut keys = Vec::new();
    for (record, tokens) in records.iter().zip(tokenized) {
        let candidates = std::iter::once(record.channel_key())
            .chain(record.actor.clone())
            .chain(markup::references(tokens));
        for key in candidates {
            if seen.insert(key.clone()) {
                keys.push(key);
            }
        }
    }
    keys
}
