// ABOUTME: The slacker subcommands and their execution.
// ABOUTME: Arguments are validated before any network call.
// ABOUTME: Views are enriched through one shared cache.

use crate::config::Config;
use crate::error::Result;
use crate::output::{self, Format, Subject};
use crate::since::parse_since;
use crate::slack::SlackClient;
use chrono::{DateTime, TimeZone};
use clap::Subcommand;
use slacker_core::{
    activity_view, dms_view, ActivityTab, EnrichOptions, Enricher, RecordSource, ResolverCache,
    SlackLookup, Ts, View,
};
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Subcommands of the `slacker` binary.
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Show the activity feed (mentions, threads, reactions)
    Activity {
        /// Which tab to show: all, mentions, threads, reactions
        #[arg(long, default_value = "all")]
        tab: String,
    },
    /// List direct messages since a point in time
    Dms {
        /// Lower bound, e.g. "today", "3 days ago", "2025-10-20"
        #[arg(long, default_value = "today")]
        since: String,
    },
    /// Show who the configured credentials belong to
    Whoami,
}

/// A command with its arguments parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    View(ViewRequest),
    Whoami,
}

/// The commands that produce an enriched view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewRequest {
    Activity(Option<ActivityTab>),
    Dms(Ts),
}

impl Command {
    /// Parse arguments relative to `now`. Fails with a usage error before
    /// anything touches the network.
    pub fn prepare<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Result<Request> {
        Ok(match self {
            Command::Activity { tab } => {
                Request::View(ViewRequest::Activity(ActivityTab::parse(tab)?))
            }
            Command::Dms { since } => {
                let since = Ts::from_datetime(&parse_since(since, now)?);
                Request::View(ViewRequest::Dms(since))
            }
            Command::Whoami => Request::Whoami,
        })
    }
}

/// Run `command` against Slack and return the rendered output.
pub async fn execute(command: &Command, config: &Config, format: Format) -> Result<String> {
    let request = command.prepare(&chrono::Local::now())?;
    let client = Arc::new(SlackClient::new(&config.slack)?);

    let request = match request {
        Request::View(request) => request,
        Request::Whoami => {
            let identity = client.identity().await?;
            return output::render_identity(identity, format);
        }
    };

    let cancel = CancellationToken::new();
    let interrupted = {
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted; showing what has resolved so far");
                cancel.cancel();
            }
        }
    };

    let lookup: Arc<dyn SlackLookup> = client.clone();
    let (subject, view) = run_request(
        client.as_ref(),
        lookup,
        &request,
        config.enrich.concurrency,
        config.enrich.options(),
        cancel,
        interrupted,
    )
    .await?;
    output::render_view(&view, subject, format)
}

/// Build the view for `request`.
///
/// `interrupt` resolving cancels outstanding lookups; the view is still
/// assembled from whatever resolved.
pub async fn run_request<F>(
    source: &dyn RecordSource,
    lookup: Arc<dyn SlackLookup>,
    request: &ViewRequest,
    concurrency: usize,
    options: EnrichOptions,
    cancel: CancellationToken,
    interrupt: F,
) -> Result<(Subject, View)>
where
    F: Future<Output = ()>,
{
    let cache = ResolverCache::new(lookup, concurrency).with_cancellation(cancel);
    let enricher = Enricher::new(&cache).with_options(options);

    let work = async {
        match request {
            ViewRequest::Activity(tab) => activity_view(source, *tab, &enricher)
                .await
                .map(|view| (Subject::Activity, view)),
            ViewRequest::Dms(since) => dms_view(source, since, &enricher)
                .await
                .map(|view| (Subject::Dms, view)),
        }
    };
    tokio::pin!(work);
    tokio::pin!(interrupt);

    let result = tokio::select! {
        result = &mut work => result,
        _ = &mut interrupt => work.await,
    };

    let stats = cache.stats();
    info!(
        lookups = stats.issued,
        failed = stats.failed,
        "Enrichment finished"
    );
    Ok(result?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CliError;
    use chrono::Utc;
    use slacker_core::EnrichError;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 22, 15, 30, 0).unwrap()
    }

    #[test]
    fn test_prepare_activity_tab() {
        let cmd = Command::Activity {
            tab: "threads".into(),
        };
        assert_eq!(
            cmd.prepare(&now()).unwrap(),
            Request::View(ViewRequest::Activity(Some(ActivityTab::Threads)))
        );

        let all = Command::Activity { tab: "all".into() };
        assert_eq!(
            all.prepare(&now()).unwrap(),
            Request::View(ViewRequest::Activity(None))
        );
    }

    #[test]
    fn test_prepare_rejects_bad_tab() {
        let cmd = Command::Activity { tab: "dms".into() };
        assert!(matches!(
            cmd.prepare(&now()),
            Err(CliError::Enrich(EnrichError::InvalidTab(_)))
        ));
    }

    #[test]
    fn test_prepare_dms_since() {
        let cmd = Command::Dms {
            since: "today".into(),
        };
        let midnight = Utc.with_ymd_and_hms(2025, 10, 22, 0, 0, 0).unwrap();
        assert_eq!(
            cmd.prepare(&now()).unwrap(),
            Request::View(ViewRequest::Dms(Ts::from_datetime(&midnight)))
        );

        let bad = Command::Dms {
            since: "whenever".into(),
        };
        assert!(matches!(bad.prepare(&now()), Err(CliError::Usage(_))));
    }

    #[test]
    fn test_prepare_whoami() {
        assert_eq!(Command::Whoami.prepare(&now()).unwrap(), Request::Whoami);
    }
}
