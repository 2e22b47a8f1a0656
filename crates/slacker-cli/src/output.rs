// ABOUTME: Text and JSON rendering of enriched views and the authenticated identity.
// ABOUTME: Text is one line per item; JSON is the view with counts alongside.

use crate::error::Result;
use crate::slack::Identity;
use chrono::{DateTime, Local, TimeZone};
use clap::ValueEnum;
use serde::Serialize;
use slacker_core::{ConversationKind, Direction, EnrichedItem, View};

/// Output format selected with `--output`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Format {
    #[default]
    Text,
    Json,
}

/// Which command produced a view, for the empty-result message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subject {
    Activity,
    Dms,
}

const UNREAD: &str = "•";

/// JSON body for a view.
#[derive(Serialize)]
struct ViewJson<'a> {
    #[serde(flatten)]
    view: &'a View,
    count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    direct: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    group: Option<usize>,
}

pub fn render_view(view: &View, subject: Subject, format: Format) -> Result<String> {
    match format {
        Format::Json => {
            let dms = subject == Subject::Dms;
            let body = ViewJson {
                view,
                count: view.items.len(),
                direct: dms.then(|| view.count_conversation(ConversationKind::Direct)),
                group: dms.then(|| view.count_conversation(ConversationKind::Group)),
            };
            Ok(serde_json::to_string_pretty(&body)?)
        }
        Format::Text => Ok(render_text(view, subject, &Local)),
    }
}

pub fn render_identity(identity: &Identity, format: Format) -> Result<String> {
    match format {
        Format::Json => Ok(serde_json::to_string_pretty(identity)?),
        Format::Text => {
            let mut out = format!(
                "@{} ({}) on {} ({})",
                identity.user, identity.user_id, identity.team, identity.team_id
            );
            if !identity.url.is_empty() {
                out.push('\n');
                out.push_str(&identity.url);
            }
            Ok(out)
        }
    }
}

/// Text rendering with timestamps shown in `zone`.
pub fn render_text<Tz: TimeZone>(view: &View, subject: Subject, zone: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    if view.items.is_empty() {
        let mut out = match subject {
            Subject::Activity => "No activity matched.".to_string(),
            Subject::Dms => "No direct messages matched.".to_string(),
        };
        push_skipped(&mut out, view.skipped);
        return out;
    }

    let mut lines: Vec<String> = view.items.iter().map(|item| line(item, zone)).collect();
    let mut footer = String::new();
    if subject == Subject::Dms {
        footer.push_str(&format!(
            "\n{} individual + {} group",
            view.count_conversation(ConversationKind::Direct),
            view.count_conversation(ConversationKind::Group)
        ));
    }
    push_skipped(&mut footer, view.skipped);
    lines.extend(footer.lines().filter(|l| !l.is_empty()).map(str::to_string));
    lines.join("\n")
}

fn line<Tz: TimeZone>(item: &EnrichedItem, zone: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let time = item
        .ts
        .to_datetime()
        .map(|at| clock(&at.with_timezone(zone)))
        .unwrap_or_else(|| "--:--".to_string());

    let mut out = String::new();
    if item.unread {
        out.push_str(UNREAD);
        out.push(' ');
    }
    out.push_str(&time);
    out.push(' ');
    match item.direction {
        Some(Direction::Outgoing) => out.push_str("→ "),
        Some(Direction::Incoming) => out.push_str("← "),
        None => {}
    }
    out.push_str(&channel_label(&item.channel));
    if let Some(user) = &item.username {
        out.push_str(" @");
        out.push_str(user);
    }
    if let Some(reaction) = &item.reaction {
        out.push_str(" reacted ");
        out.push_str(reaction);
    }
    if !item.message.is_empty() {
        out.push_str(": ");
        out.push_str(&item.message);
    }
    out
}

fn clock<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.format("%H:%M").to_string()
}

/// DM channels already read "@handle"; everything else gets a '#'.
fn channel_label(channel: &str) -> String {
    if channel.starts_with('@') {
        channel.to_string()
    } else {
        format!("#{channel}")
    }
}

fn push_skipped(out: &mut String, skipped: usize) {
    if skipped > 0 {
        out.push_str(&format!("\n({skipped} skipped)"));
    }
}
