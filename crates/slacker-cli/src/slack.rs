// ABOUTME: Slack web API client authenticated with a session token and `d` cookie.
// ABOUTME: Implements the name lookups and record sources the enrichment engine needs.

use crate::config::SlackConfig;
use crate::error::{CliError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use slacker_core::feed::{ActivityItem, Conversation, ConversationKind, HistoryMessage};
use slacker_core::{ActivityTab, ChannelInfo, LookupError, RecordSource, SlackLookup, Ts};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info};
use url::Url;

const SLACK_API: &str = "https://slack.com";
const FEED_LIMIT: &str = "50";
const HISTORY_LIMIT: &str = "200";
const DM_LIMIT: &str = "250";

/// Result of `auth.test`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub team: String,
    #[serde(default)]
    pub team_id: String,
    #[serde(default)]
    pub url: String,
}

/// Slack web API client.
pub struct SlackClient {
    http: reqwest::Client,
    token: String,
    cookie: String,
    api_base: Url,
    workspace: Option<Url>,
    identity: OnceCell<Identity>,
}

impl SlackClient {
    pub fn new(config: &SlackConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| CliError::Config(format!("Failed to create HTTP client: {}", e)))?;

        let workspace = config
            .workspace_url
            .as_deref()
            .map(api_root)
            .transpose()?;

        Ok(Self {
            http,
            token: config.token.clone(),
            cookie: config.cookie.clone(),
            api_base: api_root(SLACK_API)?,
            workspace,
            identity: OnceCell::new(),
        })
    }

    /// Send general API calls to `base` instead of slack.com.
    pub fn with_api_base(mut self, base: &str) -> Result<Self> {
        self.api_base = api_root(base)?;
        Ok(self)
    }

    /// Who the credentials belong to. Cached after the first call.
    pub async fn identity(&self) -> std::result::Result<&Identity, LookupError> {
        self.identity
            .get_or_try_init(|| async {
                let response = self.call("auth.test", &[]).await?;
                let identity: Identity = serde_json::from_value(response)
                    .map_err(|e| LookupError::Api(format!("auth.test: {}", e)))?;
                info!(user = %identity.user, team = %identity.team, "Authenticated");
                Ok::<_, LookupError>(identity)
            })
            .await
    }

    /// Base for enterprise-only methods like `activity.feed`.
    async fn workspace_base(&self) -> std::result::Result<Url, LookupError> {
        if let Some(workspace) = &self.workspace {
            return Ok(workspace.clone());
        }
        let identity = self.identity().await?;
        if identity.url.is_empty() {
            return Ok(self.api_base.clone());
        }
        api_root(&identity.url).map_err(|e| LookupError::Api(e.to_string()))
    }

    async fn call(
        &self,
        method: &str,
        params: &[(&str, &str)],
    ) -> std::result::Result<Value, LookupError> {
        self.call_at(&self.api_base, method, params).await
    }

    /// POST a form-encoded API call and unwrap Slack's `ok` envelope.
    async fn call_at(
        &self,
        base: &Url,
        method: &str,
        params: &[(&str, &str)],
    ) -> std::result::Result<Value, LookupError> {
        let url = base
            .join(method)
            .map_err(|e| LookupError::Transport(format!("{}: {}", method, e)))?;
        debug!(method, "Calling Slack");

        let response = self
            .http
            .post(url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Cookie", format!("d={}", self.cookie))
            .form(params)
            .send()
            .await
            .map_err(|e| LookupError::Transport(format!("{}: {}", method, e)))?;

        let status = response.status();
        if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("?")
                .to_string();
            return Err(LookupError::Transport(format!(
                "{}: rate limited (retry after {}s)",
                method, retry_after
            )));
        }
        if !status.is_success() {
            return Err(LookupError::Transport(format!("{}: HTTP {}", method, status)));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| LookupError::Transport(format!("{}: invalid response: {}", method, e)))?;

        if body.get("ok").and_then(Value::as_bool) == Some(true) {
            Ok(body)
        } else {
            let code = body
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown_error");
            Err(api_error(method, code))
        }
    }
}

/// Map a Slack `error` code onto the lookup taxonomy.
pub fn api_error(method: &str, code: &str) -> LookupError {
    let detail = format!("{}: {}", method, code);
    match code {
        "user_not_found" | "channel_not_found" | "team_not_found" => LookupError::NotFound(detail),
        "not_authed" | "invalid_auth" | "missing_scope" | "access_denied" | "not_in_channel" => {
            LookupError::Forbidden(detail)
        }
        _ => LookupError::Api(detail),
    }
}

/// `https://acme.slack.com` -> `https://acme.slack.com/api/`
fn api_root(base: &str) -> Result<Url> {
    let trimmed = base.trim().trim_end_matches('/');
    Url::parse(&format!("{}/api/", trimmed))
        .map_err(|e| CliError::Config(format!("Invalid Slack URL '{}': {}", base, e)))
}

fn str_field<'a>(value: &'a Value, pointer: &str) -> Option<&'a str> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

fn messages(body: Value) -> std::result::Result<Vec<HistoryMessage>, LookupError> {
    let messages = body.get("messages").cloned().unwrap_or(Value::Array(vec![]));
    serde_json::from_value(messages)
        .map_err(|e| LookupError::Api(format!("conversations.history: {}", e)))
}

/// Turn one `ims`/`mpims` entry of `client.dms` into a conversation.
fn conversation(entry: &Value, kind: ConversationKind) -> Option<Conversation> {
    let id = str_field(entry, "/id")?.to_string();
    let latest = str_field(entry, "/message/ts")
        .or_else(|| str_field(entry, "/latest/ts"))
        .map(Ts::new);
    Some(Conversation {
        id,
        kind,
        latest,
    })
}

#[async_trait]
impl SlackLookup for SlackClient {
    async fn user_info(&self, user_id: &str) -> std::result::Result<String, LookupError> {
        let body = self.call("users.info", &[("user", user_id)]).await?;
        Ok(str_field(&body, "/user/name")
            .or_else(|| str_field(&body, "/user/profile/display_name"))
            .unwrap_or_default()
            .to_string())
    }

    async fn channel_info(
        &self,
        channel_id: &str,
    ) -> std::result::Result<ChannelInfo, LookupError> {
        let body = self
            .call("conversations.info", &[("channel", channel_id)])
            .await?;
        let is_im = body
            .pointer("/channel/is_im")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        match (is_im, str_field(&body, "/channel/user")) {
            (true, Some(user)) => Ok(ChannelInfo::direct(user)),
            _ => Ok(ChannelInfo::named(
                str_field(&body, "/channel/name").unwrap_or_default(),
            )),
        }
    }

    async fn team_info(&self, team_id: &str) -> std::result::Result<String, LookupError> {
        let body = self.call("team.info", &[("team", team_id)]).await?;
        Ok(str_field(&body, "/team/name").unwrap_or_default().to_string())
    }
}

#[async_trait]
impl RecordSource for SlackClient {
    async fn auth_user_id(&self) -> std::result::Result<String, LookupError> {
        Ok(self.identity().await?.user_id.clone())
    }

    async fn activity_feed(
        &self,
        tab: Option<ActivityTab>,
    ) -> std::result::Result<Vec<ActivityItem>, LookupError> {
        let base = self.workspace_base().await?;
        let params = [
            ("limit", FEED_LIMIT),
            ("types", ActivityTab::feed_types(tab)),
            ("mode", "priority_reads_and_unreads_v1"),
            ("archive_only", "false"),
            ("snooze_only", "false"),
            ("unread_only", "false"),
            ("priority_only", "false"),
            ("is_activity_inbox", "false"),
        ];
        let body = self.call_at(&base, "activity.feed", &params).await?;
        let items = body.get("items").cloned().unwrap_or(Value::Array(vec![]));
        serde_json::from_value(items).map_err(|e| LookupError::Api(format!("activity.feed: {}", e)))
    }

    async fn message_text(
        &self,
        channel_id: &str,
        ts: &Ts,
    ) -> std::result::Result<Option<String>, LookupError> {
        let params = [
            ("channel", channel_id),
            ("latest", ts.as_str()),
            ("inclusive", "true"),
            ("limit", "1"),
        ];
        let body = self.call("conversations.history", &params).await?;
        Ok(messages(body)?
            .into_iter()
            .next()
            .map(|message| message.display_text())
            .filter(|text| !text.is_empty()))
    }

    async fn conversations(&self) -> std::result::Result<Vec<Conversation>, LookupError> {
        let base = self.workspace_base().await?;
        let params = [
            ("count", DM_LIMIT),
            ("include_closed", "true"),
            ("include_channel", "true"),
            ("exclude_bots", "true"),
            ("priority_mode", "priority"),
        ];
        let body = self.call_at(&base, "client.dms", &params).await?;

        let list = |field: &str, kind| -> Vec<Conversation> {
            body.get(field)
                .and_then(Value::as_array)
                .map(|entries| entries.iter().filter_map(|e| conversation(e, kind)).collect())
                .unwrap_or_default()
        };
        let mut all = list("ims", ConversationKind::Direct);
        all.extend(list("mpims", ConversationKind::Group));
        Ok(all)
    }

    async fn history(
        &self,
        channel_id: &str,
        oldest: &Ts,
    ) -> std::result::Result<Vec<HistoryMessage>, LookupError> {
        let params = [
            ("channel", channel_id),
            ("oldest", oldest.as_str()),
            ("inclusive", "true"),
            ("limit", HISTORY_LIMIT),
        ];
        let body = self.call("conversations.history", &params).await?;
        messages(body)
    }
}
