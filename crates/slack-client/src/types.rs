//! Slack Web API types.

use serde::{Deserialize, Serialize};

pub const CHAT_POST_MESSAGE: &str = "chat.postMessage";
pub const CONVERSATIONS_HISTORY: &str = "conversations.history";
pub const USERS_INFO: &str = "users.info";

/// Body of `chat.postMessage`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostMessage {
    pub channel: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_ts: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_broadcast: Option<bool>,
}

impl PostMessage {
    pub fn new(channel: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            text: text.into(),
            thread_ts: None,
            reply_broadcast: None,
        }
    }

    /// Reply inside the thread anchored at `ts`.
    pub fn in_thread(mut self, ts: impl Into<String>) -> Self {
        self.thread_ts = Some(ts.into());
        self
    }

    /// Also show a thread reply in the channel.
    pub fn broadcast(mut self) -> Self {
        self.reply_broadcast = Some(true);
        self
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostMessageResponse {
    pub ok: bool,
    pub channel: Option<String>,
    pub ts: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct HistoryMessage {
    pub ts: String,
    pub user: Option<String>,
    pub text: Option<String>,
    pub thread_ts: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryResponse {
    pub ok: bool,
    #[serde(default)]
    pub messages: Vec<HistoryMessage>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserProfile {
    pub real_name: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: String,
    pub name: Option<String>,
    pub real_name: Option<String>,
    pub profile: Option<UserProfile>,
}

impl User {
    /// Best available human name: `real_name`, then profile, then handle.
    pub fn display(&self) -> Option<&str> {
        self.real_name
            .as_deref()
            .or_else(|| self.profile.as_ref().and_then(|p| p.real_name.as_deref()))
            .or(self.name.as_deref())
            .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserInfoResponse {
    pub ok: bool,
    pub user: Option<User>,
    pub error: Option<String>,
}
