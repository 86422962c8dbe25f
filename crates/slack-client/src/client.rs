//! Slack Web API HTTP client.

use crate::error::SlackError;
use crate::types::*;
use reqwest::{Client, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Slack Web API client authenticated with a bot token.
///
/// The token is held as a `SecretString` so it never shows up in debug
/// output.
#[derive(Clone)]
pub struct SlackClient {
    client: Client,
    api_base: String,
    token: SecretString,
}

impl SlackClient {
    /// Create a client for `api_base`, normally `https://slack.com/api`.
    pub fn new(
        api_base: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, SlackError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token: SecretString::new(token.into()),
        })
    }

    fn url(&self, method: &str) -> String {
        format!("{}/{}", self.api_base, method)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(
            "Authorization",
            format!("Bearer {}", self.token.expose_secret()),
        )
    }

    /// Post a message, optionally into a thread.
    #[instrument(skip(self, message), fields(channel = %message.channel, thread_ts = ?message.thread_ts))]
    pub async fn post_message(
        &self,
        message: &PostMessage,
    ) -> Result<PostMessageResponse, SlackError> {
        let request = self
            .authorized(self.client.post(self.url(CHAT_POST_MESSAGE)))
            .json(message);
        let response: PostMessageResponse = self.execute(request, CHAT_POST_MESSAGE).await?;
        if !response.ok {
            return Err(api_error(CHAT_POST_MESSAGE, response.error));
        }
        debug!("Posted message ts={:?}", response.ts);
        Ok(response)
    }

    /// Most recent `limit` messages of a channel, newest first.
    #[instrument(skip(self))]
    pub async fn conversation_history(
        &self,
        channel: &str,
        limit: u32,
    ) -> Result<Vec<HistoryMessage>, SlackError> {
        let limit = limit.to_string();
        let request = self
            .authorized(self.client.get(self.url(CONVERSATIONS_HISTORY)))
            .query(&[("channel", channel), ("limit", limit.as_str())]);
        let response: HistoryResponse = self.execute(request, CONVERSATIONS_HISTORY).await?;
        if !response.ok {
            return Err(api_error(CONVERSATIONS_HISTORY, response.error));
        }
        Ok(response.messages)
    }

    /// Timestamp of the newest message in `channel`, reading at most
    /// `limit` messages.
    pub async fn latest_message_ts(
        &self,
        channel: &str,
        limit: u32,
    ) -> Result<Option<String>, SlackError> {
        Ok(self
            .conversation_history(channel, limit)
            .await?
            .into_iter()
            .next()
            .map(|m| m.ts))
    }

    /// Look up a user by id.
    #[instrument(skip(self))]
    pub async fn user_info(&self, user_id: &str) -> Result<User, SlackError> {
        let request = self
            .authorized(self.client.get(self.url(USERS_INFO)))
            .query(&[("user", user_id)]);
        let response: UserInfoResponse = self.execute(request, USERS_INFO).await?;
        match (response.ok, response.user) {
            (true, Some(user)) => Ok(user),
            (_, _) => Err(api_error(USERS_INFO, response.error)),
        }
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        method: &'static str,
    ) -> Result<T, SlackError> {
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            warn!("Rate limited on {}", method);
            return Err(SlackError::RateLimit);
        }
        if !status.is_success() {
            return Err(SlackError::Status {
                method,
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(SlackError::from)
    }
}

fn api_error(method: &'static str, error: Option<String>) -> SlackError {
    SlackError::Api {
        method,
        error: error.unwrap_or_else(|| "unknown error".into()),
    }
}
