//! Reply placement: direct message, thread reply, or broadcast thread reply.

use crate::event::ChatEvent;
use slack_client::{PostMessage, SlackClient, SlackError};
use tracing::{debug, warn};

/// Where a single reply goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutingDecision {
    /// Post straight into the user's direct-message channel.
    DirectToUser { channel: String },
    /// Reply in the thread anchored at `thread_ts`, mirrored to the channel
    /// when `broadcast` is set.
    ThreadReply {
        channel: String,
        thread_ts: String,
        broadcast: bool,
    },
}

impl RoutingDecision {
    pub fn into_message(self, text: impl Into<String>) -> PostMessage {
        match self {
            RoutingDecision::DirectToUser { channel } => PostMessage::new(channel, text),
            RoutingDecision::ThreadReply {
                channel,
                thread_ts,
                broadcast,
            } => {
                let message = PostMessage::new(channel, text).in_thread(thread_ts);
                if broadcast {
                    message.broadcast()
                } else {
                    message
                }
            }
        }
    }
}

/// Pick the destination for a reply.
///
/// `latest_ts` is the newest message in the channel, when a freshness check
/// was made. A long job whose trigger is no longer the newest message is
/// anchored on the trigger's `ts`; everything else in a channel is anchored
/// on `event_ts`.
pub fn decide(
    event: &ChatEvent,
    long_job: bool,
    broadcast: bool,
    latest_ts: Option<&str>,
) -> RoutingDecision {
    if event.is_direct_message() {
        return RoutingDecision::DirectToUser {
            channel: event.channel.clone(),
        };
    }

    let stale = long_job && latest_ts.is_some_and(|latest| latest != event.ts);
    let thread_ts = if stale {
        event.ts.clone()
    } else {
        event.event_ts().to_string()
    };

    RoutingDecision::ThreadReply {
        channel: event.channel.clone(),
        thread_ts,
        broadcast,
    }
}

/// Delivers replies through the Slack Web API.
pub struct ResponseRouter {
    slack: SlackClient,
    history_limit: u32,
}

impl ResponseRouter {
    pub fn new(slack: SlackClient, history_limit: u32) -> Self {
        Self {
            slack,
            history_limit: history_limit.max(1),
        }
    }

    /// Route and post `text`. A rejected post is returned as an error and
    /// never retried.
    pub async fn send(
        &self,
        text: &str,
        event: &ChatEvent,
        long_job: bool,
        broadcast: bool,
    ) -> Result<RoutingDecision, SlackError> {
        let latest = if long_job && !event.is_direct_message() {
            self.latest_ts(&event.channel).await
        } else {
            None
        };

        let decision = decide(event, long_job, broadcast, latest.as_deref());
        debug!(?decision, "Routing reply");

        self.slack
            .post_message(&decision.clone().into_message(text))
            .await?;
        Ok(decision)
    }

    // A failed check counts as fresh.
    async fn latest_ts(&self, channel: &str) -> Option<String> {
        match self
            .slack
            .latest_message_ts(channel, self.history_limit)
            .await
        {
            Ok(ts) => ts,
            Err(e) => {
                warn!(channel = %channel, "Freshness check failed: {}", e);
                None
            }
        }
    }
}
