//! Broker payload carrying one chat event.

use serde::{Deserialize, Serialize};

/// Message body published on the exchange: `{"event": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerMessage {
    pub event: ChatEvent,
}

impl BrokerMessage {
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }
}

/// The chat event that triggered a command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEvent {
    /// Raw command text, e.g. `storage copy gs://a gs://b`
    pub user_cmd: String,
    pub user: String,
    pub channel: String,
    /// Timestamp of the triggering message
    pub ts: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_ts: Option<String>,
    /// `im` for direct messages, absent for channels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_type: Option<String>,
}

impl ChatEvent {
    pub fn is_direct_message(&self) -> bool {
        self.channel_type.as_deref() == Some("im")
    }

    /// Default thread anchor. Falls back to `ts` when the platform omits it.
    pub fn event_ts(&self) -> &str {
        self.event_ts.as_deref().unwrap_or(&self.ts)
    }
}
