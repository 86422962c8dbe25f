//! Common test utilities for integration tests.

use cloud_bot::commands::{build_tree, Services};
use cloud_bot::config::{Config, WorkerKind};
use cloud_bot::{CommandWorker, Dispatcher, HelpWorker, MessageHandler, ResponseRouter};
use ops_client::OpsClient;
use slack_client::SlackClient;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use topic_broker::{Broker, MemoryBroker};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const EXCHANGE: &str = "cloud_bot";

/// Mock Slack and operations servers for one test.
pub struct Servers {
    pub slack: MockServer,
    pub ops: MockServer,
}

impl Servers {
    pub async fn start() -> Self {
        Self {
            slack: MockServer::start().await,
            ops: MockServer::start().await,
        }
    }

    pub fn config(&self, kind: &str, extra: &[(&str, &str)]) -> Config {
        let mut vars: HashMap<String, String> = HashMap::new();
        vars.insert("WORKER__KIND".into(), kind.into());
        vars.insert("SLACK__BOT_TOKEN".into(), "xoxb-test".into());
        vars.insert("SLACK__API_BASE".into(), self.slack.uri());
        vars.insert("OPS__BASE_URL".into(), self.ops.uri());
        vars.insert("GCLOUD__DEFAULT_PROJECT".into(), "demo".into());
        for (k, v) in extra {
            vars.insert(k.to_string(), v.to_string());
        }
        Config::from_env(config::Environment::default().source(Some(vars))).unwrap()
    }

    /// Accept every post and report an empty channel history.
    pub async fn mount_slack(&self, latest_ts: Option<&str>) {
        Mock::given(method("POST"))
            .and(path("/chat.postMessage"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "ok": true })))
            .mount(&self.slack)
            .await;

        let messages = match latest_ts {
            Some(ts) => serde_json::json!([{ "ts": ts }]),
            None => serde_json::json!([]),
        };
        Mock::given(method("GET"))
            .and(path("/conversations.history"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "messages": messages
            })))
            .mount(&self.slack)
            .await;
    }

    /// Bodies of every `chat.postMessage` call, in arrival order.
    pub async fn posted(&self) -> Vec<serde_json::Value> {
        self.slack
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|r| r.url.path() == "/chat.postMessage")
            .map(|r| serde_json::from_slice(&r.body).unwrap())
            .collect()
    }
}

/// Broker payload for `user_cmd` sent in channel `C1`.
pub fn channel_event(user_cmd: &str) -> serde_json::Value {
    serde_json::json!({
        "event": {
            "user_cmd": user_cmd,
            "user": "U1",
            "channel": "C1",
            "ts": "100.0",
            "event_ts": "100.0"
        }
    })
}

/// Build the worker described by `config`, deliver `messages` through an
/// in-memory broker and process them all.
pub async fn run_worker(config: &Config, messages: &[(&str, serde_json::Value)]) {
    let slack = SlackClient::new(&config.slack.api_base, "xoxb-test", Duration::from_secs(5)).unwrap();
    let ops = OpsClient::new(&config.ops.base_url, None, Duration::from_secs(5)).unwrap();
    let router = Arc::new(ResponseRouter::new(slack.clone(), config.slack.history_limit()));

    let services = Services::from_config(config, ops, slack);
    let tree = build_tree(config, &services).unwrap();
    let handler: Box<dyn MessageHandler> = match config.worker.kind {
        WorkerKind::Help => Box::new(HelpWorker::new(tree, router)),
        _ => Box::new(CommandWorker::new(tree, router)),
    };

    let broker = Arc::new(MemoryBroker::new());
    let dispatcher = Dispatcher::new(broker.clone(), EXCHANGE, config.worker.binding_key());
    let subscription = dispatcher.bind().await.unwrap();

    for (key, body) in messages {
        broker
            .publish(EXCHANGE, key, &serde_json::to_vec(body).unwrap())
            .await
            .unwrap();
    }
    broker.close();

    // Ends once the queue is drained and the broker is gone.
    assert!(dispatcher.serve(subscription, handler.as_ref()).await.is_err());
}
