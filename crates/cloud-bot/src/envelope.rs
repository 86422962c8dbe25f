//! Turns one broker delivery into exactly one reply (plus any progress).
//!
//! The envelope decodes the payload, resolves the command, runs the handler
//! and converts every failure into a short warning. Nothing that happens
//! here is fatal to the worker.

use crate::error::AppResult;
use crate::event::{BrokerMessage, ChatEvent};
use crate::router::ResponseRouter;
use async_trait::async_trait;
use command_tree::{
    help, resolve, CommandTree, Emission, ExecContext, HandlerError, ProgressSink,
};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use topic_broker::Delivery;
use tracing::{error, info, instrument, warn};

/// Errors longer than this many lines are cut to a head/tail excerpt.
pub const MAX_DIAGNOSTIC_LINES: usize = 5;

const RESOLUTION_WARNING: &str = ":warning: Something went wrong.";
const HANDLER_WARNING: &str = ":warning: Something went wrong. Please refer help.";
const HELP_WARNING: &str =
    ":warning: Something went wrong. Check help to see if your command is properly formatted.";

/// Consumer of raw deliveries, one call per message.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, delivery: &Delivery) -> AppResult<()>;
}

/// Final result of one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// `None` when the handler already sent everything as progress.
    pub text: Option<String>,
    pub long_job: bool,
    pub broadcast: bool,
}

/// Keep the first two and last two lines of long error text.
pub fn bounded_diagnostic(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    if lines.len() <= MAX_DIAGNOSTIC_LINES {
        return lines.join("\n");
    }
    let mut kept = lines[..2].to_vec();
    kept.push("...");
    kept.extend_from_slice(&lines[lines.len() - 2..]);
    kept.join("\n")
}

fn warning(prefix: &str, detail: &str) -> String {
    format!("{}\n```{}```", prefix, detail)
}

fn diagnostic(err: &HandlerError) -> String {
    match err {
        // Debug output of anyhow carries the cause chain.
        HandlerError::Other(e) => format!("{:?}", e),
        other => other.to_string(),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("handler panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("handler panicked: {}", s)
    } else {
        "handler panicked".into()
    }
}

// Lost replies are logged; the message is already acknowledged.
async fn deliver(
    router: &ResponseRouter,
    text: &str,
    event: &ChatEvent,
    long_job: bool,
    broadcast: bool,
) {
    if let Err(e) = router.send(text, event, long_job, broadcast).await {
        error!(channel = %event.channel, "Failed to deliver reply: {}", e);
    }
}

/// Progress sink that routes each emission as its own reply.
struct RouterSink {
    router: Arc<ResponseRouter>,
    event: ChatEvent,
}

#[async_trait]
impl ProgressSink for RouterSink {
    async fn emit(&self, emission: Emission) {
        deliver(
            &self.router,
            &emission.text,
            &self.event,
            emission.long_job,
            emission.broadcast,
        )
        .await;
    }
}

/// Runs commands for one or more root groups.
pub struct CommandWorker {
    tree: CommandTree,
    router: Arc<ResponseRouter>,
}

impl CommandWorker {
    pub fn new(tree: CommandTree, router: Arc<ResponseRouter>) -> Self {
        Self { tree, router }
    }

    /// Resolve and execute `event.user_cmd`, routing progress as it happens.
    pub async fn execute(&self, event: &ChatEvent) -> Outcome {
        let sink = Arc::new(RouterSink {
            router: self.router.clone(),
            event: event.clone(),
        });
        let mut ctx = ExecContext::new(&event.user, &event.channel, sink);
        run(&self.tree, &event.user_cmd, &mut ctx).await
    }
}

/// Resolve `raw` against `tree` and run the bound handler with `ctx`.
pub async fn run(tree: &CommandTree, raw: &str, ctx: &mut ExecContext) -> Outcome {
    let invocation = match resolve(tree, raw) {
        Ok(invocation) => invocation,
        Err(e) => {
            info!(command = %raw, "Could not resolve command: {}", e);
            return Outcome {
                text: Some(warning(RESOLUTION_WARNING, &e.to_string())),
                long_job: ctx.long_job,
                broadcast: false,
            };
        }
    };

    let command = invocation.command();
    let result = match invocation.node.handler() {
        Some(handler) => {
            let handler = handler.clone();
            AssertUnwindSafe(handler.call(&invocation.args, ctx))
                .catch_unwind()
                .await
                .unwrap_or_else(|payload| {
                    Err(HandlerError::Operation(panic_message(payload)))
                })
        }
        None => Err(HandlerError::Operation(format!(
            "`{}` cannot be run on its own",
            command
        ))),
    };

    match result {
        Ok(text) => Outcome {
            text,
            long_job: ctx.long_job,
            broadcast: ctx.broadcast,
        },
        Err(e) => {
            warn!(command = %command, "Handler failed: {}", e);
            ctx.broadcast = false;
            Outcome {
                text: Some(warning(HANDLER_WARNING, &bounded_diagnostic(&diagnostic(&e)))),
                long_job: ctx.long_job,
                broadcast: false,
            }
        }
    }
}

#[async_trait]
impl MessageHandler for CommandWorker {
    #[instrument(skip(self, delivery), fields(routing_key = %delivery.routing_key))]
    async fn handle(&self, delivery: &Delivery) -> AppResult<()> {
        let message = BrokerMessage::from_slice(&delivery.body)?;
        let event = message.event;
        info!(command = %event.user_cmd, user = %event.user, "Received command");

        let outcome = self.execute(&event).await;
        if let Some(text) = outcome.text {
            deliver(&self.router, &text, &event, outcome.long_job, outcome.broadcast).await;
        }
        Ok(())
    }
}

/// Answers `help ...` for every enabled root.
pub struct HelpWorker {
    tree: CommandTree,
    router: Arc<ResponseRouter>,
}

impl HelpWorker {
    pub fn new(tree: CommandTree, router: Arc<ResponseRouter>) -> Self {
        Self { tree, router }
    }

    pub fn render(&self, raw: &str) -> String {
        match help::render_command(&self.tree, raw) {
            Ok(text) => text,
            Err(e) => {
                info!(command = %raw, "Could not render help: {}", e);
                warning(HELP_WARNING, &e.to_string())
            }
        }
    }
}

#[async_trait]
impl MessageHandler for HelpWorker {
    #[instrument(skip(self, delivery), fields(routing_key = %delivery.routing_key))]
    async fn handle(&self, delivery: &Delivery) -> AppResult<()> {
        let event = BrokerMessage::from_slice(&delivery.body)?.event;
        let text = self.render(&event.user_cmd);
        deliver(&self.router, &text, &event, false, false).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use command_tree::{Args, FnHandler, Group, Handler, HandlerResult, Leaf, ParamSpec, RecordingSink};

    #[test]
    fn test_eight_lines_are_cut_to_head_and_tail() {
        let text = "1\n2\n3\n4\n5\n6\n7\n8";
        assert_eq!(bounded_diagnostic(text), "1\n2\n...\n7\n8");
    }

    #[test]
    fn test_short_errors_are_kept() {
        assert_eq!(bounded_diagnostic("a\nb\nc"), "a\nb\nc");
        assert_eq!(bounded_diagnostic("1\n2\n3\n4\n5"), "1\n2\n3\n4\n5");
        assert_eq!(bounded_diagnostic("1\n2\n3\n4\n5\n6"), "1\n2\n...\n5\n6");
    }

    struct Flaky;

    #[async_trait]
    impl Handler for Flaky {
        async fn call(&self, args: &Args, ctx: &mut ExecContext) -> HandlerResult {
            ctx.long_job = true;
            ctx.broadcast = true;
            ctx.progress("starting").await;
            match args.required_str("mode")? {
                "ok" => Ok(Some("finished".into())),
                "quiet" => Ok(None),
                "chain" => Err(anyhow::anyhow!("root cause")
                    .context("layer one")
                    .context("layer two")
                    .context("layer three")
                    .context("layer four")
                    .into()),
                "panic" => panic!("boom"),
                other => Err(HandlerError::InvalidInput(other.to_string())),
            }
        }
    }

    fn tree() -> CommandTree {
        let mut tree = CommandTree::new();
        tree.register(
            Group::new("job")
                .child(Leaf::new("run", Flaky).param(ParamSpec::argument("mode")))
                .child(Group::new("empty").child(Leaf::new(
                    "x",
                    FnHandler(|_: &Args, _: &mut ExecContext| -> HandlerResult { Ok(None) }),
                ))),
        )
        .unwrap();
        tree
    }

    async fn run_cmd(raw: &str) -> (Outcome, Vec<Emission>) {
        let sink = Arc::new(RecordingSink::new());
        let mut ctx = ExecContext::new("U1", "C1", sink.clone());
        let outcome = run(&tree(), raw, &mut ctx).await;
        (outcome, sink.emissions())
    }

    #[tokio::test]
    async fn test_success_keeps_handler_flags() {
        let (outcome, emissions) = run_cmd("job run ok").await;
        assert_eq!(
            outcome,
            Outcome {
                text: Some("finished".into()),
                long_job: true,
                broadcast: true,
            }
        );
        assert_eq!(emissions.len(), 1);
        assert!(emissions[0].broadcast);
    }

    #[tokio::test]
    async fn test_handler_may_reply_only_through_progress() {
        let (outcome, emissions) = run_cmd("job run quiet").await;
        assert_eq!(outcome.text, None);
        assert_eq!(emissions.len(), 1);
    }

    #[tokio::test]
    async fn test_handler_error_resets_broadcast() {
        let (outcome, _) = run_cmd("job run weird").await;
        assert!(!outcome.broadcast);
        assert!(outcome.long_job);
        assert_eq!(
            outcome.text.unwrap(),
            ":warning: Something went wrong. Please refer help.\n```Invalid input: weird```"
        );
    }

    #[tokio::test]
    async fn test_long_error_chain_is_bounded() {
        let (outcome, _) = run_cmd("job run chain").await;
        let text = outcome.text.unwrap();
        assert!(text.starts_with(":warning: Something went wrong. Please refer help.\n```layer four"));
        assert!(text.contains("\n...\n"));
        assert!(text.ends_with("```"));
    }

    #[tokio::test]
    async fn test_handler_panic_is_reported() {
        let (outcome, _) = run_cmd("job run panic").await;
        let text = outcome.text.unwrap();
        assert!(text.contains("handler panicked: boom"));
        assert!(!outcome.broadcast);
    }

    #[tokio::test]
    async fn test_resolution_errors_are_warnings() {
        let (outcome, emissions) = run_cmd("job run").await;
        assert_eq!(
            outcome.text.unwrap(),
            ":warning: Something went wrong.\n```Missing argument 'mode' for `job run`.```"
        );
        assert!(emissions.is_empty());

        let (outcome, _) = run_cmd("job nope").await;
        assert!(outcome.text.unwrap().contains("No such command `job nope`."));
    }

    #[tokio::test]
    async fn test_group_without_handler_cannot_run() {
        let (outcome, _) = run_cmd("job").await;
        assert!(outcome.text.unwrap().starts_with(":warning: Something went wrong."));
    }

    #[tokio::test]
    async fn test_lost_replies_do_not_fail_the_message() {
        use slack_client::SlackClient;
        use std::time::Duration;
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/conversations.history"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "messages": []
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat.postMessage"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": false,
                "error": "channel_not_found"
            })))
            .expect(2)
            .mount(&server)
            .await;

        let slack = SlackClient::new(server.uri(), "xoxb-test", Duration::from_secs(5)).unwrap();
        let worker = CommandWorker::new(tree(), Arc::new(ResponseRouter::new(slack, 1)));
        let body = serde_json::json!({
            "event": { "user_cmd": "job run ok", "user": "U1", "channel": "C1", "ts": "1.0" }
        });
        let delivery = Delivery {
            routing_key: "job.run".into(),
            body: serde_json::to_vec(&body).unwrap(),
        };

        // Progress and final reply are each attempted once.
        assert!(worker.handle(&delivery).await.is_ok());
    }
}
