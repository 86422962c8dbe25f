//! Cloud bot worker - main entry point.

use anyhow::Context;
use cloud_bot::commands::{build_tree, Services};
use cloud_bot::config::{Config, LogConfig, WorkerKind};
use cloud_bot::error::AppResult;
use cloud_bot::{CommandWorker, Dispatcher, HelpWorker, MessageHandler, ResponseRouter};
use ops_client::OpsClient;
use secrecy::ExposeSecret;
use slack_client::SlackClient;
use std::sync::Arc;
use tokio::signal;
use topic_broker::AmqpBroker;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> AppResult<()> {
    // Load configuration
    let config = Config::load().context("Failed to load configuration")?;

    // Initialize logging
    init_logging(&config.log);

    let kind = config.worker.kind;
    let binding_key = config.worker.binding_key();
    info!("Starting {} worker...", kind.root());

    // Initialize clients
    let slack = SlackClient::new(
        &config.slack.api_base,
        config.slack.bot_token.expose_secret().as_str(),
        config.slack.timeout,
    )
    .context("Failed to create Slack client")?;

    let ops = OpsClient::new(
        &config.ops.base_url,
        config
            .ops
            .api_token
            .as_ref()
            .map(|t| t.expose_secret().to_string()),
        config.ops.timeout,
    )
    .context("Failed to create operations client")?;

    let router = Arc::new(ResponseRouter::new(
        slack.clone(),
        config.slack.history_limit(),
    ));

    // Build the command tree for this worker
    let services = Services::from_config(&config, ops, slack);
    let tree = build_tree(&config, &services)?;
    let handler: Box<dyn MessageHandler> = match kind {
        WorkerKind::Help => Box::new(HelpWorker::new(tree, router)),
        _ => Box::new(CommandWorker::new(tree, router)),
    };

    // Connect to the broker
    let broker = Arc::new(AmqpBroker::connect(&config.broker.uri()).await?);
    let dispatcher = Dispatcher::new(broker.clone(), &config.broker.exchange, &binding_key);

    info!("Listening on {} with {}", config.broker.exchange, binding_key);

    let result = tokio::select! {
        result = dispatcher.run(handler.as_ref()) => result,
        _ = signal::ctrl_c() => {
            info!("Shutdown signal received");
            Ok(())
        }
    };

    info!("Shutting down...");
    if let Err(e) = broker.close().await {
        error!("Failed to close broker connection: {}", e);
    }
    result
}

fn init_logging(log: &LogConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.level));

    let registry = tracing_subscriber::registry().with(filter);
    if log.json() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
