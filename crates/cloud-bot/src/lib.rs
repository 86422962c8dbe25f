//! Chat command worker: consumes commands from a topic exchange, runs them
//! against a command tree and posts the replies back to Slack.

pub mod admin;
pub mod commands;
pub mod config;
pub mod dispatcher;
pub mod envelope;
pub mod error;
pub mod event;
pub mod router;

pub use dispatcher::Dispatcher;
pub use envelope::{CommandWorker, HelpWorker, MessageHandler, Outcome};
pub use event::{BrokerMessage, ChatEvent};
pub use router::{decide, ResponseRouter, RoutingDecision};
