//! Resolved invocations and the per-message execution context.

use crate::error::HandlerError;
use crate::node::CommandNode;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// A bound parameter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Text(String),
    Int(i64),
    Bool(bool),
    List(Vec<Value>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }
}

/// Parameter values bound for one invocation, merged across the command path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Args {
    values: HashMap<String, Value>,
}

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    pub(crate) fn push(&mut self, name: &str, value: Value) {
        match self.values.get_mut(name) {
            Some(Value::List(items)) => items.push(value),
            _ => {
                self.values.insert(name.to_string(), Value::List(vec![value]));
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_int)
    }

    pub fn flag(&self, name: &str) -> bool {
        matches!(self.get(name), Some(Value::Bool(true)))
    }

    pub fn list(&self, name: &str) -> Vec<&Value> {
        match self.get(name) {
            Some(Value::List(items)) => items.iter().collect(),
            Some(v) => vec![v],
            None => Vec::new(),
        }
    }

    /// Text value that the handler cannot do without.
    pub fn required_str(&self, name: &str) -> Result<&str, HandlerError> {
        self.str(name)
            .ok_or_else(|| HandlerError::MissingArgument(name.to_string()))
    }

    pub fn required_int(&self, name: &str) -> Result<i64, HandlerError> {
        self.int(name)
            .ok_or_else(|| HandlerError::MissingArgument(name.to_string()))
    }
}

/// A message emitted by a handler before it returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Emission {
    pub text: String,
    pub long_job: bool,
    pub broadcast: bool,
}

/// Where intermediate handler output goes.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn emit(&self, emission: Emission);
}

/// Sink that drops everything. Used by help rendering and tests.
pub struct NullSink;

#[async_trait]
impl ProgressSink for NullSink {
    async fn emit(&self, _emission: Emission) {}
}

/// Sink that records emissions in order.
#[derive(Default)]
pub struct RecordingSink {
    emissions: Mutex<Vec<Emission>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emissions(&self) -> Vec<Emission> {
        self.emissions
            .lock()
            .map(|e| e.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ProgressSink for RecordingSink {
    async fn emit(&self, emission: Emission) {
        if let Ok(mut emissions) = self.emissions.lock() {
            emissions.push(emission);
        }
    }
}

/// Mutable state shared between the envelope and a running handler.
///
/// Seeded per message. Handlers flip `long_job` and `broadcast` to
/// influence where their replies land.
#[derive(Clone)]
pub struct ExecContext {
    pub user_id: String,
    pub channel: String,
    pub long_job: bool,
    pub broadcast: bool,
    sink: Arc<dyn ProgressSink>,
}

impl ExecContext {
    pub fn new(
        user_id: impl Into<String>,
        channel: impl Into<String>,
        sink: Arc<dyn ProgressSink>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            channel: channel.into(),
            long_job: false,
            broadcast: false,
            sink,
        }
    }

    /// Context with no progress destination.
    pub fn detached(user_id: impl Into<String>) -> Self {
        Self::new(user_id, "", Arc::new(NullSink))
    }

    /// Send an intermediate message using the current routing flags.
    pub async fn progress(&self, text: impl Into<String>) {
        self.sink
            .emit(Emission {
                text: text.into(),
                long_job: self.long_job,
                broadcast: self.broadcast,
            })
            .await;
    }
}

impl std::fmt::Debug for ExecContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecContext")
            .field("user_id", &self.user_id)
            .field("channel", &self.channel)
            .field("long_job", &self.long_job)
            .field("broadcast", &self.broadcast)
            .finish()
    }
}

/// A command resolved against the tree and ready to run.
#[derive(Debug)]
pub struct Invocation<'t> {
    /// Names from the root to the addressed node.
    pub path: Vec<String>,
    pub node: &'t CommandNode,
    pub args: Args,
}

impl Invocation<'_> {
    /// Space-joined command path, e.g. `gcloud sa keys`.
    pub fn command(&self) -> String {
        self.path.join(" ")
    }
}
