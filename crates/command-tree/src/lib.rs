//! Hierarchical chat commands.
//!
//! Root groups are registered once at startup into a [`CommandTree`].
//! Incoming text is turned into an [`Invocation`] by [`resolve`] and
//! help text is produced by [`help::render`].

mod error;
mod handler;
pub mod help;
mod invocation;
mod node;
mod param;
mod resolver;
mod tree;

pub use error::{HandlerError, HandlerResult, HelpError, ResolveError, TreeError};
pub use handler::{FnHandler, Handler};
pub use invocation::{
    Args, Emission, ExecContext, Invocation, NullSink, ProgressSink, RecordingSink, Value,
};
pub use node::{CommandNode, Group, Leaf};
pub use param::{DefaultValue, ParamKind, ParamSpec, ValueType};
pub use resolver::{resolve, resolve_tokens, tokenize};
pub use tree::CommandTree;
