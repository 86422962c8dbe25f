//! Registry of root command groups.

use crate::error::TreeError;
use crate::node::CommandNode;
use tracing::debug;

/// Root groups in registration order. Built once per process and only
/// read afterwards.
#[derive(Debug, Default)]
pub struct CommandTree {
    roots: Vec<CommandNode>,
}

impl CommandTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a root, validating its whole subtree.
    pub fn register(&mut self, node: impl Into<CommandNode>) -> Result<(), TreeError> {
        let node = node.into();
        if self.root(node.name()).is_some() {
            return Err(TreeError::DuplicateName {
                parent: String::new(),
                name: node.name().to_string(),
            });
        }
        node.validate("")?;
        debug!(root = %node.name(), "Registered command group");
        self.roots.push(node);
        Ok(())
    }

    pub fn root(&self, name: &str) -> Option<&CommandNode> {
        self.roots.iter().find(|r| r.name() == name)
    }

    pub fn root_names(&self) -> impl Iterator<Item = &str> {
        self.roots.iter().map(|r| r.name())
    }

    /// Walk `path` one token per level, treating every token as a name.
    pub fn find<S: AsRef<str>>(&self, path: &[S]) -> Option<&CommandNode> {
        let (first, rest) = path.split_first()?;
        rest.iter()
            .try_fold(self.root(first.as_ref())?, |node, name| {
                node.child(name.as_ref())
            })
    }
}
