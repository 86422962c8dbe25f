//! Command groups and leaves.

use crate::error::TreeError;
use crate::handler::Handler;
use crate::param::{ParamKind, ParamSpec};
use std::collections::HashSet;
use std::sync::Arc;

/// A node of the command tree.
pub enum CommandNode {
    Group(Group),
    Leaf(Leaf),
}

/// Named set of child commands. May run its own handler when no
/// subcommand is given.
pub struct Group {
    name: String,
    description: String,
    params: Vec<ParamSpec>,
    handler: Option<Arc<dyn Handler>>,
    children: Vec<CommandNode>,
}

/// Terminal command.
pub struct Leaf {
    name: String,
    description: String,
    params: Vec<ParamSpec>,
    handler: Arc<dyn Handler>,
}

impl Group {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            params: Vec::new(),
            handler: None,
            children: Vec::new(),
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    /// Handler invoked when the group is addressed without a subcommand.
    pub fn handler(mut self, handler: impl Handler + 'static) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Builder form of [`Group::add`]; validation is deferred to registration.
    pub fn child(mut self, node: impl Into<CommandNode>) -> Self {
        self.children.push(node.into());
        self
    }

    /// Attach a child, rejecting sibling name clashes.
    pub fn add(&mut self, node: impl Into<CommandNode>) -> Result<&mut Self, TreeError> {
        let node = node.into();
        if self.children.iter().any(|c| c.name() == node.name()) {
            return Err(TreeError::DuplicateName {
                parent: self.name.clone(),
                name: node.name().to_string(),
            });
        }
        node.validate(&self.name)?;
        self.children.push(node);
        Ok(self)
    }
}

impl Leaf {
    pub fn new(name: impl Into<String>, handler: impl Handler + 'static) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            params: Vec::new(),
            handler: Arc::new(handler),
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }
}

impl From<Group> for CommandNode {
    fn from(group: Group) -> Self {
        CommandNode::Group(group)
    }
}

impl From<Leaf> for CommandNode {
    fn from(leaf: Leaf) -> Self {
        CommandNode::Leaf(leaf)
    }
}

impl CommandNode {
    pub fn name(&self) -> &str {
        match self {
            CommandNode::Group(g) => &g.name,
            CommandNode::Leaf(l) => &l.name,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            CommandNode::Group(g) => &g.description,
            CommandNode::Leaf(l) => &l.description,
        }
    }

    /// First line of the description.
    pub fn summary(&self) -> &str {
        self.description().lines().next().unwrap_or("").trim()
    }

    pub fn params(&self) -> &[ParamSpec] {
        match self {
            CommandNode::Group(g) => &g.params,
            CommandNode::Leaf(l) => &l.params,
        }
    }

    pub fn handler(&self) -> Option<&Arc<dyn Handler>> {
        match self {
            CommandNode::Group(g) => g.handler.as_ref(),
            CommandNode::Leaf(l) => Some(&l.handler),
        }
    }

    pub fn children(&self) -> &[CommandNode] {
        match self {
            CommandNode::Group(g) => &g.children,
            CommandNode::Leaf(_) => &[],
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self, CommandNode::Group(_))
    }

    pub fn child(&self, name: &str) -> Option<&CommandNode> {
        self.children().iter().find(|c| c.name() == name)
    }

    pub fn positionals(&self) -> impl Iterator<Item = &ParamSpec> {
        self.params().iter().filter(|p| p.is_positional())
    }

    pub fn switch(&self, token: &str) -> Option<&ParamSpec> {
        self.params().iter().find(|p| p.matches_switch(token))
    }

    /// Check names, parameter ordering and option uniqueness of this subtree.
    pub(crate) fn validate(&self, parent: &str) -> Result<(), TreeError> {
        let name = self.name();
        if name.is_empty() || name.starts_with('-') || name.contains(char::is_whitespace) {
            return Err(TreeError::InvalidName(name.to_string()));
        }
        let command = if parent.is_empty() {
            name.to_string()
        } else {
            format!("{} {}", parent, name)
        };

        let mut switches = HashSet::new();
        let mut seen_optional = false;
        let mut seen_repeated = false;
        for param in self.params() {
            match &param.kind {
                ParamKind::Argument => {
                    if seen_repeated {
                        return Err(TreeError::RepeatedNotLast {
                            command,
                            param: param.name.clone(),
                        });
                    }
                    if param.required && seen_optional {
                        return Err(TreeError::RequiredAfterOptional {
                            command,
                            param: param.name.clone(),
                        });
                    }
                    seen_optional |= !param.required;
                    seen_repeated |= param.multiple;
                }
                ParamKind::Option { long, short } | ParamKind::Flag { long, short } => {
                    let mut keys = vec![format!("--{}", long)];
                    keys.extend(short.map(|s| format!("-{}", s)));
                    for key in keys {
                        if !switches.insert(key.clone()) {
                            return Err(TreeError::DuplicateOption {
                                command,
                                option: key,
                            });
                        }
                    }
                }
            }
        }

        let mut names = HashSet::new();
        for child in self.children() {
            if !names.insert(child.name()) {
                return Err(TreeError::DuplicateName {
                    parent: command,
                    name: child.name().to_string(),
                });
            }
            child.validate(&command)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for CommandNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(if self.is_group() { "Group" } else { "Leaf" })
            .field("name", &self.name())
            .field("params", &self.params().len())
            .field("children", &self.children().len())
            .finish()
    }
}
