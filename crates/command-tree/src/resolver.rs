//! Turns raw command text into an [`Invocation`].
//!
//! Tokenization is a plain whitespace split: there is no quoting, so a
//! value can never contain a space.

use crate::error::ResolveError;
use crate::invocation::{Args, Invocation, Value};
use crate::node::CommandNode;
use crate::param::{looks_like_switch, ParamSpec};
use crate::tree::CommandTree;
use std::collections::HashSet;

/// Split command text into tokens.
pub fn tokenize(raw: &str) -> Vec<&str> {
    raw.split_whitespace().collect()
}

/// Resolve raw command text against `tree`.
pub fn resolve<'t>(tree: &'t CommandTree, raw: &str) -> Result<Invocation<'t>, ResolveError> {
    resolve_tokens(tree, &tokenize(raw))
}

/// Resolve pre-split tokens. The first token selects the root group.
pub fn resolve_tokens<'t, S: AsRef<str>>(
    tree: &'t CommandTree,
    tokens: &[S],
) -> Result<Invocation<'t>, ResolveError> {
    let first: &str = tokens.first().ok_or(ResolveError::Empty)?.as_ref();
    let mut node = tree.root(first).ok_or_else(|| ResolveError::NotFound {
        path: first.to_string(),
    })?;

    let mut path = vec![first.to_string()];
    let mut args = Args::new();
    let mut idx = 1;
    let mut options_done = false;

    loop {
        let command = path.join(" ");
        let mut binder = Binder::new(node, &command);
        let mut next = None;

        while let Some(token) = tokens.get(idx) {
            let token: &str = token.as_ref();
            if !options_done && token == "--" {
                options_done = true;
                idx += 1;
                continue;
            }
            if !options_done && looks_like_switch(token) {
                idx = binder.bind_switch(tokens, idx, &mut args)?;
                continue;
            }
            if binder.has_open_positional() {
                binder.bind_positional(token, &mut args)?;
                idx += 1;
                continue;
            }
            if node.is_group() {
                let child = node.child(token).ok_or_else(|| ResolveError::NotFound {
                    path: format!("{} {}", command, token),
                })?;
                next = Some(child);
                idx += 1;
                break;
            }
            return Err(ResolveError::UnexpectedArgument {
                command,
                token: token.to_string(),
            });
        }

        binder.finish(&mut args)?;

        match next {
            Some(child) => {
                path.push(child.name().to_string());
                node = child;
            }
            None if node.handler().is_none() => {
                return Err(ResolveError::NotFound { path: command });
            }
            None => return Ok(Invocation { path, node, args }),
        }
    }
}

/// Binds tokens to the parameters of a single node.
struct Binder<'n> {
    node: &'n CommandNode,
    command: &'n str,
    positionals: Vec<&'n ParamSpec>,
    next_positional: usize,
    bound: HashSet<&'n str>,
}

impl<'n> Binder<'n> {
    fn new(node: &'n CommandNode, command: &'n str) -> Self {
        Self {
            node,
            command,
            positionals: node.positionals().collect(),
            next_positional: 0,
            bound: HashSet::new(),
        }
    }

    fn has_open_positional(&self) -> bool {
        if self.next_positional < self.positionals.len() {
            return true;
        }
        self.positionals.last().map(|p| p.multiple).unwrap_or(false)
    }

    fn bind_positional(&mut self, token: &str, args: &mut Args) -> Result<(), ResolveError> {
        let index = self.next_positional.min(self.positionals.len().saturating_sub(1));
        let spec = self.positionals[index];
        let value = spec.value_type.parse(&spec.name, token)?;
        if spec.multiple {
            args.push(&spec.name, value);
        } else {
            args.insert(&spec.name, value);
        }
        self.bound.insert(spec.name.as_str());
        if !spec.multiple {
            self.next_positional += 1;
        }
        Ok(())
    }

    /// Bind the switch at `tokens[idx]` and return the index after it.
    fn bind_switch<S: AsRef<str>>(
        &mut self,
        tokens: &[S],
        idx: usize,
        args: &mut Args,
    ) -> Result<usize, ResolveError> {
        let token: &str = tokens[idx].as_ref();
        let (name, inline) = match token.split_once('=') {
            Some((name, value)) if name.starts_with("--") => (name, Some(value)),
            _ => (token, None),
        };

        let spec = self
            .node
            .switch(name)
            .ok_or_else(|| ResolveError::UnknownOption {
                command: self.command.to_string(),
                option: name.to_string(),
            })?;

        if spec.is_flag() {
            if let Some(value) = inline {
                return Err(ResolveError::InvalidValue {
                    param: spec.name.clone(),
                    value: value.to_string(),
                    expected: "no value",
                });
            }
            args.insert(&spec.name, Value::Bool(true));
            self.bound.insert(spec.name.as_str());
            return Ok(idx + 1);
        }

        let (raw, next) = match inline {
            Some(value) => (value, idx + 1),
            None => {
                let value = tokens.get(idx + 1).ok_or_else(|| {
                    ResolveError::MissingOptionValue {
                        command: self.command.to_string(),
                        option: name.to_string(),
                    }
                })?;
                (value.as_ref(), idx + 2)
            }
        };

        let value = spec.value_type.parse(&spec.name, raw)?;
        if spec.multiple {
            args.push(&spec.name, value);
        } else {
            args.insert(&spec.name, value);
        }
        self.bound.insert(spec.name.as_str());
        Ok(next)
    }

    /// Apply defaults and check that every required parameter was given.
    fn finish(self, args: &mut Args) -> Result<(), ResolveError> {
        for spec in self.node.params() {
            if self.bound.contains(spec.name.as_str()) {
                continue;
            }
            if let Some(raw) = spec.default.as_ref().and_then(|d| d.raw()) {
                if !args.contains(&spec.name) {
                    let value = spec.value_type.parse(&spec.name, raw)?;
                    args.insert(&spec.name, value);
                }
            } else if spec.is_flag() {
                if !args.contains(&spec.name) {
                    args.insert(&spec.name, Value::Bool(false));
                }
            } else if spec.required {
                return Err(ResolveError::MissingRequiredParameter {
                    command: self.command.to_string(),
                    param: spec.name.clone(),
                    kind: if spec.is_positional() { "argument" } else { "option" },
                });
            }
        }
        Ok(())
    }
}
