//! Usage text for `help`, `help <root>` and `help <root> <path...>`.

use crate::error::HelpError;
use crate::node::CommandNode;
use crate::param::{ParamKind, ParamSpec};
use crate::resolver::tokenize;
use crate::tree::CommandTree;

/// Word that introduces a help request.
pub const HELP_COMMAND: &str = "help";

/// Render help for raw command text such as `help gcloud sa`.
pub fn render_command(tree: &CommandTree, raw: &str) -> Result<String, HelpError> {
    render(tree, &tokenize(raw))
}

/// Render help for `path`, whose first token must be `help`.
///
/// A bare `help` lists the registered roots in registration order.
/// Otherwise `path[1..]` is walked through the tree as plain names.
pub fn render<S: AsRef<str>>(tree: &CommandTree, path: &[S]) -> Result<String, HelpError> {
    let names: Vec<&str> = path.iter().map(|s| s.as_ref()).collect();
    match names.split_first() {
        Some((&HELP_COMMAND, [])) => Ok(main_listing(tree)),
        Some((&HELP_COMMAND, rest)) => {
            let node = tree
                .find(rest)
                .ok_or_else(|| HelpError::UnknownPath(names.join(" ")))?;
            Ok(format!("```{}```", usage(node, &rest.join(" "))))
        }
        _ => Err(HelpError::NotHelp(names.join(" "))),
    }
}

/// Listing of all root groups.
pub fn main_listing(tree: &CommandTree) -> String {
    let names: Vec<&str> = tree.root_names().collect();
    format!(
        "Following is a list of commands currently available.\n```{}```\nType `help <command>` for more information about the `command`",
        names.join("\n")
    )
}

/// Plain usage text for a single node addressed by `path`.
pub fn usage(node: &CommandNode, path: &str) -> String {
    let mut out = format!("Usage: {}", usage_line(node, path));

    if !node.description().is_empty() {
        out.push_str("\n\n");
        for line in node.description().lines() {
            out.push_str("  ");
            out.push_str(line.trim());
            out.push('\n');
        }
        out.pop();
    }

    let arguments: Vec<(String, String)> = node
        .params()
        .iter()
        .filter(|p| p.is_positional())
        .map(|p| (p.display_name(), param_detail(p)))
        .collect();
    push_section(&mut out, "Arguments", &arguments);

    let options: Vec<(String, String)> = node
        .params()
        .iter()
        .filter(|p| !p.is_positional())
        .map(|p| {
            let mut left = p.display_name();
            if !p.is_flag() {
                left.push(' ');
                left.push_str(p.value_type.label());
            }
            (left, param_detail(p))
        })
        .collect();
    push_section(&mut out, "Options", &options);

    let commands: Vec<(String, String)> = node
        .children()
        .iter()
        .map(|c| (c.name().to_string(), c.summary().to_string()))
        .collect();
    push_section(&mut out, "Commands", &commands);

    out
}

fn usage_line(node: &CommandNode, path: &str) -> String {
    let mut parts = vec![path.to_string()];
    if node.params().iter().any(|p| !p.is_positional()) {
        parts.push("[OPTIONS]".into());
    }
    for param in node.positionals() {
        let mut name = param.name.to_uppercase();
        if param.multiple {
            name.push_str("...");
        }
        if !param.required {
            name = format!("[{}]", name);
        }
        parts.push(name);
    }
    if node.is_group() && !node.children().is_empty() {
        if node.handler().is_some() {
            parts.push("[COMMAND]".into());
        } else {
            parts.push("COMMAND".into());
        }
        parts.push("[ARGS]...".into());
    }
    parts.join(" ")
}

fn param_detail(param: &ParamSpec) -> String {
    let mut detail = param.help.clone();
    let mut tags = Vec::new();
    if let ParamKind::Argument = param.kind {
        tags.push(param.value_type.label().to_string());
    }
    if param.required && param.default.is_none() {
        tags.push("required".into());
    }
    if let Some(default) = param.default.as_ref().and_then(|d| d.raw()) {
        tags.push(format!("default: {}", default));
    }
    if param.multiple {
        tags.push("repeatable".into());
    }
    if !tags.is_empty() {
        if !detail.is_empty() {
            detail.push_str("  ");
        }
        detail.push_str(&format!("[{}]", tags.join("; ")));
    }
    detail
}

fn push_section(out: &mut String, title: &str, rows: &[(String, String)]) {
    if rows.is_empty() {
        return;
    }
    let width = rows.iter().map(|(left, _)| left.len()).max().unwrap_or(0);
    out.push_str(&format!("\n\n{}:", title));
    for (left, right) in rows {
        if right.is_empty() {
            out.push_str(&format!("\n  {}", left));
        } else {
            out.push_str(&format!("\n  {:width$}  {}", left, right, width = width));
        }
    }
}
