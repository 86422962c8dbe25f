//! Parameter declarations for commands and groups.

use crate::error::ResolveError;
use crate::invocation::Value;

/// Type a bound token is converted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Text,
    Int,
}

impl ValueType {
    /// Label used in usage text (`TEXT`, `INTEGER`).
    pub fn label(&self) -> &'static str {
        match self {
            ValueType::Text => "TEXT",
            ValueType::Int => "INTEGER",
        }
    }

    pub(crate) fn parse(&self, param: &str, raw: &str) -> Result<Value, ResolveError> {
        match self {
            ValueType::Text => Ok(Value::Text(raw.to_string())),
            ValueType::Int => raw
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| ResolveError::InvalidValue {
                    param: param.to_string(),
                    value: raw.to_string(),
                    expected: self.label(),
                }),
        }
    }
}

/// How a parameter is matched against tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamKind {
    /// Bound by position.
    Argument,
    /// `--long VALUE` / `-s VALUE`.
    Option { long: String, short: Option<char> },
    /// `--long` / `-s`, no value.
    Flag { long: String, short: Option<char> },
}

/// Default applied when a parameter is absent.
///
/// Environment defaults are read once when the tree is built so that
/// resolution never touches process state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultValue {
    Value(String),
    Env {
        var: String,
        value: Option<String>,
    },
}

impl DefaultValue {
    /// Raw default text, if one is available.
    pub fn raw(&self) -> Option<&str> {
        match self {
            DefaultValue::Value(v) => Some(v),
            DefaultValue::Env { value, .. } => value.as_deref(),
        }
    }
}

/// A declared parameter of a command node.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
    pub value_type: ValueType,
    pub required: bool,
    pub default: Option<DefaultValue>,
    pub multiple: bool,
    pub help: String,
}

impl ParamSpec {
    /// Required positional argument.
    pub fn argument(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ParamKind::Argument,
            value_type: ValueType::Text,
            required: true,
            default: None,
            multiple: false,
            help: String::new(),
        }
    }

    /// Optional named option taking one value.
    pub fn option(name: impl Into<String>, short: Option<char>) -> Self {
        let name = name.into();
        Self {
            kind: ParamKind::Option {
                long: name.replace('_', "-"),
                short,
            },
            name,
            value_type: ValueType::Text,
            required: false,
            default: None,
            multiple: false,
            help: String::new(),
        }
    }

    /// Boolean flag.
    pub fn flag(name: impl Into<String>, short: Option<char>) -> Self {
        let name = name.into();
        Self {
            kind: ParamKind::Flag {
                long: name.replace('_', "-"),
                short,
            },
            name,
            value_type: ValueType::Text,
            required: false,
            default: None,
            multiple: false,
            help: String::new(),
        }
    }

    pub fn value_type(mut self, value_type: ValueType) -> Self {
        self.value_type = value_type;
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn multiple(mut self) -> Self {
        self.multiple = true;
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = help.into();
        self
    }

    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default = Some(DefaultValue::Value(value.into()));
        self
    }

    /// Default read from `var` now, falling back to `fallback` when unset.
    pub fn default_env(mut self, var: impl Into<String>, fallback: Option<String>) -> Self {
        let var = var.into();
        let value = std::env::var(&var).ok().or(fallback);
        self.default = Some(DefaultValue::Env { var, value });
        self
    }

    pub fn is_positional(&self) -> bool {
        matches!(self.kind, ParamKind::Argument)
    }

    pub fn is_flag(&self) -> bool {
        matches!(self.kind, ParamKind::Flag { .. })
    }

    /// Whether `token` (without any `=value` suffix) names this option or flag.
    pub fn matches_switch(&self, token: &str) -> bool {
        match &self.kind {
            ParamKind::Argument => false,
            ParamKind::Option { long, short } | ParamKind::Flag { long, short } => {
                if let Some(name) = token.strip_prefix("--") {
                    name == long
                } else if let Some(c) = token.strip_prefix('-') {
                    let mut chars = c.chars();
                    matches!((chars.next(), chars.next(), short), (Some(c), None, Some(s)) if c == *s)
                } else {
                    false
                }
            }
        }
    }

    /// Name shown in usage text: `SRC_PATH` or `-p, --project`.
    pub fn display_name(&self) -> String {
        match &self.kind {
            ParamKind::Argument => self.name.to_uppercase(),
            ParamKind::Option { long, short } | ParamKind::Flag { long, short } => match short {
                Some(s) => format!("-{}, --{}", s, long),
                None => format!("--{}", long),
            },
        }
    }
}

/// True when a token should be treated as an option switch.
///
/// Negative numbers and a bare `-` are positional values.
pub(crate) fn looks_like_switch(token: &str) -> bool {
    if let Some(rest) = token.strip_prefix("--") {
        return !rest.is_empty();
    }
    match token.strip_prefix('-') {
        Some(rest) => rest
            .chars()
            .next()
            .map(|c| !c.is_ascii_digit())
            .unwrap_or(false),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_long_name_uses_dashes() {
        let spec = ParamSpec::option("n_threads", Some('n'));
        assert!(spec.matches_switch("--n-threads"));
        assert!(spec.matches_switch("-n"));
        assert!(!spec.matches_switch("--n_threads"));
        assert!(!spec.matches_switch("-nx"));
        assert_eq!(spec.display_name(), "-n, --n-threads");
    }

    #[test]
    fn test_looks_like_switch() {
        assert!(looks_like_switch("--project"));
        assert!(looks_like_switch("-p"));
        assert!(!looks_like_switch("-5"));
        assert!(!looks_like_switch("-"));
        assert!(!looks_like_switch("--"));
        assert!(!looks_like_switch("gs://bucket"));
    }

    #[test]
    fn test_int_parse_error_names_param() {
        let err = ValueType::Int.parse("n_threads", "many").unwrap_err();
        assert!(matches!(err, ResolveError::InvalidValue { ref param, .. } if param == "n_threads"));
    }

    #[test]
    fn test_env_default_falls_back() {
        let spec = ParamSpec::option("threads", None)
            .default_env("COMMAND_TREE_TEST_UNSET_VAR", Some("4".into()));
        assert_eq!(spec.default.as_ref().and_then(|d| d.raw()), Some("4"));
    }
}
