//! Command tree errors.

use thiserror::Error;

/// Tree construction errors, raised once at startup.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TreeError {
    #[error("Duplicate command name `{name}` under `{parent}`")]
    DuplicateName { parent: String, name: String },

    #[error("Duplicate option `{option}` on `{command}`")]
    DuplicateOption { command: String, option: String },

    #[error("Required argument `{param}` on `{command}` follows an optional one")]
    RequiredAfterOptional { command: String, param: String },

    #[error("Repeated argument `{param}` on `{command}` must be the last argument")]
    RepeatedNotLast { command: String, param: String },

    #[error("Invalid command name `{0}`")]
    InvalidName(String),
}

/// Failures turning a command string into an invocation.
///
/// All of these are recoverable and end up as a short warning in chat.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Empty command.")]
    Empty,

    #[error("No such command `{path}`.")]
    NotFound { path: String },

    #[error("Missing {kind} '{param}' for `{command}`.")]
    MissingRequiredParameter {
        command: String,
        param: String,
        kind: &'static str,
    },

    #[error("No such option: {option} (for `{command}`).")]
    UnknownOption { command: String, option: String },

    #[error("Option {option} requires an argument (for `{command}`).")]
    MissingOptionValue { command: String, option: String },

    #[error("Invalid value '{value}' for '{param}': expected {expected}.")]
    InvalidValue {
        param: String,
        value: String,
        expected: &'static str,
    },

    #[error("Got unexpected extra argument ({token}) for `{command}`.")]
    UnexpectedArgument { command: String, token: String },
}

/// Help lookup failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HelpError {
    #[error("Could not understand help path `{0}`.")]
    UnknownPath(String),

    #[error("Not a help request: `{0}`.")]
    NotHelp(String),
}

/// Errors raised by command handlers.
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("{0}")]
    PermissionDenied(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Missing value for `{0}`")]
    MissingArgument(String),

    #[error("Operation failed: {0}")]
    Operation(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for handlers.
pub type HandlerResult = Result<Option<String>, HandlerError>;
