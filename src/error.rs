//! Error types for settings resolution.
//!
//! Every failure aborts the enclosing `create`, `change` or `reset` call.
//! Messages are single-sentence and always name the setting by its dotted
//! path so they can be surfaced to users as-is.

use serde_json::Value;

/// Error produced by a user-supplied function.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SettingsError>;

/// Errors raised while building or updating a settings tree.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// The spec itself is malformed.
    #[error("Invalid spec for setting \"{name}\": {reason}")]
    Configuration { name: String, reason: String },

    #[error("Unexpected error running initializer for setting \"{name}\": {source}")]
    Initializer {
        name: String,
        #[source]
        source: BoxError,
    },

    #[error("Unexpected error running type mapper for setting \"{name}\": {source}")]
    MapType {
        name: String,
        #[source]
        source: BoxError,
    },

    #[error("Unexpected error running fixup for setting \"{name}\" with value {value}: {source}")]
    Fixup {
        name: String,
        value: Value,
        #[source]
        source: BoxError,
    },

    /// The `on_fixup` callback failed. Reported against the callback rather
    /// than the setting that was fixed up.
    #[error("Unexpected error running on_fixup callback (while reporting fixup of \"{name}\"): {source}")]
    OnFixup {
        name: String,
        #[source]
        source: BoxError,
    },

    /// `validate` rejected the value.
    #[error(
        "Invalid value for setting \"{name}\": {value}\n{}",
        bullet_list(.messages)
    )]
    Validation {
        name: String,
        value: Value,
        messages: Vec<String>,
    },

    #[error("Unexpected error running validate for setting \"{name}\" with value {value}: {source}")]
    Validate {
        name: String,
        value: Value,
        #[source]
        source: BoxError,
    },

    #[error("Unexpected error running shorthand for setting \"{name}\" with input {value}: {source}")]
    Shorthand {
        name: String,
        value: Value,
        #[source]
        source: BoxError,
    },

    #[error("Unknown setting \"{name}\"")]
    UnknownSetting { name: String },

    #[error("Setting \"{name}\" is not a namespace and so does not accept objects, but was given {value}")]
    NotANamespace { name: String, value: Value },

    #[error("Setting \"{name}\" is a namespace without a shorthand and so only accepts objects, but was given {value}")]
    MissingShorthand { name: String, value: Value },

    #[error("Setting \"{name}\" is a record and so only accepts objects keyed by entry, but was given {value}")]
    NotARecord { name: String, value: Value },

    #[error("Settings changes must be an object, but was given {value}")]
    InvalidChange { value: Value },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Failed to deserialize settings: {0}")]
    Deserialize(#[from] serde_json::Error),
}

fn bullet_list(messages: &[String]) -> String {
    messages
        .iter()
        .map(|m| format!("  - {}", m))
        .collect::<Vec<_>>()
        .join("\n")
}
