//! Error types.
//!
//! [`StyleError`] is the error returned by every fallible public operation.
//! It wraps the narrower errors of each layer:
//!
//! - [`EngineError`]: the sheet engine rejected a canonical style object.
//! - [`LifecycleError`]: a release did not match an outstanding reference.
//! - [`ConfigError`]: site configuration could not be loaded.
//!
//! Broken internal invariants (a double destroy, a fingerprint present in
//! both the active and cooling maps) are not represented here; they panic.

use std::path::PathBuf;

use thiserror::Error;

use crate::fingerprint::Fingerprint;

/// Error type for sharestyle operations.
#[derive(Debug, Error)]
pub enum StyleError {
    /// Sheet creation failed.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Reference-count protocol violation.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// Configuration loading failure.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Error returned by a [`SheetEngine`](crate::SheetEngine) when it cannot
/// materialize a style object.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// A class rule was declared with an empty name.
    #[error("class name must not be empty")]
    EmptyClassName,

    /// A rule body was not an object.
    #[error("rule '{rule}' must be an object")]
    InvalidRule { rule: String },

    /// A property value was neither a string nor a number.
    #[error("invalid value for '{property}' in '{rule}': {value}")]
    InvalidValue {
        rule: String,
        property: String,
        value: String,
    },

    /// An `@` rule the engine does not know how to emit.
    #[error("unsupported at-rule '{0}'")]
    UnsupportedAtRule(String),

    /// Any other engine-specific failure.
    #[error("{0}")]
    Other(String),
}

/// Error returned when a release does not match an outstanding reference.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    /// The fingerprint has no active references on this site.
    #[error("fingerprint {fingerprint} is not active")]
    NotActive { fingerprint: Fingerprint },
}

/// Error type for site configuration loading.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The document could not be parsed.
    #[error("failed to parse config{}: {message}", location(.path))]
    Parse {
        /// Optional source file path.
        path: Option<PathBuf>,
        /// Error message from the parser.
        message: String,
    },

    /// The file could not be read.
    #[error("failed to load config: {message}")]
    Load { message: String },

    /// The file extension is not one of `.json`, `.yaml`, `.yml`.
    #[error("unsupported config format: {}", .0.display())]
    UnsupportedFormat(PathBuf),
}

fn location(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| format!(" {}", p.display()))
        .unwrap_or_default()
}
