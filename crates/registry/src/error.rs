//! Error types for catalog loading and command compilation.

use std::path::PathBuf;

use thiserror::Error;

/// Failure to assemble a catalog from its source.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("could not read config directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not read command config {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse command config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("duplicate command name: {name}")]
    DuplicateName { name: String },
}

/// Failure to translate a command into its native definition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("unknown command option type '{kind}' for parameter '{parameter}' of command '{command}'")]
    UnrecognizedType { command: String, parameter: String, kind: String },
}
