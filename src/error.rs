use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum XvmError {
    #[error("unable to derive the global scope: set XVMPATH or {home_var}")]
    MissingHome { home_var: &'static str },

    #[error("failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("ill-formatted key-value file {path} (line {line})")]
    IllFormatted { path: PathBuf, line: usize },

    #[error("failed to find binary {0}")]
    BinaryNotFound(String),

    #[error("no version set for {0}")]
    NoVersionSet(String),

    #[error("no executable {binary} for version {version} of {plugin}")]
    MissingExecutable {
        binary: String,
        version: String,
        plugin: String,
    },

    #[error("cannot write {key:?} to {path}: keys must be single words and values one non-blank line")]
    UnwritableEntry { path: PathBuf, key: String },

    #[error("{target} is not installed: {version}")]
    NotInstalled { target: String, version: String },

    #[error("{target} has no available entry for {version}")]
    NotAvailable { target: String, version: String },

    #[error("{target} has no '{alias}' alias")]
    AliasMissing { target: String, alias: String },

    #[error("a scope already exists at {0}")]
    ScopeExists(PathBuf),

    #[error("no scope exists in {0}")]
    ScopeMissing(PathBuf),

    #[error("cannot remove the global scope")]
    RemoveGlobalScope,

    #[error("set EDITOR or `editor` in {0} to edit installed versions")]
    EditorUnset(PathBuf),

    #[error("{program} exited with status {code}")]
    ChildExit { program: String, code: i32 },
}

impl XvmError {
    /// Exit status the process should terminate with for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ChildExit { code, .. } => *code,
            _ => 1,
        }
    }
}
