use std::path::PathBuf;
use thiserror::Error;

/// Deployment error types
#[derive(Error, Debug)]
pub enum DeployError {
    #[error("Project root not found: {path}")]
    RootNotFound { path: PathBuf },

    #[error("Unknown provider: {name} (expected vercel, netlify, firebase or wix)")]
    UnknownProvider { name: String },

    #[error("Invalid cleanup pattern: {pattern}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("Failed to remove {path}")]
    RemoveFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to list directory: {path}")]
    ListFailed {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Failed to read manifest: {path}")]
    ManifestRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed manifest: {path}")]
    Manifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to start `{command}`")]
    SpawnFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{label}: `{command}` exited with {}", exit_description(.code))]
    CommandFailed {
        label: String,
        command: String,
        code: Option<i32>,
    },
}

impl DeployError {
    /// Message followed by the immediate source, for one-line reports
    pub fn chain(&self) -> String {
        match std::error::Error::source(self) {
            Some(source) => format!("{self}: {source}"),
            None => self.to_string(),
        }
    }
}

fn exit_description(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "no exit code (terminated by signal)".to_string(),
    }
}
