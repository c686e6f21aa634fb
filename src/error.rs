use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeployError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing required configuration key: {0}")]
    MissingKey(String),

    #[error("Unsupported database dialect: {0}")]
    UnsupportedDialect(String),

    #[error("Version control error: {0}")]
    VersionControl(String),

    #[error("Checkout of {project} produced an empty directory at {path}")]
    EmptyCheckout { project: String, path: PathBuf },

    #[error("Build failed: {0}")]
    Build(String),

    #[error("No deployable artifact found under {0}")]
    ArtifactNotFound(PathBuf),

    #[error("Service control failed: all {attempts} strategies exhausted for '{action}'")]
    ServiceControl { action: String, attempts: usize },

    #[error("Filesystem error during {action}: {source}")]
    Filesystem {
        action: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("CSV parse error: {0}")]
    Csv(#[from] csv::Error),
}

impl DeployError {
    /// Wrap an IO error with the filesystem action that triggered it.
    pub fn fs(action: impl Into<String>, source: std::io::Error) -> Self {
        Self::Filesystem {
            action: action.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, DeployError>;
