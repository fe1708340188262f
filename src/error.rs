//! Error types

use std::path::PathBuf;

/// Errors that can occur while starting or driving the logger
#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// The log directory is unusable; nothing can be logged to disk
    #[error("Failed to create log directory {}: {source}", path.display())]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to build logger runtime: {0}")]
    Runtime(#[source] std::io::Error),

    #[error("Failed to spawn logger thread: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Global logger is already initialized")]
    AlreadyInitialized,

    #[error("Logger worker has stopped")]
    WorkerGone,
}

/// Errors that can occur during configuration store operations
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

pub type ConfigResult<T> = Result<T, ConfigError>;
