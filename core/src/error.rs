//! Error types for the core stores.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to access config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("failed to serialize config: {0}")]
    Serialize(#[source] serde_yaml::Error),
    #[error("config update must be a mapping")]
    InvalidUpdate,
    #[error("config update produced an invalid config: {0}")]
    Invalid(#[source] serde_yaml::Error),
}

#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to access state file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse state file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize state: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("state update must be a JSON object")]
    InvalidUpdate,
    #[error("state update produced an invalid state: {0}")]
    Invalid(#[source] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to prepare database directory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("database error: {0}")]
    Database(String),
    #[error("failed to create schema: {0}")]
    Schema(String),
    #[error("failed to persist schema flag: {0}")]
    State(#[from] StateError),
}

impl From<String> for StoreError {
    fn from(message: String) -> Self {
        StoreError::Database(message)
    }
}

#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("file not found: {0}")]
    NotFound(PathBuf),
    #[error("path is not a file: {0}")]
    NotAFile(PathBuf),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("invalid file: {0}")]
    Invalid(String),
    #[error("content is not valid base64: {0}")]
    Decode(#[from] base64::DecodeError),
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("metadata store is not initialized")]
    StoreNotReady,
    #[error(transparent)]
    Store(#[from] StoreError),
}
