//! Knowledge Base Core Library
//!
//! This crate contains the persistence layer used by the desktop host:
//! path resolution, the YAML app config, the JSON runtime state, the
//! SQLite file catalog and the ingest pipeline that keeps the catalog and
//! the file-store directory in agreement.

pub mod config;
pub mod database;
pub mod error;
pub mod file_reader;
pub mod ingest;
pub mod paths;
pub mod state;
pub mod storage;

// Re-export commonly used types
pub use config::{AppConfig, ConfigStore};
pub use error::{ConfigError, IngestError, ReaderError, StateError, StoreError};
pub use file_reader::FileReader;
pub use ingest::{IngestPipeline, ReconcileReport};
pub use paths::{AppPaths, RunMode};
pub use state::{AppState, StateStore, WindowSize};
pub use storage::models;
pub use storage::{FileMetadataStore, MetadataStore};
