//! Storage Layer
//!
//! Provides the SQLite-backed catalog of ingested files:
//! - models: `FileRecord` rows, partial updates and the IPC `FileInfo` DTO
//! - schema: the `files` table and connection pragmas
//! - files: `MetadataStore`, the sole writer of `files` rows
//!
//! Callers depend on the async `FileMetadataStore` trait rather than the
//! concrete store so the backend can move without touching call sites.

pub mod files;
pub mod models;
pub mod schema;

use crate::error::StoreError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

pub use files::MetadataStore;
pub use models::*;

#[async_trait]
pub trait FileMetadataStore: Send + Sync {
    /// `false` once closed, or when the catalog has no `files` table.
    fn is_ready(&self) -> bool;

    /// Insert a new row; `Ok(false)` when the store is not ready.
    async fn add_file(&self, record: &FileRecord) -> Result<bool, StoreError>;

    /// Apply the supplied fields; returns the number of rows changed.
    async fn update_file(&self, file_id: &str, update: &FileUpdate) -> Result<u64, StoreError>;

    /// Remove the row if present; returns the number of rows removed.
    async fn delete_file(&self, file_id: &str) -> Result<u64, StoreError>;

    async fn get_file(&self, file_id: &str) -> Result<Option<FileRecord>, StoreError>;

    /// All rows, most recently created first.
    async fn get_all_files(&self) -> Result<Vec<FileRecord>, StoreError>;

    async fn get_files_by_status(&self, status: FileStatus) -> Result<Vec<FileRecord>, StoreError>;

    /// Apply every mutation atomically; returns the total rows changed.
    async fn transaction(&self, mutations: Vec<FileMutation>) -> Result<u64, StoreError>;

    /// Copy the live database; returns where the copy was written.
    async fn backup(&self, target: Option<&Path>) -> Result<Option<PathBuf>, StoreError>;
}
