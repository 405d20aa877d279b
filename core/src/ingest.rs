//! Ingest Pipeline
//!
//! Moves files between the renderer and the knowledge base. An add writes
//! the catalog row as `pending`, writes the bytes under the file-store
//! directory and then marks the row `stored`; a failed write removes the
//! row again. Removal unlinks the file before the row so a row never
//! outlives a failed unlink. Rows left `pending` by a crash are settled by
//! [`IngestPipeline::reconcile_pending`] at startup.

use crate::config::ConfigStore;
use crate::error::{IngestError, ReaderError, StoreError};
use crate::file_reader::FileReader;
use crate::storage::models::{FileInfo, FileRecord, FileStatus, FileUpdate};
use crate::storage::FileMetadataStore;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// Outcome of a startup reconciliation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Pending rows whose file was found and which are now `stored`
    pub completed: usize,
    /// Pending rows without a file, removed from the catalog
    pub discarded: usize,
}

#[derive(Clone)]
pub struct IngestPipeline {
    config: Arc<ConfigStore>,
    store: Arc<dyn FileMetadataStore>,
    reader: FileReader,
}

impl IngestPipeline {
    pub fn new(config: Arc<ConfigStore>, store: Arc<dyn FileMetadataStore>) -> Self {
        Self {
            config,
            store,
            reader: FileReader::new(),
        }
    }

    pub fn file_store_dir(&self) -> PathBuf {
        self.config.kb_file_store_dir()
    }

    /// Store a file sent by the renderer. Returns `false` (and logs) when the
    /// file was rejected or could not be stored.
    pub async fn add_file(&self, file: FileInfo) -> bool {
        let file_id = file.file_id.clone();
        match self.store_file(file).await {
            Ok(record) => {
                log::info!(
                    "[IngestPipeline] Stored file {} at {}",
                    record.file_id,
                    record.server_path.as_deref().unwrap_or_default()
                );
                true
            }
            Err(e) => {
                log::error!("[IngestPipeline] Failed to add file '{}': {}", file_id, e);
                false
            }
        }
    }

    async fn store_file(&self, file: FileInfo) -> Result<FileRecord, IngestError> {
        let (file_id, name, content) = validate(&file)?;
        let bytes = STANDARD.decode(content.trim())?;

        let dir = self.file_store_dir();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| IngestError::Io {
                path: dir.clone(),
                source,
            })?;

        let target = dir.join(name);
        let record = FileRecord {
            file_id: file_id.to_string(),
            name: name.to_string(),
            client_path: file.client_path.clone(),
            server_path: Some(target.to_string_lossy().to_string()),
            mime_type: mime_type_for(&target),
            status: FileStatus::Pending,
            created_at: String::new(),
            updated_at: String::new(),
        };

        if !self.store.add_file(&record).await? {
            return Err(IngestError::StoreNotReady);
        }

        if let Err(source) = tokio::fs::write(&target, &bytes).await {
            if let Err(e) = self.store.delete_file(file_id).await {
                log::error!(
                    "[IngestPipeline] Failed to drop pending row {}: {}",
                    file_id,
                    e
                );
            }
            return Err(IngestError::Io {
                path: target,
                source,
            });
        }

        self.store
            .update_file(file_id, &FileUpdate::status(FileStatus::Stored))
            .await?;

        Ok(FileRecord {
            status: FileStatus::Stored,
            ..record
        })
    }

    /// Remove a file and its row. Unknown ids count as already removed;
    /// nothing is touched while the catalog is not ready.
    pub async fn remove_file(&self, file_id: &str) -> bool {
        match self.delete(file_id).await {
            Ok(()) => true,
            Err(e) => {
                log::error!("[IngestPipeline] Failed to remove file '{}': {}", file_id, e);
                false
            }
        }
    }

    async fn delete(&self, file_id: &str) -> Result<(), IngestError> {
        if !self.store.is_ready() {
            return Err(IngestError::StoreNotReady);
        }
        let Some(record) = self.store.get_file(file_id).await? else {
            log::debug!("[IngestPipeline] File {} not in catalog, nothing to remove", file_id);
            return Ok(());
        };

        if let Some(server_path) = record.server_path.as_deref() {
            match tokio::fs::remove_file(server_path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    log::warn!(
                        "[IngestPipeline] File {} already missing at {}",
                        file_id,
                        server_path
                    );
                }
                Err(source) => {
                    return Err(IngestError::Io {
                        path: PathBuf::from(server_path),
                        source,
                    });
                }
            }
        }

        self.store.delete_file(file_id).await?;
        log::info!("[IngestPipeline] Removed file {}", file_id);
        Ok(())
    }

    /// Every stored file with its content attached.
    pub async fn list_files(&self) -> Result<Vec<FileInfo>, StoreError> {
        let records = self.store.get_files_by_status(FileStatus::Stored).await?;

        let mut files = Vec::with_capacity(records.len());
        for record in records {
            let content = match record.server_path.as_deref() {
                Some(path) => match self.reader.read_base64(path).await {
                    Ok(content) => Some(content),
                    Err(e) => {
                        log::warn!("[IngestPipeline] Content unavailable for {}: {}", record.file_id, e);
                        None
                    }
                },
                None => None,
            };
            files.push(FileInfo {
                content,
                ..FileInfo::from(record)
            });
        }
        Ok(files)
    }

    /// Base64 contents of an arbitrary path.
    pub async fn read_file(&self, path: impl AsRef<Path>) -> Result<String, ReaderError> {
        self.reader.read_base64(path).await
    }

    /// Settle rows an interrupted add left `pending`.
    pub async fn reconcile_pending(&self) -> Result<ReconcileReport, StoreError> {
        let mut report = ReconcileReport::default();

        for record in self.store.get_files_by_status(FileStatus::Pending).await? {
            let on_disk = match record.server_path.as_deref() {
                Some(path) => tokio::fs::metadata(path)
                    .await
                    .map(|m| m.is_file())
                    .unwrap_or(false),
                None => false,
            };

            if on_disk {
                self.store
                    .update_file(&record.file_id, &FileUpdate::status(FileStatus::Stored))
                    .await?;
                report.completed += 1;
            } else {
                self.store.delete_file(&record.file_id).await?;
                report.discarded += 1;
            }
        }

        if report != ReconcileReport::default() {
            log::info!(
                "[IngestPipeline] Reconciled pending files: {} completed, {} discarded",
                report.completed,
                report.discarded
            );
        }
        Ok(report)
    }
}

fn validate(file: &FileInfo) -> Result<(&str, &str, &str), IngestError> {
    let file_id = file.file_id.as_str();
    if file_id.trim().is_empty() {
        return Err(IngestError::Invalid("fileId is required".to_string()));
    }
    if file_id.trim() != file_id {
        return Err(IngestError::Invalid(format!(
            "fileId '{}' has surrounding whitespace",
            file_id
        )));
    }
    if file.name.trim().is_empty() {
        return Err(IngestError::Invalid("name is required".to_string()));
    }
    let Some(content) = file.content.as_deref() else {
        return Err(IngestError::Invalid("content is required".to_string()));
    };

    let mut components = Path::new(&file.name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok((file_id, file.name.as_str(), content)),
        _ => Err(IngestError::Invalid(format!(
            "name '{}' must be a plain file name",
            file.name
        ))),
    }
}

fn mime_type_for(path: &Path) -> Option<String> {
    mime_guess::from_path(path)
        .first()
        .map(|mime| mime.essence_str().to_string())
}
