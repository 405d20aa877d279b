//! File Metadata Store
//! Handles CRUD, batched transactions and backups for the `files` table.
//! Schema creation runs at most once, gated by the state store.

use super::models::{FileMutation, FileRecord, FileStatus, FileUpdate};
use super::schema;
use super::FileMetadataStore;
use crate::database::{Database, Statement};
use crate::error::StoreError;
use crate::state::StateStore;
use async_trait::async_trait;
use chrono::SecondsFormat;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub struct MetadataStore {
    db: Arc<Database>,
    ready: AtomicBool,
}

impl MetadataStore {
    /// Open the catalog at `db_path`.
    ///
    /// When the state store says the schema already exists the connection is
    /// opened as is; otherwise the table is created and the gate flipped.
    /// Every error here is fatal for bootstrap.
    pub async fn open(db_path: impl Into<PathBuf>, state: &StateStore) -> Result<Self, StoreError> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| StoreError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let db = Arc::new(Database::new(db_path));
        db.connect().await?;
        db.execute_batch(schema::PRAGMAS).await?;

        let ready = if state.is_database_ready() {
            let has_table = files_table_exists(&db).await?;
            if has_table {
                log::info!(
                    "[MetadataStore] Schema already initialized, opened {}",
                    db.path().display()
                );
            } else {
                log::warn!(
                    "[MetadataStore] State reports the schema as initialized but {} has no files table",
                    db.path().display()
                );
            }
            has_table
        } else {
            log::info!(
                "[MetadataStore] Creating schema in {}",
                db.path().display()
            );
            db.execute_batch(schema::CREATE_FILES_TABLE)
                .await
                .map_err(StoreError::Schema)?;
            state.set_database_ready()?;
            true
        };

        Ok(Self {
            db,
            ready: AtomicBool::new(ready),
        })
    }

    pub fn db_path(&self) -> &Path {
        self.db.path()
    }

    /// Release the connection. Later calls degrade to neutral results.
    pub async fn close(&self) {
        self.ready.store(false, Ordering::Release);
        self.db.close().await;
    }

    fn ensure_initialized(&self, operation: &str) -> bool {
        let ready = self.is_ready();
        if !ready {
            log::warn!(
                "[MetadataStore] {} skipped: store is not initialized",
                operation
            );
        }
        ready
    }
}

#[async_trait]
impl FileMetadataStore for MetadataStore {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    async fn add_file(&self, record: &FileRecord) -> Result<bool, StoreError> {
        if !self.ensure_initialized("add_file") {
            return Ok(false);
        }
        let statement = insert_statement(record, &now());
        self.db.execute(&statement.sql, statement.params).await?;
        log::debug!("[MetadataStore] Added file {}", record.file_id);
        Ok(true)
    }

    async fn update_file(&self, file_id: &str, update: &FileUpdate) -> Result<u64, StoreError> {
        if !self.ensure_initialized("update_file") {
            return Ok(0);
        }
        let Some(statement) = update_statement(file_id, update, &now()) else {
            return Ok(0);
        };
        let result = self.db.execute(&statement.sql, statement.params).await?;
        Ok(result.rows_affected)
    }

    async fn delete_file(&self, file_id: &str) -> Result<u64, StoreError> {
        if !self.ensure_initialized("delete_file") {
            return Ok(0);
        }
        let result = self
            .db
            .execute("DELETE FROM files WHERE fileId = ?", vec![json!(file_id)])
            .await?;
        Ok(result.rows_affected)
    }

    async fn get_file(&self, file_id: &str) -> Result<Option<FileRecord>, StoreError> {
        if !self.ensure_initialized("get_file") {
            return Ok(None);
        }
        let result = self
            .db
            .query("SELECT * FROM files WHERE fileId = ?", vec![json!(file_id)])
            .await?;
        Ok(result.rows.first().map(row_to_file))
    }

    async fn get_all_files(&self) -> Result<Vec<FileRecord>, StoreError> {
        if !self.ensure_initialized("get_all_files") {
            return Ok(Vec::new());
        }
        let result = self
            .db
            .query(
                "SELECT * FROM files ORDER BY created_at DESC, rowid DESC",
                vec![],
            )
            .await?;
        Ok(result.rows.iter().map(row_to_file).collect())
    }

    async fn get_files_by_status(&self, status: FileStatus) -> Result<Vec<FileRecord>, StoreError> {
        if !self.ensure_initialized("get_files_by_status") {
            return Ok(Vec::new());
        }
        let result = self
            .db
            .query(
                "SELECT * FROM files WHERE status = ? ORDER BY created_at DESC, rowid DESC",
                vec![json!(status.as_str())],
            )
            .await?;
        Ok(result.rows.iter().map(row_to_file).collect())
    }

    async fn transaction(&self, mutations: Vec<FileMutation>) -> Result<u64, StoreError> {
        if !self.ensure_initialized("transaction") {
            return Ok(0);
        }
        let timestamp = now();
        let statements: Vec<Statement> = mutations
            .iter()
            .filter_map(|mutation| match mutation {
                FileMutation::Add(record) => Some(insert_statement(record, &timestamp)),
                FileMutation::Update(file_id, update) => {
                    update_statement(file_id, update, &timestamp)
                }
                FileMutation::Delete(file_id) => Some(Statement::new(
                    "DELETE FROM files WHERE fileId = ?",
                    vec![json!(file_id)],
                )),
            })
            .collect();

        if statements.is_empty() {
            return Ok(0);
        }

        let results = self.db.batch(statements).await?;
        Ok(results.iter().map(|r| r.rows_affected).sum())
    }

    async fn backup(&self, target: Option<&Path>) -> Result<Option<PathBuf>, StoreError> {
        if !self.ensure_initialized("backup") {
            return Ok(None);
        }
        let target = match target {
            Some(path) => path.to_path_buf(),
            None => default_backup_path(self.db.path()),
        };
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| StoreError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        self.db
            .execute(
                "VACUUM INTO ?",
                vec![json!(target.to_string_lossy())],
            )
            .await?;
        log::info!("[MetadataStore] Backed up database to {}", target.display());
        Ok(Some(target))
    }
}

async fn files_table_exists(db: &Database) -> Result<bool, StoreError> {
    let result = db
        .query(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'files'",
            vec![],
        )
        .await?;
    Ok(!result.rows.is_empty())
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// `<db file>.backup-<timestamp>` next to the live database
fn default_backup_path(db_path: &Path) -> PathBuf {
    let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%S%3f");
    let file_name = db_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "database".to_string());
    db_path.with_file_name(format!("{}.backup-{}", file_name, stamp))
}

fn insert_statement(record: &FileRecord, timestamp: &str) -> Statement {
    Statement::new(
        r#"
            INSERT INTO files (fileId, name, client_path, server_path, mimeType, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
        vec![
            json!(record.file_id),
            json!(record.name),
            json!(record.client_path),
            json!(record.server_path),
            json!(record.mime_type),
            json!(record.status.as_str()),
            json!(timestamp),
            json!(timestamp),
        ],
    )
}

/// `None` when the update carries no fields
fn update_statement(file_id: &str, update: &FileUpdate, timestamp: &str) -> Option<Statement> {
    if update.is_empty() {
        return None;
    }

    let mut sets = Vec::new();
    let mut params = Vec::new();

    let fields = [
        ("name", update.name.as_ref().map(|v| json!(v))),
        ("client_path", update.client_path.as_ref().map(|v| json!(v))),
        ("server_path", update.server_path.as_ref().map(|v| json!(v))),
        ("mimeType", update.mime_type.as_ref().map(|v| json!(v))),
        ("status", update.status.map(|v| json!(v.as_str()))),
    ];
    for (column, value) in fields {
        if let Some(value) = value {
            sets.push(format!("{} = ?", column));
            params.push(value);
        }
    }

    sets.push("updated_at = ?".to_string());
    params.push(json!(timestamp));
    params.push(json!(file_id));

    Some(Statement::new(
        format!("UPDATE files SET {} WHERE fileId = ?", sets.join(", ")),
        params,
    ))
}

// ============== Row Conversion ==============

fn row_to_file(row: &Value) -> FileRecord {
    let text = |key: &str| row.get(key).and_then(|v| v.as_str()).map(str::to_string);

    FileRecord {
        file_id: text("fileId").unwrap_or_default(),
        name: text("name").unwrap_or_default(),
        client_path: text("client_path"),
        server_path: text("server_path"),
        mime_type: text("mimeType"),
        status: row
            .get("status")
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse().ok())
            .unwrap_or(FileStatus::Stored),
        created_at: text("created_at").unwrap_or_default(),
        updated_at: text("updated_at").unwrap_or_default(),
    }
}
