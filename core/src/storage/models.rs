//! Data models for the file catalog
//! `FileRecord` is the persisted row, `FileInfo` the transient DTO exchanged
//! with the renderer.

use serde::{Deserialize, Deserializer, Serialize};

pub type FileId = String;

/// Where a file is in the add saga
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    /// Row written, bytes not yet confirmed on disk
    Pending,
    /// Bytes on disk and row in the catalog
    Stored,
}

impl FileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileStatus::Pending => "pending",
            FileStatus::Stored => "stored",
        }
    }
}

impl std::str::FromStr for FileStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(FileStatus::Pending),
            "stored" => Ok(FileStatus::Stored),
            _ => Err(format!("Unknown file status: {}", s)),
        }
    }
}

/// One row of the `files` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    #[serde(rename = "fileId")]
    pub file_id: FileId,
    pub name: String,
    pub client_path: Option<String>,
    pub server_path: Option<String>,
    #[serde(rename = "mimeType")]
    pub mime_type: Option<String>,
    pub status: FileStatus,
    /// ISO-8601, assigned by the store
    pub created_at: String,
    /// ISO-8601, assigned by the store
    pub updated_at: String,
}

impl FileRecord {
    pub fn new(file_id: impl Into<FileId>, name: impl Into<String>) -> Self {
        Self {
            file_id: file_id.into(),
            name: name.into(),
            client_path: None,
            server_path: None,
            mime_type: None,
            status: FileStatus::Stored,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }
}

/// Partial update; only `Some` fields are written. For the nullable
/// columns `Some(None)` clears the value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub client_path: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub server_path: Option<Option<String>>,
    #[serde(
        default,
        rename = "mimeType",
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub mime_type: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<FileStatus>,
}

/// Present-but-null becomes `Some(None)`; absent stays `None` via `default`.
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl FileUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.client_path.is_none()
            && self.server_path.is_none()
            && self.mime_type.is_none()
            && self.status.is_none()
    }

    pub fn status(status: FileStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }
}

/// A single write applied as part of a catalog transaction
#[derive(Debug, Clone)]
pub enum FileMutation {
    Add(FileRecord),
    Update(FileId, FileUpdate),
    Delete(FileId),
}

/// File description crossing the IPC boundary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
    #[serde(rename = "fileId", default)]
    pub file_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub client_path: Option<String>,
    #[serde(default)]
    pub server_path: Option<String>,
    /// Base64 payload, only present while in transit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(rename = "mimeType", default)]
    pub mime_type: Option<String>,
}

impl From<FileRecord> for FileInfo {
    fn from(record: FileRecord) -> Self {
        Self {
            file_id: record.file_id,
            name: record.name,
            client_path: record.client_path,
            server_path: record.server_path,
            content: None,
            mime_type: record.mime_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_info_uses_wire_names() {
        let info: FileInfo = serde_json::from_value(serde_json::json!({
            "fileId": "f1",
            "name": "a.txt",
            "client_path": "/home/me/a.txt",
            "content": "aGVsbG8=",
        }))
        .unwrap();

        assert_eq!(info.file_id, "f1");
        assert_eq!(info.client_path.as_deref(), Some("/home/me/a.txt"));
        assert_eq!(info.mime_type, None);

        let value = serde_json::to_value(FileInfo::from(FileRecord::new("f2", "b.md"))).unwrap();
        assert_eq!(value["fileId"], "f2");
        assert!(value.get("content").is_none());
        assert!(value.get("mimeType").is_some());
    }

    #[test]
    fn status_parses_its_own_strings() {
        for status in [FileStatus::Pending, FileStatus::Stored] {
            assert_eq!(status.as_str().parse::<FileStatus>(), Ok(status));
        }
        assert!("gone".parse::<FileStatus>().is_err());
    }

    #[test]
    fn update_distinguishes_null_from_absent() {
        let update: FileUpdate = serde_json::from_value(serde_json::json!({
            "client_path": null,
            "mimeType": "text/plain",
        }))
        .unwrap();

        assert_eq!(update.client_path, Some(None));
        assert_eq!(update.server_path, None);
        assert_eq!(update.mime_type, Some(Some("text/plain".to_string())));
        assert!(!update.is_empty());
    }
}
