//! Chunked file reader
//!
//! Reads a file in fixed 32 KiB chunks and returns its base64 encoding for
//! transport to the renderer. Peak size of a single read is bounded; the
//! whole file is still held in memory before encoding.

use crate::error::ReaderError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;

pub const CHUNK_SIZE: usize = 32 * 1024;

#[derive(Debug, Clone, Copy, Default)]
pub struct FileReader;

impl FileReader {
    pub fn new() -> Self {
        Self
    }

    /// Read `path` and return its contents as standard padded base64.
    pub async fn read_base64(&self, path: impl AsRef<Path>) -> Result<String, ReaderError> {
        let path = path.as_ref();
        let metadata = match tokio::fs::metadata(path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ReaderError::NotFound(path.to_path_buf()));
            }
            Err(source) => return Err(io_error(path, source)),
        };
        if !metadata.is_file() {
            return Err(ReaderError::NotAFile(path.to_path_buf()));
        }

        let chunks = read_chunks(path).await?;
        let bytes = chunks.concat();
        log::debug!(
            "[FileReader] Read {} bytes from {}",
            bytes.len(),
            path.display()
        );
        Ok(STANDARD.encode(bytes))
    }
}

/// The handle is dropped (closed) on every return path.
async fn read_chunks(path: &Path) -> Result<Vec<Vec<u8>>, ReaderError> {
    let mut file = tokio::fs::File::open(path)
        .await
        .map_err(|source| io_error(path, source))?;

    let mut chunks = Vec::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];
    loop {
        let read = file
            .read(&mut buffer)
            .await
            .map_err(|source| io_error(path, source))?;
        if read == 0 {
            break;
        }
        chunks.push(buffer[..read].to_vec());
    }
    Ok(chunks)
}

fn io_error(path: &Path, source: std::io::Error) -> ReaderError {
    ReaderError::Io {
        path: PathBuf::from(path),
        source,
    }
}
