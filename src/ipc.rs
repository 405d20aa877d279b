//! JSON-lines IPC between the main process and the renderer.
//!
//! Each request is one line:
//! `{"id": 1, "command": "add-file", "payload": {...}}`
//! and is answered by one line:
//! `{"id": 1, "ok": true, "data": ...}` or `{"id": 1, "ok": false, "error": "..."}`.

use crate::commands;
use crate::context::AppContext;
use kb_core::models::FileInfo;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

#[derive(Debug, Clone, Deserialize)]
pub struct IpcRequest {
    #[serde(default)]
    pub id: Option<u64>,
    pub command: String,
    #[serde(default)]
    pub payload: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IpcResponse {
    pub id: Option<u64>,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IpcResponse {
    fn success(id: Option<u64>, data: Value) -> Self {
        Self {
            id,
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    fn failure(id: Option<u64>, error: impl Into<String>) -> Self {
        Self {
            id,
            ok: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Deserialize)]
struct RemoveFileArgs {
    #[serde(rename = "fileId")]
    file_id: String,
}

#[derive(Deserialize)]
struct ReadFileArgs {
    path: String,
}

#[derive(Deserialize, Default)]
struct BackupArgs {
    #[serde(default)]
    path: Option<String>,
}

#[derive(Deserialize)]
struct WindowSizeArgs {
    width: f64,
    height: f64,
}

fn args<T: DeserializeOwned>(command: &str, payload: Value) -> Result<T, String> {
    serde_json::from_value(payload)
        .map_err(|e| format!("Invalid payload for '{}': {}", command, e))
}

fn to_data<T: Serialize>(value: T) -> Result<Value, String> {
    serde_json::to_value(value).map_err(|e| format!("Failed to encode response: {}", e))
}

/// Route a request to its command handler.
pub async fn dispatch(ctx: &AppContext, request: IpcRequest) -> Result<Value, String> {
    let IpcRequest {
        command, payload, ..
    } = request;

    match command.as_str() {
        "add-file" => {
            let file: FileInfo = args(&command, payload)?;
            to_data(commands::kb_add_file(ctx, file).await?)
        }
        "remove-file" => {
            let RemoveFileArgs { file_id } = args(&command, payload)?;
            to_data(commands::kb_remove_file(ctx, file_id).await?)
        }
        "read-file" => {
            let ReadFileArgs { path } = args(&command, payload)?;
            to_data(commands::kb_read_file(ctx, path).await?)
        }
        "list-files" => to_data(commands::kb_list_files(ctx).await?),
        "backup-database" => {
            let BackupArgs { path } = if payload.is_null() {
                BackupArgs::default()
            } else {
                args(&command, payload)?
            };
            to_data(commands::kb_backup_database(ctx, path).await?)
        }
        "set-window-size" => {
            let WindowSizeArgs { width, height } = args(&command, payload)?;
            to_data(commands::app_set_window_size(ctx, width, height).await?)
        }
        "get-window-size" => to_data(commands::app_get_window_size(ctx).await?),
        "get-config" => to_data(commands::app_get_config(ctx).await?),
        other => Err(format!("Unknown command: {}", other)),
    }
}

/// Parse one line and produce its response. Never fails; bad input becomes
/// an error response.
pub async fn handle_line(ctx: &AppContext, line: &str) -> IpcResponse {
    let request: IpcRequest = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(e) => {
            log::warn!("Malformed IPC request: {}", e);
            return IpcResponse::failure(None, format!("Malformed request: {}", e));
        }
    };

    let id = request.id;
    match dispatch(ctx, request).await {
        Ok(data) => IpcResponse::success(id, data),
        Err(e) => IpcResponse::failure(id, e),
    }
}

/// Serve requests from `reader` until EOF, writing one response per line.
/// A line that is not UTF-8 gets an error response like any other
/// malformed request.
pub async fn serve<R, W>(ctx: &AppContext, mut reader: R, mut writer: W) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }

        let response = match std::str::from_utf8(&buf) {
            Ok(line) if line.trim().is_empty() => continue,
            Ok(line) => handle_line(ctx, line.trim_end_matches(['\n', '\r'])).await,
            Err(e) => {
                log::warn!("Malformed IPC request: {}", e);
                IpcResponse::failure(None, format!("Malformed request: {}", e))
            }
        };

        let mut encoded = serde_json::to_string(&response)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        encoded.push('\n');
        writer.write_all(encoded.as_bytes()).await?;
        writer.flush().await?;
    }
    log::info!("IPC input closed");
    Ok(())
}
