//! IPC command handlers exposed to the renderer.
//!
//! Each handler logs what it was asked to do and reports failures as plain
//! strings, which is all the renderer can do anything with.

use crate::context::AppContext;
use kb_core::models::FileInfo;
use kb_core::{AppConfig, FileMetadataStore, WindowSize};
use std::path::PathBuf;
use std::time::Instant;

pub async fn kb_add_file(ctx: &AppContext, file: FileInfo) -> Result<bool, String> {
    log::info!("Adding file {} ({})", file.file_id, file.name);
    Ok(ctx.pipeline.add_file(file).await)
}

pub async fn kb_remove_file(ctx: &AppContext, file_id: String) -> Result<bool, String> {
    log::info!("Removing file {}", file_id);
    Ok(ctx.pipeline.remove_file(&file_id).await)
}

pub async fn kb_read_file(ctx: &AppContext, path: String) -> Result<String, String> {
    log::info!("Reading file: {}", path);
    ctx.pipeline.read_file(&path).await.map_err(|e| {
        log::error!("Read file error: {}", e);
        e.to_string()
    })
}

pub async fn kb_list_files(ctx: &AppContext) -> Result<Vec<FileInfo>, String> {
    let start_time = Instant::now();
    let result = ctx.pipeline.list_files().await.map_err(|e| {
        log::error!("List files error: {}", e);
        format!("Failed to list files: {}", e)
    });

    if let Ok(ref files) = result {
        log::info!(
            "Listed {} files in {}ms",
            files.len(),
            start_time.elapsed().as_millis()
        );
    }
    result
}

pub async fn kb_backup_database(
    ctx: &AppContext,
    path: Option<String>,
) -> Result<Option<String>, String> {
    let target = path.map(PathBuf::from);
    let written = ctx
        .metadata
        .backup(target.as_deref())
        .await
        .map_err(|e| {
            log::error!("Database backup error: {}", e);
            format!("Backup failed: {}", e)
        })?;
    Ok(written.map(|p| p.to_string_lossy().to_string()))
}

pub async fn app_set_window_size(ctx: &AppContext, width: f64, height: f64) -> Result<(), String> {
    log::debug!("Window resized to {}x{}", width, height);
    ctx.state
        .set_window_size(width, height)
        .await
        .map_err(|e| {
            log::warn!("Failed to persist window size: {}", e);
            e.to_string()
        })
}

pub async fn app_get_window_size(ctx: &AppContext) -> Result<Option<WindowSize>, String> {
    Ok(ctx.state.window_size())
}

pub async fn app_get_config(ctx: &AppContext) -> Result<AppConfig, String> {
    Ok(ctx.config.config())
}
