pub mod commands;
pub mod context;
pub mod ipc;

pub use context::AppContext;

use kb_core::{AppPaths, RunMode};
use tokio::io::BufReader;

/// Bootstrap the stores and serve renderer requests over stdio until the
/// renderer closes its end.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let paths = AppPaths::new(RunMode::detect());
    let ctx = AppContext::bootstrap(paths)
        .await
        .map_err(|e| format!("Failed to initialize knowledge base: {}", e))?;

    log::info!("Setup complete");

    let result = ipc::serve(
        &ctx,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    )
    .await;

    ctx.shutdown().await;
    result?;
    Ok(())
}
