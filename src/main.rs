//! Knowledge Base desktop host
//!
//! Runs the main-process side of the app: resolves config and state,
//! opens the catalog and answers renderer requests on stdio. Logs go to
//! stderr so stdout stays reserved for IPC responses.

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let default_level = if cfg!(debug_assertions) { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_millis()
        .init();

    log::info!("Starting Knowledge Base host...");

    kb_desktop::run().await
}
