//! Application context
//!
//! Every store is constructed explicitly, in dependency order, and handed to
//! the command layer. Nothing here is global.

use kb_core::{
    AppPaths, ConfigStore, IngestPipeline, MetadataStore, StateStore, StoreError,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ConfigStore>,
    pub state: Arc<StateStore>,
    pub metadata: Arc<MetadataStore>,
    pub pipeline: IngestPipeline,
}

impl AppContext {
    /// Config → State → Metadata → Pipeline, then settle any adds a previous
    /// run left half-finished. Metadata errors abort startup.
    pub async fn bootstrap(paths: AppPaths) -> Result<Self, StoreError> {
        log::info!(
            "Bootstrapping in {:?} mode from {}",
            paths.mode(),
            paths.base_dir().display()
        );

        let config = Arc::new(ConfigStore::open(paths.clone()));
        let state = Arc::new(StateStore::open(paths.state_file()));

        let db_path = config.kb_database_path();
        let metadata = Arc::new(MetadataStore::open(&db_path, &state).await?);
        log::info!("Catalog database: {}", db_path.display());

        let pipeline = IngestPipeline::new(config.clone(), metadata.clone());
        match pipeline.reconcile_pending().await {
            Ok(report) => log::debug!("Pending reconciliation finished: {:?}", report),
            Err(e) => log::warn!("Pending reconciliation failed: {}", e),
        }

        Ok(Self {
            config,
            state,
            metadata,
            pipeline,
        })
    }

    /// Close the database connection to release file handles.
    pub async fn shutdown(&self) {
        log::info!("Closing database connection");
        self.metadata.close().await;
    }
}
