use base64::{engine::general_purpose::STANDARD, Engine as _};
use kb_core::models::{FileInfo, FileStatus};
use kb_core::{
    AppPaths, ConfigStore, FileMetadataStore, IngestPipeline, MetadataStore, RunMode, StateStore,
};
use std::sync::Arc;
use tempfile::TempDir;

struct KnowledgeBase {
    config: Arc<ConfigStore>,
    state: StateStore,
    store: Arc<MetadataStore>,
    pipeline: IngestPipeline,
    _temp: TempDir,
}

async fn open(mode: RunMode) -> KnowledgeBase {
    let temp = TempDir::new().unwrap();
    let paths = AppPaths::with_base(mode, temp.path());
    let config = Arc::new(ConfigStore::open(paths.clone()));
    let state = StateStore::open(paths.state_file());
    let store = Arc::new(
        MetadataStore::open(config.kb_database_path(), &state)
            .await
            .expect("open store"),
    );
    let pipeline = IngestPipeline::new(config.clone(), store.clone());
    KnowledgeBase {
        config,
        state,
        store,
        pipeline,
        _temp: temp,
    }
}

fn upload(file_id: &str, name: &str, body: &[u8]) -> FileInfo {
    FileInfo {
        file_id: file_id.to_string(),
        name: name.to_string(),
        content: Some(STANDARD.encode(body)),
        ..Default::default()
    }
}

#[tokio::test]
async fn add_then_remove_scenario() {
    let kb = open(RunMode::Development).await;

    assert!(kb.pipeline.add_file(upload("f1", "a.txt", b"hello")).await);
    let record = kb.store.get_file("f1").await.unwrap().unwrap();
    let server_path = record.server_path.clone().unwrap();
    assert!(server_path.ends_with("/a.txt"));
    assert_eq!(record.mime_type.as_deref(), Some("text/plain"));
    assert_eq!(std::fs::read(&server_path).unwrap(), b"hello");

    assert!(kb.pipeline.remove_file("f1").await);
    assert!(!std::path::Path::new(&server_path).exists());
    assert!(kb.store.get_file("f1").await.unwrap().is_none());

    assert!(kb.pipeline.remove_file("f1").await);
}

#[tokio::test]
async fn packaged_mode_keeps_its_own_files() {
    let kb = open(RunMode::Packaged).await;

    assert!(kb.config.path().ends_with("app_config.yaml"));
    assert!(kb.state.path().ends_with("app_state.json"));
    assert!(kb.store.db_path().ends_with("app.db"));
    assert!(kb.state.is_database_ready());
}

#[tokio::test]
async fn content_round_trips_at_chunk_boundaries() {
    let kb = open(RunMode::Development).await;

    for size in [0usize, 32768, 32769, 100_000] {
        let body = vec![b'k'; size];
        let file = upload(&format!("id-{}", size), &format!("f{}.dat", size), &body);
        let expected = file.content.clone().unwrap();
        assert!(kb.pipeline.add_file(file).await);

        let path = kb.pipeline.file_store_dir().join(format!("f{}.dat", size));
        assert_eq!(kb.pipeline.read_file(&path).await.unwrap(), expected);
    }
}

#[tokio::test]
async fn no_pending_rows_after_successful_adds() {
    let kb = open(RunMode::Development).await;
    for i in 0..3 {
        assert!(
            kb.pipeline
                .add_file(upload(&format!("f{}", i), &format!("{}.txt", i), b"x"))
                .await
        );
    }

    let pending = kb.store.get_files_by_status(FileStatus::Pending).await.unwrap();
    assert!(pending.is_empty());
    assert_eq!(kb.store.get_all_files().await.unwrap().len(), 3);
}

#[tokio::test]
async fn configured_absolute_store_dir_is_used() {
    let kb = open(RunMode::Development).await;
    let elsewhere = TempDir::new().unwrap();

    let patch = serde_yaml::to_value(serde_json::json!({
        "app": {
            "name": "Knowledge Base",
            "knowledge_base": { "file_store_path": elsewhere.path().to_string_lossy() }
        }
    }))
    .unwrap();
    kb.config.update(patch).unwrap();

    assert!(kb.pipeline.add_file(upload("f1", "moved.txt", b"data")).await);
    assert!(elsewhere.path().join("moved.txt").exists());
}
