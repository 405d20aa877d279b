use base64::{engine::general_purpose::STANDARD, Engine as _};
use kb_core::{AppPaths, FileMetadataStore, RunMode};
use kb_desktop::ipc::{self, IpcResponse};
use kb_desktop::AppContext;
use serde_json::json;
use tempfile::TempDir;

async fn bootstrap() -> (AppContext, TempDir) {
    let temp = TempDir::new().unwrap();
    let ctx = AppContext::bootstrap(AppPaths::with_base(RunMode::Development, temp.path()))
        .await
        .expect("bootstrap");
    (ctx, temp)
}

async fn call(ctx: &AppContext, request: serde_json::Value) -> IpcResponse {
    ipc::handle_line(ctx, &request.to_string()).await
}

#[tokio::test]
async fn bootstrap_creates_backing_files() {
    let (ctx, temp) = bootstrap().await;

    assert!(temp.path().join("app_config.dev.yaml").exists());
    assert!(temp.path().join("app_state.dev.json").exists());
    assert!(temp.path().join("knowledge_base").join("app.dev.db").exists());
    assert!(ctx.state.is_database_ready());
}

#[tokio::test]
async fn add_list_read_remove_over_ipc() {
    let (ctx, _temp) = bootstrap().await;

    let added = call(
        &ctx,
        json!({
            "id": 1,
            "command": "add-file",
            "payload": {
                "fileId": "f1",
                "name": "a.txt",
                "client_path": "/home/user/a.txt",
                "content": STANDARD.encode("hello"),
            }
        }),
    )
    .await;
    assert_eq!(added.id, Some(1));
    assert!(added.ok);
    assert_eq!(added.data, Some(json!(true)));

    let listed = call(&ctx, json!({ "id": 2, "command": "list-files" })).await;
    let files = listed.data.expect("list data");
    assert_eq!(files.as_array().map(Vec::len), Some(1));
    assert_eq!(files[0]["fileId"], "f1");
    assert_eq!(files[0]["mimeType"], "text/plain");
    assert_eq!(files[0]["content"], STANDARD.encode("hello"));

    let server_path = files[0]["server_path"].as_str().unwrap().to_string();
    let read = call(
        &ctx,
        json!({ "id": 3, "command": "read-file", "payload": { "path": server_path } }),
    )
    .await;
    assert_eq!(read.data, Some(json!(STANDARD.encode("hello"))));

    let removed = call(
        &ctx,
        json!({ "id": 4, "command": "remove-file", "payload": { "fileId": "f1" } }),
    )
    .await;
    assert_eq!(removed.data, Some(json!(true)));
    assert!(!std::path::Path::new(&server_path).exists());
    assert!(ctx.metadata.get_file("f1").await.unwrap().is_none());
}

#[tokio::test]
async fn read_missing_file_is_an_error_response() {
    let (ctx, temp) = bootstrap().await;
    let missing = temp.path().join("missing.txt");

    let response = call(
        &ctx,
        json!({ "id": 9, "command": "read-file", "payload": { "path": missing } }),
    )
    .await;
    assert!(!response.ok);
    assert_eq!(response.id, Some(9));
    assert!(response.error.unwrap().contains("not found"));
}

#[tokio::test]
async fn window_size_roundtrips_through_state_file() {
    let (ctx, temp) = bootstrap().await;

    let set = call(
        &ctx,
        json!({ "id": 1, "command": "set-window-size", "payload": { "width": 1024, "height": 768 } }),
    )
    .await;
    assert!(set.ok);

    let get = call(&ctx, json!({ "id": 2, "command": "get-window-size" })).await;
    assert_eq!(get.data, Some(json!({ "width": 1024.0, "height": 768.0 })));

    let raw = std::fs::read_to_string(temp.path().join("app_state.dev.json")).unwrap();
    let state: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(state["db_initialized"], true);
    assert_eq!(state["window_size"]["width"], 1024.0);
}

#[tokio::test]
async fn backup_database_returns_written_path() {
    let (ctx, _temp) = bootstrap().await;

    let response = call(&ctx, json!({ "id": 1, "command": "backup-database" })).await;
    let path = response.data.unwrap();
    assert!(std::path::Path::new(path.as_str().unwrap()).exists());
}

#[tokio::test]
async fn unknown_and_malformed_requests_fail_softly() {
    let (ctx, _temp) = bootstrap().await;

    let unknown = call(&ctx, json!({ "id": 5, "command": "format-disk" })).await;
    assert!(!unknown.ok);
    assert!(unknown.error.unwrap().contains("Unknown command"));

    let malformed = ipc::handle_line(&ctx, "{ this is not json").await;
    assert_eq!(malformed.id, None);
    assert!(!malformed.ok);
}

#[tokio::test]
async fn serve_answers_each_line() {
    let (ctx, _temp) = bootstrap().await;
    let input = format!(
        "{}\n\n{}\n",
        json!({ "id": 1, "command": "get-config" }),
        json!({ "id": 2, "command": "list-files" })
    );

    let mut output = Vec::new();
    ipc::serve(&ctx, input.as_bytes(), &mut output).await.unwrap();

    let responses: Vec<IpcResponse> = String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0].data.as_ref().unwrap()["app"]["name"], "Knowledge Base");
    assert_eq!(responses[1].data, Some(json!([])));
}

#[tokio::test]
async fn restart_reuses_schema_and_rows() {
    let temp = TempDir::new().unwrap();
    let paths = AppPaths::with_base(RunMode::Development, temp.path());

    let first = AppContext::bootstrap(paths.clone()).await.unwrap();
    assert!(
        first
            .pipeline
            .add_file(kb_core::models::FileInfo {
                file_id: "keep".to_string(),
                name: "keep.txt".to_string(),
                content: Some(STANDARD.encode("kept")),
                ..Default::default()
            })
            .await
    );
    first.shutdown().await;

    let second = AppContext::bootstrap(paths).await.unwrap();
    let files = second.pipeline.list_files().await.unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].content.as_deref(), Some(STANDARD.encode("kept").as_str()));
}

#[tokio::test]
async fn serve_keeps_going_after_non_utf8_line() {
    let (ctx, _temp) = bootstrap().await;
    let mut input = b"\xff\xfe bad\n".to_vec();
    input.extend_from_slice(json!({ "id": 2, "command": "list-files" }).to_string().as_bytes());
    input.push(b'\n');

    let mut output = Vec::new();
    ipc::serve(&ctx, input.as_slice(), &mut output).await.unwrap();

    let responses: Vec<IpcResponse> = String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0].id, None);
    assert!(!responses[0].ok);
    assert_eq!(responses[1].id, Some(2));
    assert_eq!(responses[1].data, Some(json!([])));
}
