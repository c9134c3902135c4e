//! End-to-end tests over a real socket.

use serde_json::{json, Value};

use workbench_common::WorkbenchConfig;
use workbench_server::{AppState, WorkbenchServer};

fn offline_config() -> WorkbenchConfig {
    let mut config = WorkbenchConfig::default();
    config.engine.cache_compiled_modules = false;
    config.runtime.bundle_path = Some("/nonexistent/python.wasm".into());
    config
}

async fn post_run(client: &reqwest::Client, base: &str, body: Value) -> Value {
    client
        .post(format!("{base}/run"))
        .json(&body)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

// ===== Test: Run over HTTP =====

#[tokio::test]
async fn test_run_round_trip() {
    let handle = WorkbenchServer::start_test(AppState::new(&offline_config()).unwrap())
        .await
        .unwrap();
    let client = reqwest::Client::new();
    let base = handle.url();

    let json = post_run(
        &client,
        &base,
        json!({ "source": "{\"b\": 2, \"a\": 1}", "language": "json" }),
    )
    .await;
    assert_eq!(json["status"], "success");
    assert_eq!(json["message"], "Valid JSON:\n{\n  \"a\": 1,\n  \"b\": 2\n}");

    let json = post_run(
        &client,
        &base,
        json!({ "source": "public class Main {", "language": "java" }),
    )
    .await;
    assert_eq!(json["status"], "warning");
    assert_eq!(json["message"], "Java code issues found");

    handle.shutdown().await;
}

#[tokio::test]
async fn test_resubmit_with_stdin() {
    let handle = WorkbenchServer::start_test(AppState::new(&offline_config()).unwrap())
        .await
        .unwrap();
    let client = reqwest::Client::new();
    let base = handle.url();
    let source = "const n = Number(prompt('n?')); console.log(n + 1);";

    let first = post_run(&client, &base, json!({ "source": source, "language": "js" })).await;
    assert_eq!(first["metadata"]["needs_input"], true);

    let second = post_run(
        &client,
        &base,
        json!({ "source": source, "language": "js", "stdin": "41" }),
    )
    .await;
    assert_eq!(second["status"], "success");
    assert_eq!(second["message"], "42");

    handle.shutdown().await;
}

// ===== Test: Runtime lifecycle over HTTP =====

#[tokio::test]
async fn test_preload_and_ready() {
    let handle = WorkbenchServer::start_test(AppState::new(&offline_config()).unwrap())
        .await
        .unwrap();
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/runtime/preload", handle.url()))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::ACCEPTED);

    let ready: Value = client
        .get(format!("{}/ready", handle.url()))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(ready["status"], "ready");
    assert!(ready["runtime"].is_string());

    handle.shutdown().await;
}
