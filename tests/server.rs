//! HTTP API tests against a server bound to an ephemeral port.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use medassist::config::Config;
use medassist::embedding::create_embedder;
use medassist::ingest::{collect_pages, ingest_pages};
use medassist::pipeline::RagPipeline;
use medassist::server;
use medassist::sqlite_index::create_index;
use serde_json::{json, Value};
use tempfile::TempDir;

async fn start(root: &Path, ingest: bool) -> String {
    let docs = root.join("docs");
    fs::create_dir_all(&docs).unwrap();
    fs::write(docs.join("anemia.txt"), "Fatigue is a symptom of anemia").unwrap();

    let mut config = Config::minimal();
    config.embedding.provider = "hashing".to_string();
    config.embedding.dims = 64;
    config.index.backend = "memory".to_string();
    config.index.dims = 64;
    config.retrieval.log_path = root.join("logs/retrieval_log.jsonl");
    config.ingest.dirs = vec![docs];
    // Unroutable so a missing-key test never reaches a real provider.
    config.llm.url = "http://127.0.0.1:1/v1".to_string();
    config.llm.api_key_env = "MEDASSIST_TEST_UNSET_KEY".to_string();

    let embedder = create_embedder(&config.embedding).unwrap();
    let index = create_index(&config).await.unwrap();
    if ingest {
        let pages = collect_pages(&config, None, None).unwrap();
        ingest_pages(&config, &pages, &embedder, &index).await.unwrap();
    }
    let pipeline = Arc::new(RagPipeline::with_components(&config, embedder, index).unwrap());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(server::serve(listener, pipeline));
    format!("http://{}", addr)
}

#[tokio::test]
async fn retrieve_returns_results_and_context() {
    let tmp = TempDir::new().unwrap();
    let base = start(tmp.path(), true).await;

    let resp = reqwest::Client::new()
        .post(format!("{}/api/retrieve", base))
        .json(&json!({"question": "what is fatigue", "top_k": 2}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["results"][0]["source"], "anemia.txt");
    assert_eq!(body["results"][0]["page"], 1);
    assert!(body["results"][0]["similarity"].as_f64().unwrap() > 0.0);
    assert!(body["context"]
        .as_str()
        .unwrap()
        .starts_with("[Source 1: anemia.txt, Page 1]"));
}

#[tokio::test]
async fn empty_question_is_bad_request() {
    let tmp = TempDir::new().unwrap();
    let base = start(tmp.path(), true).await;
    let client = reqwest::Client::new();

    for path in ["/api/query", "/api/retrieve"] {
        let resp = client
            .post(format!("{}{}", base, path))
            .json(&json!({"question": "   "}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"]["code"], "bad_request");
    }
}

#[tokio::test]
async fn query_without_api_key_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let base = start(tmp.path(), true).await;

    let resp = reqwest::Client::new()
        .post(format!("{}/api/query", base))
        .json(&json!({"question": "what is fatigue"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "missing_api_key");
}

#[tokio::test]
async fn unreachable_llm_is_bad_gateway() {
    let tmp = TempDir::new().unwrap();
    let base = start(tmp.path(), true).await;

    let resp = reqwest::Client::new()
        .post(format!("{}/api/query", base))
        .json(&json!({"question": "what is fatigue", "api_key": "gsk_test"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 502);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "llm_error");
}

#[tokio::test]
async fn retrieval_failure_is_internal_error() {
    let tmp = TempDir::new().unwrap();
    // Never ingested: the in-memory index does not exist yet.
    let base = start(tmp.path(), false).await;

    let resp = reqwest::Client::new()
        .post(format!("{}/api/retrieve", base))
        .json(&json!({"question": "what is fatigue"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 500);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "retrieval_error");
}

#[tokio::test]
async fn health_reports_vector_count() {
    let tmp = TempDir::new().unwrap();
    let base = start(tmp.path(), true).await;

    let body: Value = reqwest::get(format!("{}/api/health", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["index_connected"], true);
    assert_eq!(body["vectors"], 1);
}
