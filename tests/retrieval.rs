//! In-process tests of the full write and read paths.
//!
//! Uses the hashing embedder so nothing touches the network, and runs
//! against both index backends.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use medassist::config::Config;
use medassist::embedding::create_embedder;
use medassist::ingest::{collect_pages, ingest_pages};
use medassist::pipeline::RagPipeline;
use medassist::sqlite_index::create_index;
use medassist_core::chunk::chunk_text;
use medassist_core::context::{build_context, NO_EVIDENCE};
use medassist_core::index::IndexSpec;
use medassist_core::log::RetrievalLogEntry;
use tempfile::TempDir;

fn config(root: &Path, backend: &str) -> Config {
    let mut config = Config::minimal();
    config.embedding.provider = "hashing".to_string();
    config.embedding.dims = 128;
    config.index.backend = backend.to_string();
    config.index.dims = 128;
    config.index.path = root.join("data/medassist.sqlite");
    config.retrieval.log_path = root.join("logs/retrieval_log.jsonl");
    config.ingest.dirs = vec![root.join("docs")];
    config.validate().unwrap();
    config
}

fn write_docs(root: &Path) {
    let docs = root.join("docs");
    fs::create_dir_all(&docs).unwrap();
    fs::write(docs.join("anemia.txt"), "Fatigue is a symptom of anemia").unwrap();
    fs::write(
        docs.join("b12.txt"),
        "Vitamin B12 deficiency leads to macrocytic red cells.\n\nNeurological signs may appear.",
    )
    .unwrap();
    fs::write(
        docs.join("iron.txt"),
        "Serum ferritin is the best single test for iron stores.",
    )
    .unwrap();
}

async fn ingested_pipeline(root: &Path, backend: &str) -> (Config, RagPipeline) {
    write_docs(root);
    let config = config(root, backend);
    let embedder = create_embedder(&config.embedding).unwrap();
    let index = create_index(&config).await.unwrap();
    let pages = collect_pages(&config, None, None).unwrap();
    ingest_pages(&config, &pages, &embedder, &index).await.unwrap();
    let pipeline = RagPipeline::with_components(&config, embedder, index).unwrap();
    (config, pipeline)
}

#[test]
fn scenario_a_chunk_count_and_overlap() {
    let sentence = "Anemia reduces oxygen delivery to tissues";
    let mut text = String::new();
    while text.chars().count() < 1200 {
        text.push_str(sentence);
        text.push(' ');
    }
    let text: String = text.chars().take(1200).collect();

    let chunks = chunk_text(&text, 500, 50);
    assert_eq!(chunks.len(), 3);

    let tail: String = {
        let c: Vec<char> = chunks[0].chars().collect();
        c[c.len() - 50..].iter().collect()
    };
    assert!(chunks[1].starts_with(tail.trim_start()));
}

async fn scenario_b(backend: &str) {
    let tmp = TempDir::new().unwrap();
    let (config, pipeline) = ingested_pipeline(tmp.path(), backend).await;

    let results = pipeline
        .retriever()
        .retrieve("what is fatigue", 2)
        .await
        .unwrap();
    assert!(!results.is_empty() && results.len() <= 2);
    assert_eq!(results[0].text, "Fatigue is a symptom of anemia");
    assert_eq!(results[0].source, "anemia.txt");
    assert_eq!(results[0].page, 1);
    assert!(results[0].similarity > 0.0 && results[0].similarity <= 1.0);
    for pair in results.windows(2) {
        assert!(pair[0].similarity >= pair[1].similarity);
    }

    let context = build_context(&results);
    assert!(context.starts_with("[Source 1: anemia.txt, Page 1]"));

    let log = fs::read_to_string(&config.retrieval.log_path).unwrap();
    let entry: RetrievalLogEntry = serde_json::from_str(log.lines().last().unwrap()).unwrap();
    assert_eq!(entry.query, "what is fatigue");
    assert_eq!(entry.num_results, results.len());
    assert_eq!(entry.results[0].id, results[0].id);
}

#[tokio::test]
async fn scenario_b_sqlite() {
    scenario_b("sqlite").await;
}

#[tokio::test]
async fn scenario_b_memory() {
    scenario_b("memory").await;
}

#[tokio::test]
async fn scenario_c_empty_index() {
    let tmp = TempDir::new().unwrap();
    let config = config(tmp.path(), "sqlite");
    let embedder = create_embedder(&config.embedding).unwrap();
    let index = create_index(&config).await.unwrap();
    index.ensure_index(&config.index.spec()).await.unwrap();
    let pipeline = RagPipeline::with_components(&config, embedder, index).unwrap();

    let (results, context) = pipeline.retrieve_only("what is fatigue", None).await.unwrap();
    assert!(results.is_empty());
    assert_eq!(context, NO_EVIDENCE);

    let log = fs::read_to_string(&config.retrieval.log_path).unwrap();
    let entry: RetrievalLogEntry = serde_json::from_str(log.trim()).unwrap();
    assert_eq!(entry.num_results, 0);
}

#[tokio::test]
async fn log_failure_does_not_fail_retrieval() {
    let tmp = TempDir::new().unwrap();
    write_docs(tmp.path());
    let blocker = tmp.path().join("not-a-dir");
    fs::write(&blocker, "x").unwrap();

    let mut config = config(tmp.path(), "memory");
    config.retrieval.log_path = blocker.join("retrieval_log.jsonl");
    let embedder = create_embedder(&config.embedding).unwrap();
    let index = create_index(&config).await.unwrap();
    let pages = collect_pages(&config, None, None).unwrap();
    ingest_pages(&config, &pages, &embedder, &index).await.unwrap();
    let pipeline = RagPipeline::with_components(&config, embedder, index).unwrap();

    let results = pipeline.retriever().retrieve("ferritin iron", 3).await.unwrap();
    assert_eq!(results[0].source, "iron.txt");
}

#[tokio::test]
async fn reingest_keeps_vector_count() {
    let tmp = TempDir::new().unwrap();
    write_docs(tmp.path());
    let config = config(tmp.path(), "sqlite");
    let embedder = create_embedder(&config.embedding).unwrap();
    let index = create_index(&config).await.unwrap();
    let pages = collect_pages(&config, None, None).unwrap();

    let first = ingest_pages(&config, &pages, &embedder, &index).await.unwrap();
    let second = ingest_pages(&config, &pages, &embedder, &index).await.unwrap();
    assert_eq!(first.chunks, second.chunks);
    assert_eq!(index.count().await.unwrap(), first.chunks);
}

#[tokio::test]
async fn index_dimension_conflict_surfaces() {
    let tmp = TempDir::new().unwrap();
    write_docs(tmp.path());
    let config = config(tmp.path(), "sqlite");
    let index = create_index(&config).await.unwrap();
    index
        .ensure_index(&IndexSpec::cosine(config.index.name.clone(), 64))
        .await
        .unwrap();

    let embedder = create_embedder(&config.embedding).unwrap();
    let pages = collect_pages(&config, None, None).unwrap();
    let err = ingest_pages(&config, &pages, &embedder, &index)
        .await
        .unwrap_err();
    assert!(format!("{:#}", err).contains("DimensionMismatch"));
}

#[tokio::test]
async fn concurrent_queries_share_one_log() {
    let tmp = TempDir::new().unwrap();
    let (config, pipeline) = ingested_pipeline(tmp.path(), "memory").await;
    let pipeline = Arc::new(pipeline);

    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let p = pipeline.clone();
            tokio::spawn(async move {
                p.retrieve_only(&format!("anemia question {}", i), Some(2))
                    .await
                    .unwrap()
            })
        })
        .collect();
    for t in tasks {
        t.await.unwrap();
    }

    let log = fs::read_to_string(&config.retrieval.log_path).unwrap();
    assert_eq!(log.lines().count(), 16);
    for line in log.lines() {
        serde_json::from_str::<RetrievalLogEntry>(line).unwrap();
    }
}
