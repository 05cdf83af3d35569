//! End-to-end question answering: retrieve, assemble context, generate.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use serde::Serialize;

use medassist_core::context::build_context;
use medassist_core::embedding::Embedder;
use medassist_core::index::VectorIndex;
use medassist_core::models::RetrievedResult;
use medassist_core::retrieve::{RetrievalError, Retriever};

use crate::config::Config;
use crate::embedding::create_embedder;
use crate::generate::{GenerateError, Generator};
use crate::retrieval_log::JsonlRetrievalLog;
use crate::sqlite_index::create_index;

/// A generated answer together with the evidence it was grounded on.
#[derive(Debug, Clone, Serialize)]
pub struct RagAnswer {
    pub question: String,
    pub answer: String,
    pub sources: Vec<RetrievedResult>,
    pub context_used: String,
}

/// Which stage of [`RagPipeline::query`] failed.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),
    #[error(transparent)]
    Generation(#[from] GenerateError),
}

pub struct RagPipeline {
    retriever: Retriever,
    generator: Generator,
    timeout: Duration,
}

impl RagPipeline {
    pub fn new(retriever: Retriever, generator: Generator, timeout: Duration) -> Self {
        Self {
            retriever,
            generator,
            timeout,
        }
    }

    /// Wire the configured embedder, index, JSONL log and generator together.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let embedder = create_embedder(&config.embedding)?;
        let index = create_index(config).await?;
        Self::with_components(config, embedder, index)
    }

    /// Like [`from_config`](Self::from_config) over an existing embedder and
    /// index, so an in-process ingest and the server share one index.
    pub fn with_components(
        config: &Config,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
    ) -> Result<Self> {
        let sink = Arc::new(JsonlRetrievalLog::new(&config.retrieval.log_path));
        let retriever = Retriever::new(embedder, index, sink, config.retrieval.params());
        let generator = Generator::new(&config.llm)?;
        Ok(Self::new(
            retriever,
            generator,
            Duration::from_secs(config.retrieval.timeout_secs),
        ))
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    async fn retrieve(&self, question: &str, top_k: usize) -> Result<Vec<RetrievedResult>, RetrievalError> {
        tokio::time::timeout(self.timeout, self.retriever.retrieve(question, top_k))
            .await
            .map_err(|_| RetrievalError::Timeout {
                stage: "retrieval",
                secs: self.timeout.as_secs(),
            })?
    }

    /// Retrieve and build the context block without calling the LLM.
    pub async fn retrieve_only(
        &self,
        question: &str,
        top_k: Option<usize>,
    ) -> Result<(Vec<RetrievedResult>, String), RetrievalError> {
        let top_k = top_k.unwrap_or(self.retriever.params().default_top_k);
        let results = self.retrieve(question, top_k).await?;
        let context = build_context(&results);
        Ok((results, context))
    }

    /// Full RAG: retrieve, build context, generate a grounded answer.
    pub async fn query(
        &self,
        question: &str,
        api_key: Option<&str>,
    ) -> Result<RagAnswer, PipelineError> {
        let (sources, context) = self.retrieve_only(question, None).await?;
        tracing::debug!(sources = sources.len(), "context assembled");
        let answer = self.generator.generate(&context, question, api_key).await?;

        Ok(RagAnswer {
            question: question.to_string(),
            answer,
            sources,
            context_used: context,
        })
    }
}
