//! TOML configuration.
//!
//! Every tunable of the retrieval stack lives in one file (default
//! `./config/medassist.toml`). Secrets never do: API keys are read from the
//! environment variables the config names.
//!
//! ```toml
//! [chunking]
//! chunk_size = 500
//! overlap = 50
//!
//! [retrieval]
//! top_k = 5
//! log_path = "logs/retrieval_log.jsonl"
//!
//! [embedding]
//! provider = "local"
//! model = "all-minilm-l6-v2"
//! dims = 384
//!
//! [index]
//! backend = "sqlite"
//! path = "data/medassist.sqlite"
//! dims = 384
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use medassist_core::chunk::ChunkParams;
use medassist_core::index::{IndexSpec, Precision, SpaceType};
use medassist_core::retrieve::RetrieverParams;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_overlap")]
    pub overlap: usize,
    #[serde(default = "default_boundary_ratio")]
    pub boundary_ratio: f64,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            overlap: default_overlap(),
            boundary_ratio: default_boundary_ratio(),
        }
    }
}

impl ChunkingConfig {
    pub fn params(&self) -> ChunkParams {
        ChunkParams {
            chunk_size: self.chunk_size,
            overlap: self.overlap,
            boundary_ratio: self.boundary_ratio,
        }
    }
}

fn default_chunk_size() -> usize {
    500
}
fn default_overlap() -> usize {
    50
}
fn default_boundary_ratio() -> f64 {
    0.5
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// HNSW `ef` for approximate backends.
    #[serde(default = "default_search_breadth")]
    pub search_breadth: usize,
    #[serde(default = "default_log_path")]
    pub log_path: PathBuf,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            search_breadth: default_search_breadth(),
            log_path: default_log_path(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl RetrievalConfig {
    pub fn params(&self) -> RetrieverParams {
        RetrieverParams {
            default_top_k: self.top_k,
            search_breadth: self.search_breadth,
        }
    }
}

fn default_top_k() -> usize {
    5
}
fn default_search_breadth() -> usize {
    128
}
fn default_log_path() -> PathBuf {
    PathBuf::from("logs/retrieval_log.jsonl")
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_dims")]
    pub dims: usize,
    /// Base URL for HTTP providers.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            dims: default_dims(),
            url: None,
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_provider() -> String {
    "local".to_string()
}
fn default_dims() -> usize {
    384
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    #[serde(default = "default_backend")]
    pub backend: String,
    #[serde(default = "default_index_name")]
    pub name: String,
    /// SQLite file for the `sqlite` backend.
    #[serde(default = "default_index_path")]
    pub path: PathBuf,
    #[serde(default = "default_dims")]
    pub dims: usize,
    #[serde(default = "default_precision")]
    pub precision: Precision,
    #[serde(default = "default_upsert_batch_size")]
    pub upsert_batch_size: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            name: default_index_name(),
            path: default_index_path(),
            dims: default_dims(),
            precision: default_precision(),
            upsert_batch_size: default_upsert_batch_size(),
        }
    }
}

impl IndexConfig {
    pub fn spec(&self) -> IndexSpec {
        IndexSpec {
            name: self.name.clone(),
            dims: self.dims,
            space: SpaceType::Cosine,
            precision: self.precision,
        }
    }
}

fn default_backend() -> String {
    "sqlite".to_string()
}
fn default_index_name() -> String {
    "medical_docs".to_string()
}
fn default_index_path() -> PathBuf {
    PathBuf::from("data/medassist.sqlite")
}
fn default_precision() -> Precision {
    Precision::F16
}
fn default_upsert_batch_size() -> usize {
    50
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_llm_url")]
    pub url: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    /// Name of the environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            url: default_llm_url(),
            model: default_llm_model(),
            api_key_env: default_api_key_env(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            top_p: default_top_p(),
            timeout_secs: default_llm_timeout_secs(),
        }
    }
}

fn default_llm_url() -> String {
    "https://api.groq.com/openai/v1".to_string()
}
fn default_llm_model() -> String {
    "llama-3.3-70b-versatile".to_string()
}
fn default_api_key_env() -> String {
    "GROQ_API_KEY".to_string()
}
fn default_temperature() -> f32 {
    0.3
}
fn default_max_tokens() -> u32 {
    2048
}
fn default_top_p() -> f32 {
    0.9
}
fn default_llm_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    #[serde(default = "default_ingest_dirs")]
    pub dirs: Vec<PathBuf>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            dirs: default_ingest_dirs(),
        }
    }
}

fn default_ingest_dirs() -> Vec<PathBuf> {
    vec![PathBuf::from("data/raw"), PathBuf::from("data/medical_docs")]
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:5000".to_string()
}

impl Config {
    /// All defaults, for commands that can run without a config file.
    pub fn minimal() -> Self {
        Self::default()
    }

    /// Check cross-field constraints. Called by [`load_config`] and [`parse_config`].
    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_size == 0 {
            bail!("chunking.chunk_size must be > 0");
        }
        if self.chunking.overlap >= self.chunking.chunk_size {
            bail!(
                "chunking.overlap ({}) must be smaller than chunking.chunk_size ({})",
                self.chunking.overlap,
                self.chunking.chunk_size
            );
        }
        if !(self.chunking.boundary_ratio > 0.0 && self.chunking.boundary_ratio < 1.0) {
            bail!("chunking.boundary_ratio must be in (0.0, 1.0)");
        }

        if self.retrieval.top_k < 1 {
            bail!("retrieval.top_k must be >= 1");
        }
        if self.retrieval.search_breadth < self.retrieval.top_k {
            bail!(
                "retrieval.search_breadth ({}) must be >= retrieval.top_k ({})",
                self.retrieval.search_breadth,
                self.retrieval.top_k
            );
        }
        if self.retrieval.timeout_secs == 0 {
            bail!("retrieval.timeout_secs must be > 0");
        }

        match self.embedding.provider.as_str() {
            "disabled" | "openai" | "ollama" | "local" | "hashing" => {}
            other => bail!(
                "Unknown embedding provider: '{}'. Must be disabled, openai, ollama, local, or hashing.",
                other
            ),
        }
        if self.embedding.is_enabled() {
            if self.embedding.dims == 0 {
                bail!(
                    "embedding.dims must be > 0 when provider is '{}'",
                    self.embedding.provider
                );
            }
            if self.embedding.dims != self.index.dims {
                bail!(
                    "embedding.dims ({}) does not match index.dims ({})",
                    self.embedding.dims,
                    self.index.dims
                );
            }
            if matches!(self.embedding.provider.as_str(), "openai" | "ollama")
                && self.embedding.model.is_none()
            {
                bail!(
                    "embedding.model must be specified when provider is '{}'",
                    self.embedding.provider
                );
            }
            if self.embedding.batch_size == 0 {
                bail!("embedding.batch_size must be > 0");
            }
        }

        match self.index.backend.as_str() {
            "sqlite" | "memory" => {}
            other => bail!(
                "Unknown index backend: '{}'. Must be sqlite or memory.",
                other
            ),
        }
        if self.index.dims == 0 {
            bail!("index.dims must be > 0");
        }
        if self.index.upsert_batch_size == 0 {
            bail!("index.upsert_batch_size must be > 0");
        }

        Ok(())
    }
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    config.validate()?;
    Ok(config)
}

/// Read, parse and validate the configuration file at `path`.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}
