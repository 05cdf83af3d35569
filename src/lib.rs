//! # MedAssist
//!
//! Retrieval-augmented question answering over a medical document corpus.
//!
//! Documents are extracted page by page, chunked with attribution, embedded,
//! and upserted into a vector index. At query time the question is embedded,
//! the top-k passages are retrieved and rendered into a labelled context
//! block, and an LLM answers from that evidence with `[Source N]` citations.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌──────────────┐
//! │   Extract   │──▶│ Chunk+Embed  │──▶│ VectorIndex  │
//! │  PDF / TXT  │   │              │   │ SQLite / mem │
//! └─────────────┘   └──────────────┘   └──────┬───────┘
//!                                             │
//!                   ┌─────────────────────────┤
//!                   ▼                         ▼
//!             ┌───────────┐   context   ┌───────────┐
//!             │ Retriever │────────────▶│ Generator │
//!             │ + JSONL   │             │  (Groq)   │
//!             └───────────┘             └───────────┘
//! ```
//!
//! The pure retrieval logic lives in `medassist-core`; this crate adds the
//! I/O: configuration, providers, storage, logging, HTTP and CLI.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`db`] | SQLite connection and schema |
//! | [`embedding`] | Embedding providers |
//! | [`extract`] | PDF and text page extraction |
//! | [`generate`] | Chat-completions answer synthesis |
//! | [`ingest`] | Write path: extract → chunk → embed → upsert |
//! | [`pipeline`] | Query path: retrieve → context → generate |
//! | [`retrieval_log`] | JSONL audit trail |
//! | [`search`] | CLI reporting |
//! | [`server`] | HTTP API |
//! | [`sqlite_index`] | SQLite-backed vector index |

pub mod config;
pub mod db;
pub mod embedding;
pub mod extract;
pub mod generate;
pub mod ingest;
pub mod pipeline;
pub mod retrieval_log;
pub mod search;
pub mod server;
pub mod sqlite_index;
