//! # MedAssist Core
//!
//! Shared, I/O-free retrieval logic for MedAssist: data models, page
//! chunking, the embedder and vector index abstractions, retrieval
//! orchestration, and attributed context assembly.
//!
//! This crate contains no tokio, sqlx, filesystem I/O, or other
//! native-only dependencies. Concrete embedding providers, the SQLite
//! index backend, and the JSONL retrieval log live in the `medassist`
//! application crate.
//!
//! ## Query path
//!
//! ```text
//! question ──▶ Embedder::embed_one ──▶ VectorIndex::query ──▶ Retriever
//!                                                              │
//!                         RetrievalSink::record ◀──────────────┤
//!                                                              ▼
//!                                                 context::build_context
//! ```

pub mod chunk;
pub mod context;
pub mod embedding;
pub mod index;
pub mod log;
pub mod models;
pub mod retrieve;
