//! Core data types that flow through the ingestion and answer pipeline.

use serde::{Deserialize, Serialize};

/// A span of the source document produced by the splitter.
///
/// `offset` is the byte position of the span within the extracted
/// source text, kept as provenance so an answer can be traced back to
/// where its context came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub chunk_index: i64,
    pub text: String,
    pub offset: usize,
    /// SHA-256 of the chunk text.
    pub hash: String,
}

/// A chunk returned from the index with its similarity to the query.
#[derive(Debug, Clone)]
pub struct RetrievedChunk {
    pub chunk: Chunk,
    /// Cosine similarity to the query embedding, in `[-1.0, 1.0]`.
    pub score: f32,
}
