//! Persistent vector index over document chunks.
//!
//! The index is the full set of (chunk, embedding) pairs serialized as a
//! single on-disk artifact. Retrieval is exact nearest-neighbor: embed
//! the query, score every stored vector by cosine similarity, and take
//! the top k. At the scale of one document this beats maintaining an
//! approximate structure.
//!
//! Lifecycle: built from scratch when the artifact is absent or a
//! rebuild is requested, otherwise loaded once and shared read-only for
//! the process lifetime. There is no incremental update path; a rebuild
//! always re-embeds the full chunk set.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::config::Config;
use crate::embedding::{cosine_similarity, embed_query, EmbeddingProvider};
use crate::ingest;
use crate::models::{Chunk, RetrievedChunk};

/// Load the persisted index, or ingest the source document and build a
/// fresh one when the artifact is absent or `rebuild` is set.
///
/// `rebuild` is an explicit value handed in by the caller (CLI flag or
/// startup configuration); nothing here inspects process arguments.
pub async fn prepare_index(
    config: &Config,
    provider: &dyn EmbeddingProvider,
    rebuild: bool,
) -> Result<VectorIndex> {
    let path = &config.index.path;

    if rebuild || !VectorIndex::exists(path) {
        info!(index = %path.display(), "building vector index from source document");
        let chunks = ingest::load_chunks(config)?;
        let index = VectorIndex::build(chunks, provider, config.provider.batch_size).await?;
        index.save(path)?;
        info!(index = %path.display(), "vector index written");
        Ok(index)
    } else {
        info!(index = %path.display(), "loading vector index");
        let index = VectorIndex::load(path)?;
        index.verify_provider(provider)?;
        Ok(index)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VectorIndex {
    /// Embedding model the vectors were produced with.
    model: String,
    dims: usize,
    chunks: Vec<Chunk>,
    vectors: Vec<Vec<f32>>,
}

impl VectorIndex {
    /// Embed every chunk and construct the index.
    ///
    /// Chunks are embedded in batches of `batch_size`; any provider
    /// failure aborts the build.
    pub async fn build(
        chunks: Vec<Chunk>,
        provider: &dyn EmbeddingProvider,
        batch_size: usize,
    ) -> Result<Self> {
        let mut vectors = Vec::with_capacity(chunks.len());

        for batch in chunks.chunks(batch_size.max(1)) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let mut batch_vectors = provider
                .embed(&texts)
                .await
                .context("Failed to embed document chunks")?;

            if batch_vectors.len() != batch.len() {
                bail!(
                    "Embedding provider returned {} vectors for {} chunks",
                    batch_vectors.len(),
                    batch.len()
                );
            }
            vectors.append(&mut batch_vectors);
        }

        info!(
            chunks = chunks.len(),
            model = provider.model_name(),
            "built vector index"
        );

        Ok(Self {
            model: provider.model_name().to_string(),
            dims: provider.dims(),
            chunks,
            vectors,
        })
    }

    /// Serialize the index to `path`, overwriting any prior artifact.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let bytes = bincode::serialize(self).context("Failed to serialize vector index")?;
        std::fs::write(path, bytes)
            .with_context(|| format!("Failed to write vector index: {}", path.display()))?;
        Ok(())
    }

    /// Load a previously persisted index.
    ///
    /// Fails if the artifact is absent or corrupt; callers check
    /// [`exists`](Self::exists) first or trigger a build instead.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read vector index: {}", path.display()))?;
        let index: Self =
            bincode::deserialize(&bytes).context("Vector index artifact is corrupt")?;
        Ok(index)
    }

    /// Whether an artifact exists at `path`.
    pub fn exists(path: &Path) -> bool {
        path.exists()
    }

    /// Check the artifact against the configured provider. A mismatched
    /// model or dimensionality means the stored vectors are unusable.
    pub fn verify_provider(&self, provider: &dyn EmbeddingProvider) -> Result<()> {
        if self.model != provider.model_name() || self.dims != provider.dims() {
            bail!(
                "Vector index was built with model '{}' ({} dims) but the configured provider is '{}' ({} dims); rebuild the index",
                self.model,
                self.dims,
                provider.model_name(),
                provider.dims(),
            );
        }
        Ok(())
    }

    /// Embed `query` and return the `k` nearest chunks, nearest first.
    pub async fn retrieve(
        &self,
        provider: &dyn EmbeddingProvider,
        query: &str,
        k: usize,
    ) -> Result<Vec<RetrievedChunk>> {
        let query_vec = embed_query(provider, query).await?;

        let mut scored: Vec<RetrievedChunk> = self
            .chunks
            .iter()
            .zip(self.vectors.iter())
            .map(|(chunk, vec)| RetrievedChunk {
                chunk: chunk.clone(),
                score: cosine_similarity(&query_vec, vec),
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(k);

        Ok(scored)
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}
