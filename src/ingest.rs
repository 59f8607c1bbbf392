//! Document ingestion.
//!
//! Loads the configured source document, extracts its text, and splits
//! it into overlapping chunks. Runs once at startup (or on an explicit
//! rebuild); it never touches the index itself.

use anyhow::{Context, Result};
use tracing::info;

use crate::chunk::split_text;
use crate::config::Config;
use crate::extract::extract_text;
use crate::models::Chunk;

/// Load the source document and produce its ordered chunk sequence.
///
/// Fails fatally if the document is missing or unreadable; there is no
/// partial-ingestion recovery.
pub fn load_chunks(config: &Config) -> Result<Vec<Chunk>> {
    let path = &config.document.path;
    let text = extract_text(path)
        .with_context(|| format!("Failed to ingest source document: {}", path.display()))?;

    let chunks = split_text(
        &text,
        config.chunking.chunk_size,
        config.chunking.chunk_overlap,
    );

    info!(
        document = %path.display(),
        characters = text.len(),
        chunks = chunks.len(),
        "ingested source document"
    );

    Ok(chunks)
}
