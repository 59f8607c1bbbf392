//! Shared fakes and fixtures for the integration suites.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use async_trait::async_trait;

use askdoc::config::{load_config, Config};
use askdoc::embedding::EmbeddingProvider;
use askdoc::llm::ChatModel;

/// Deterministic embedder: maps a few known topic words onto
/// axis-aligned vectors so similarity ordering is predictable, and
/// counts calls so tests can observe rebuild-vs-load behavior.
pub struct FakeEmbedder {
    calls: AtomicUsize,
}

impl FakeEmbedder {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }

    #[allow(dead_code)]
    pub fn embed_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for FakeEmbedder {
    fn model_name(&self) -> &str {
        "fake-embedder"
    }

    fn dims(&self) -> usize {
        4
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts
            .iter()
            .map(|t| {
                let t = t.to_lowercase();
                let mut v = vec![0.0f32; 4];
                if t.contains("france") || t.contains("paris") {
                    v[0] = 1.0;
                }
                if t.contains("japan") || t.contains("tokyo") {
                    v[1] = 1.0;
                }
                if t.contains("rust") {
                    v[2] = 1.0;
                }
                // Keep every vector nonzero so cosine similarity is defined.
                v[3] = 0.1;
                v
            })
            .collect())
    }
}

/// Scripted chat model driven by a closure over (system, user) prompts.
pub struct FakeChat {
    reply: Box<dyn Fn(&str, &str) -> Result<String> + Send + Sync>,
}

impl FakeChat {
    pub fn replying<F>(reply: F) -> Self
    where
        F: Fn(&str, &str) -> Result<String> + Send + Sync + 'static,
    {
        Self {
            reply: Box::new(reply),
        }
    }

    /// A cooperative model: answers about France when the context
    /// mentions Paris, otherwise emits the refusal phrase.
    pub fn cooperative() -> Self {
        Self::replying(|_system, user| {
            if user.contains("Paris") && user.contains("France?") {
                Ok("Paris is the capital of France.".to_string())
            } else {
                Ok("I don't know.".to_string())
            }
        })
    }
}

#[async_trait]
impl ChatModel for FakeChat {
    fn model_name(&self) -> &str {
        "fake-chat"
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        (self.reply)(system, user)
    }
}

/// Write a config pointing every path into `dir`, with a plain-text
/// source document containing `document_text`.
pub fn test_config(dir: &Path, document_text: &str) -> Config {
    test_config_with_file(dir, "doc.txt", document_text.as_bytes())
}

/// Like [`test_config`], but with arbitrary document bytes under a
/// chosen file name (e.g. a PDF fixture).
pub fn test_config_with_file(dir: &Path, file_name: &str, document: &[u8]) -> Config {
    std::fs::write(dir.join(file_name), document).unwrap();

    let body = format!(
        r#"[document]
path = "{dir}/{file_name}"

[index]
path = "{dir}/index.bin"

[chunking]
chunk_size = 1000
chunk_overlap = 150

[retrieval]
top_k = 3

[provider]
dims = 4

[accounts]
db_path = "{dir}/accounts.sqlite"

[auth]
secret = "integration-test-secret"
token_expiry_mins = 30

[server]
bind = "127.0.0.1:0"
cors_origin = "http://localhost:3000"
"#,
        dir = dir.display(),
        file_name = file_name
    );

    let path = dir.join("askdoc.toml");
    std::fs::write(&path, body).unwrap();
    load_config(&path).unwrap()
}
