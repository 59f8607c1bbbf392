use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub document: DocumentConfig,
    pub index: IndexConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    pub provider: ProviderConfig,
    #[serde(default)]
    pub answer: AnswerConfig,
    pub accounts: AccountsConfig,
    pub auth: AuthConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DocumentConfig {
    /// Path to the source document (PDF, or plain text for development).
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    /// Where the serialized vector index artifact lives.
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

fn default_chunk_size() -> usize {
    1000
}
fn default_chunk_overlap() -> usize {
    150
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

fn default_top_k() -> usize {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProviderConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_chat_model")]
    pub chat_model: String,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    /// Embedding vector dimensionality for the configured model.
    pub dims: usize,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_chat_model() -> String {
    "gpt-3.5-turbo".to_string()
}
fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}
fn default_max_tokens() -> u32 {
    1000
}
fn default_batch_size() -> usize {
    64
}

#[derive(Debug, Deserialize, Clone)]
pub struct AnswerConfig {
    /// Phrase the model is instructed to emit when the context is
    /// insufficient. Matched case-insensitively against the raw reply.
    #[serde(default = "default_refusal_phrase")]
    pub refusal_phrase: String,
    /// Fixed message substituted for ungrounded answers.
    #[serde(default = "default_out_of_scope_message")]
    pub out_of_scope_message: String,
}

impl Default for AnswerConfig {
    fn default() -> Self {
        Self {
            refusal_phrase: default_refusal_phrase(),
            out_of_scope_message: default_out_of_scope_message(),
        }
    }
}

fn default_refusal_phrase() -> String {
    "i don't know".to_string()
}
fn default_out_of_scope_message() -> String {
    "This query is out of the scope of the documentation.".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct AccountsConfig {
    pub db_path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// HMAC secret for signing access tokens.
    pub secret: String,
    #[serde(default = "default_token_expiry_mins")]
    pub token_expiry_mins: i64,
}

fn default_token_expiry_mins() -> i64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
    /// The single origin allowed to call this API from a browser.
    pub cors_origin: String,
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate chunking
    if config.chunking.chunk_size == 0 {
        anyhow::bail!("chunking.chunk_size must be > 0");
    }
    if config.chunking.chunk_overlap >= config.chunking.chunk_size {
        anyhow::bail!("chunking.chunk_overlap must be < chunking.chunk_size");
    }

    // Validate retrieval
    if config.retrieval.top_k < 1 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }

    // Validate provider
    if config.provider.dims == 0 {
        anyhow::bail!("provider.dims must be > 0");
    }

    // Validate answer
    if config.answer.refusal_phrase.trim().is_empty() {
        anyhow::bail!("answer.refusal_phrase must not be empty");
    }

    // Validate auth
    if config.auth.secret.trim().is_empty() {
        anyhow::bail!("auth.secret must not be empty");
    }
    if config.auth.token_expiry_mins < 1 {
        anyhow::bail!("auth.token_expiry_mins must be >= 1");
    }

    Ok(config)
}
