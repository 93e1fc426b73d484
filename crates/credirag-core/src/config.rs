//! Configuration loader, typed settings and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (nested keys separated by `__`, e.g. `APP_RETRIEVAL__K=8`). Relative paths are
//! resolved against the directory the config files were loaded from.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::metadata::MetadataPolicy;
use crate::normalize::FilterMode;

pub struct Config {
    figment: Figment,
    base_dir: PathBuf,
}

impl Config {
    /// Layer the files found in `dir`; `env_name` falls back to `RUST_ENV`, then `dev`.
    pub fn load_for_env(dir: &Path, env_name: Option<&str>) -> Result<Self> {
        let env_name = env_name
            .map(str::to_string)
            .unwrap_or_else(|| env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string()));

        let mut figment = Figment::new().merge(Toml::file(dir.join("config.toml")));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file(dir.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(dir.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(dir.join("config.test.toml"))),
            other => tracing::warn!(env = other, "unknown RUST_ENV, using config.toml only"),
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        Ok(Self { figment, base_dir: dir.to_path_buf() })
    }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::Configuration(format!("Failed to get '{}': {}", key, e)))
    }

    /// Extract, resolve and validate the full settings tree.
    pub fn settings(&self) -> Result<Settings> {
        let mut settings: Settings = self
            .figment
            .extract()
            .map_err(|e| Error::Configuration(e.to_string()))?;
        settings.resolve_paths(&self.base_dir);
        settings.validate()?;
        Ok(settings)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub data: DataSettings,
    pub ingest: IngestSettings,
    pub embedding: EmbeddingSettings,
    pub generation: GenerationSettings,
    pub retrieval: RetrievalSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    /// CSV/JSONL file, or a directory of them.
    pub dataset_path: PathBuf,
    pub index_dir: PathBuf,
    pub table_name: String,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            dataset_path: PathBuf::from("data/filtered_complaints.csv"),
            index_dir: PathBuf::from("vector_store/lancedb"),
            table_name: "complaints".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
    pub filter_mode: FilterMode,
    /// Minimum cleaned word count; `None` disables the length filter.
    pub min_words: Option<usize>,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// Texts per embedding call.
    pub embed_batch_size: usize,
    /// Entries per index write.
    pub batch_size: usize,
    pub id_column: String,
    pub category_column: String,
    pub narrative_column: String,
    /// Extra dataset columns copied into chunk metadata.
    pub metadata_columns: Vec<String>,
    pub metadata_policy: MetadataPolicy,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            filter_mode: FilterMode::Strict,
            min_words: None,
            chunk_size: 500,
            chunk_overlap: 50,
            embed_batch_size: 64,
            batch_size: 5000,
            id_column: "Complaint ID".to_string(),
            category_column: "Product".to_string(),
            narrative_column: "Consumer complaint narrative".to_string(),
            metadata_columns: Vec::new(),
            metadata_policy: MetadataPolicy::Stringify,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub model_id: String,
    /// Directory holding `config.json`, `tokenizer.json` and the weights.
    pub model_dir: PathBuf,
    pub max_len: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model_id: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
            model_dir: PathBuf::from("models/all-MiniLM-L6-v2"),
            max_len: 256,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub model_id: String,
    /// Quantized GGUF weights.
    pub model_file: PathBuf,
    pub tokenizer_file: PathBuf,
    pub max_new_tokens: usize,
    pub temperature: f64,
    pub top_p: Option<f64>,
    /// Fixed sampling seed; a fresh random seed is drawn per call when absent.
    pub seed: Option<u64>,
    pub timeout_secs: Option<u64>,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model_id: "TinyLlama/TinyLlama-1.1B-Chat-v1.0".to_string(),
            model_file: PathBuf::from("models/tinyllama/tinyllama-1.1b-chat-v1.0.Q4_K_M.gguf"),
            tokenizer_file: PathBuf::from("models/tinyllama/tokenizer.json"),
            max_new_tokens: 256,
            temperature: 0.7,
            top_p: None,
            seed: None,
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub k: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self { Self { k: 5 } }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        let bad = |msg: String| -> Result<()> { Err(Error::Configuration(msg)) };
        let ingest = &self.ingest;
        if ingest.chunk_size == 0 || ingest.chunk_overlap == 0 {
            return bad(format!("chunk_size ({}) and chunk_overlap ({}) must be > 0", ingest.chunk_size, ingest.chunk_overlap));
        }
        if ingest.chunk_overlap >= ingest.chunk_size {
            return bad(format!("chunk_overlap ({}) must be smaller than chunk_size ({})", ingest.chunk_overlap, ingest.chunk_size));
        }
        if ingest.batch_size == 0 || ingest.embed_batch_size == 0 {
            return bad("batch_size and embed_batch_size must be > 0".to_string());
        }
        if self.data.table_name.trim().is_empty() {
            return bad("data.table_name is required".to_string());
        }
        if self.retrieval.k == 0 {
            return bad("retrieval.k must be > 0".to_string());
        }
        let generation = &self.generation;
        if !generation.temperature.is_finite() || generation.temperature <= 0.0 {
            return bad(format!("generation.temperature must be a positive number, got {}", generation.temperature));
        }
        if let Some(p) = generation.top_p {
            if !(p > 0.0 && p <= 1.0) {
                return bad(format!("generation.top_p must be in (0, 1], got {p}"));
            }
        }
        if generation.max_new_tokens == 0 {
            return bad("generation.max_new_tokens must be > 0".to_string());
        }
        if self.embedding.max_len == 0 {
            return bad("embedding.max_len must be > 0".to_string());
        }
        Ok(())
    }

    fn resolve_paths(&mut self, base: &Path) {
        for p in [
            &mut self.data.dataset_path,
            &mut self.data.index_dir,
            &mut self.embedding.model_dir,
            &mut self.generation.model_file,
            &mut self.generation.tokenizer_file,
        ] {
            *p = resolve_with_base(base, p.to_string_lossy());
        }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
