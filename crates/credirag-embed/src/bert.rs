//! Sentence-transformer embeddings on candle's BERT implementation.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig, DTYPE};
use tokenizers::Tokenizer;

use credirag_core::config::EmbeddingSettings;
use credirag_core::error::{Error, Result};
use credirag_core::traits::Embedder;

use crate::device::select_device;
use crate::pool::masked_mean_l2;
use crate::tokenize::tokenize_batch;

pub struct BertEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    model_id: String,
    dim: usize,
    max_len: usize,
    pad_id: u32,
}

impl BertEmbedder {
    /// Load `config.json`, `tokenizer.json` and `model.safetensors` (or
    /// `pytorch_model.bin`) from the configured model directory.
    pub fn load(settings: &EmbeddingSettings) -> Result<Self> {
        let model_id = settings.model_id.clone();
        let unavailable = |reason: String| Error::model_unavailable(&model_id, reason);
        let model_dir = resolve_model_dir(&settings.model_dir)
            .ok_or_else(|| unavailable(format!("model directory {} not found", settings.model_dir.display())))?;
        let device = select_device();
        tracing::info!(model = %model_id, dir = %model_dir.display(), "loading embedding model");

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| unavailable(format!("failed to load tokenizer from {}: {}", tokenizer_path.display(), e)))?;
        let pad_id = tokenizer.token_to_id("[PAD]").unwrap_or(0);

        let config_text = std::fs::read_to_string(model_dir.join("config.json"))
            .map_err(|e| unavailable(format!("failed to read config.json: {e}")))?;
        let config: BertConfig = serde_json::from_str(&config_text).map_err(|e| unavailable(format!("bad config.json: {e}")))?;
        let dim = serde_json::from_str::<serde_json::Value>(&config_text)
            .ok()
            .and_then(|v| v.get("hidden_size").and_then(|h| h.as_u64()))
            .ok_or_else(|| unavailable("config.json has no hidden_size".to_string()))? as usize;

        let vb = load_weights(&model_dir, &device).map_err(unavailable)?;
        let model = BertModel::load(vb, &config).map_err(|e| unavailable(format!("failed to build model: {e}")))?;
        tracing::info!(model = %model_id, dim, "embedding model loaded");

        Ok(Self { model, tokenizer, device, model_id, dim, max_len: settings.max_len, pad_id })
    }

    fn forward(&self, texts: &[String]) -> std::result::Result<Vec<Vec<f32>>, String> {
        let batch = tokenize_batch(&self.tokenizer, texts, self.max_len, self.pad_id, &self.device)?;
        let token_type_ids = batch.input_ids.zeros_like().map_err(|e| e.to_string())?;
        let hidden = self
            .model
            .forward(&batch.input_ids, &token_type_ids, Some(&batch.attention_mask))
            .map_err(|e| e.to_string())?;
        let pooled = masked_mean_l2(&hidden, &batch.attention_mask).map_err(|e| e.to_string())?;
        let pooled = pooled.to_dtype(DType::F32).and_then(|t| t.to_device(&Device::Cpu)).map_err(|e| e.to_string())?;
        pooled.to_vec2::<f32>().map_err(|e| e.to_string())
    }
}

impl Embedder for BertEmbedder {
    fn model_id(&self) -> &str { &self.model_id }
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { self.max_len }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() { return Ok(Vec::new()); }
        let start = Instant::now();
        let out = self.forward(texts).map_err(|e| Error::model_unavailable(&self.model_id, e))?;
        tracing::debug!(batch = texts.len(), elapsed_ms = start.elapsed().as_millis() as u64, "embedded batch");
        Ok(out)
    }
}

fn load_weights(model_dir: &Path, device: &Device) -> std::result::Result<VarBuilder<'static>, String> {
    let safetensors = model_dir.join("model.safetensors");
    if safetensors.exists() {
        // SAFETY: the weights file is not modified while mapped.
        return unsafe { VarBuilder::from_mmaped_safetensors(&[safetensors], DTYPE, device) }.map_err(|e| e.to_string());
    }
    let pickle = model_dir.join("pytorch_model.bin");
    if pickle.exists() {
        let weights = candle_core::pickle::read_all(&pickle).map_err(|e| e.to_string())?;
        let weights: HashMap<String, Tensor> = weights.into_iter().collect();
        return Ok(VarBuilder::from_tensors(weights, DTYPE, device));
    }
    Err(format!("no model.safetensors or pytorch_model.bin in {}", model_dir.display()))
}

/// `APP_MODEL_DIR` wins over the configured directory when it exists.
fn resolve_model_dir(configured: &Path) -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("APP_MODEL_DIR") {
        let p = PathBuf::from(&dir);
        if p.exists() { tracing::info!(dir = %p.display(), "using APP_MODEL_DIR"); return Some(p); }
    }
    configured.exists().then(|| configured.to_path_buf())
}
