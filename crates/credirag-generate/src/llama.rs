//! Causal generation with a quantized llama-family model (GGUF) on candle.

use std::fs::File;
use std::path::Path;
use std::sync::Mutex;
use std::time::Instant;

use candle_core::quantized::gguf_file;
use candle_core::{Device, Tensor};
use candle_transformers::generation::LogitsProcessor;
use candle_transformers::models::quantized_llama::ModelWeights;
use tokenizers::Tokenizer;

use credirag_core::config::GenerationSettings;
use credirag_core::error::{Error, Result};
use credirag_core::traits::Generator;
use credirag_embed::device::select_device;

const DEFAULT_CONTEXT_LEN: usize = 2048;

pub struct QuantizedGenerator {
    // forward() needs &mut for the kv cache
    model: Mutex<ModelWeights>,
    tokenizer: Tokenizer,
    device: Device,
    model_id: String,
    eos_token: Option<u32>,
    context_len: usize,
    max_new_tokens: usize,
    temperature: f64,
    top_p: Option<f64>,
    seed: Option<u64>,
}

impl QuantizedGenerator {
    pub fn load(settings: &GenerationSettings) -> Result<Self> {
        let model_id = settings.model_id.clone();
        let unavailable = |reason: String| Error::model_unavailable(&model_id, reason);
        require_file(&settings.model_file).map_err(unavailable)?;
        require_file(&settings.tokenizer_file).map_err(unavailable)?;
        let device = select_device();
        tracing::info!(model = %model_id, file = %settings.model_file.display(), "loading generation model");
        let start = Instant::now();

        let mut file = File::open(&settings.model_file).map_err(|e| unavailable(e.to_string()))?;
        let content = gguf_file::Content::read(&mut file).map_err(|e| unavailable(format!("bad gguf file: {e}")))?;
        let context_len = content
            .metadata
            .get("llama.context_length")
            .and_then(|v| v.to_u32().ok())
            .map(|n| n as usize)
            .unwrap_or(DEFAULT_CONTEXT_LEN);
        let model = ModelWeights::from_gguf(content, &mut file, &device)
            .map_err(|e| unavailable(format!("failed to build model: {e}")))?;

        let tokenizer = Tokenizer::from_file(&settings.tokenizer_file)
            .map_err(|e| unavailable(format!("failed to load tokenizer: {e}")))?;
        let eos_token = tokenizer.token_to_id("</s>").or_else(|| tokenizer.token_to_id("<|endoftext|>"));
        tracing::info!(model = %model_id, context_len, elapsed_ms = start.elapsed().as_millis() as u64, "generation model loaded");

        Ok(Self {
            model: Mutex::new(model),
            tokenizer,
            device,
            model_id,
            eos_token,
            context_len,
            max_new_tokens: settings.max_new_tokens,
            temperature: settings.temperature,
            top_p: settings.top_p,
            seed: settings.seed,
        })
    }

    fn run(&self, prompt: &str) -> std::result::Result<String, String> {
        let encoding = self.tokenizer.encode(prompt, true).map_err(|e| e.to_string())?;
        let mut tokens = encoding.get_ids().to_vec();
        // keep the tail of an over-long prompt; the question sits at the end
        let budget = self.context_len.saturating_sub(self.max_new_tokens).max(1);
        if tokens.len() > budget {
            tracing::warn!(prompt_tokens = tokens.len(), budget, "truncating prompt");
            tokens.drain(..tokens.len() - budget);
        }

        let seed = self.seed.unwrap_or_else(rand::random);
        let mut sampler = LogitsProcessor::new(seed, Some(self.temperature), self.top_p);
        let mut model = self.model.lock().map_err(|_| "model lock poisoned".to_string())?;

        let mut generated: Vec<u32> = Vec::with_capacity(self.max_new_tokens);
        let mut input = Tensor::new(tokens.as_slice(), &self.device).and_then(|t| t.unsqueeze(0)).map_err(|e| e.to_string())?;
        let mut pos = 0usize;
        while generated.len() < self.max_new_tokens {
            let logits = model.forward(&input, pos).and_then(|l| l.squeeze(0)).map_err(|e| e.to_string())?;
            let next = sampler.sample(&logits).map_err(|e| e.to_string())?;
            if Some(next) == self.eos_token { break; }
            pos += input.dim(1).map_err(|e| e.to_string())?;
            generated.push(next);
            input = Tensor::new(&[next], &self.device).and_then(|t| t.unsqueeze(0)).map_err(|e| e.to_string())?;
        }
        self.tokenizer.decode(&generated, true).map_err(|e| e.to_string())
    }
}

impl Generator for QuantizedGenerator {
    fn model_id(&self) -> &str { &self.model_id }

    fn generate(&self, prompt: &str) -> Result<String> {
        let start = Instant::now();
        let text = self.run(prompt).map_err(|e| Error::model_unavailable(&self.model_id, e))?;
        tracing::debug!(chars = text.len(), elapsed_ms = start.elapsed().as_millis() as u64, "generated");
        Ok(text)
    }
}

fn require_file(path: &Path) -> std::result::Result<(), String> {
    if path.is_file() { Ok(()) } else { Err(format!("{} not found", path.display())) }
}
