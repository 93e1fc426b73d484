use std::hash::{Hash, Hasher};
use twox_hash::XxHash64;

use credirag_core::error::Result;
use credirag_core::traits::Embedder;

pub const FAKE_DIM: usize = 1024;

/// Deterministic bag-of-features embedder for tests and offline runs.
///
/// Each lowercase word and each of its character trigrams is hashed into one
/// of `dim` buckets; texts sharing words or word fragments land close together.
pub struct FakeEmbedder {
    dim: usize,
    id: String,
}

impl FakeEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim, id: format!("fake:xxhash64:d{dim}") }
    }

    fn bump(&self, v: &mut [f32], feature: &str, weight: f32) {
        let mut hasher = XxHash64::with_seed(0);
        feature.hash(&mut hasher);
        let h = hasher.finish();
        let idx = (h as usize) % self.dim;
        let val = (((h >> 32) as u32) as f32) / (u32::MAX as f32);
        v[idx] += weight * (0.5 + val);
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        self.bump(&mut v, "<bias>", 0.05);
        let lowered = text.to_lowercase();
        for word in lowered.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
            self.bump(&mut v, &format!("w:{word}"), 1.0);
            let chars: Vec<char> = word.chars().collect();
            for tri in chars.windows(3) {
                let tri: String = tri.iter().collect();
                self.bump(&mut v, &format!("t:{tri}"), 0.5);
            }
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-6);
        for x in &mut v { *x /= norm; }
        v
    }
}

impl Default for FakeEmbedder {
    fn default() -> Self { Self::new(FAKE_DIM) }
}

impl Embedder for FakeEmbedder {
    fn model_id(&self) -> &str { &self.id }
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { usize::MAX }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}
