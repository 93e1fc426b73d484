use crate::error::Result;

/// Maps text to fixed-dimension vectors.
///
/// Implementations must be deterministic for a given `model_id`: the same text
/// always yields the same vector. An index is only meaningful when queried with
/// the embedder that built it.
pub trait Embedder: Send + Sync {
    /// Stable identifier of the model (and its revision) behind this embedder.
    fn model_id(&self) -> &str;
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut out = self.embed_batch(&[text.to_string()])?;
        out.pop().ok_or_else(|| crate::error::Error::model_unavailable(self.model_id(), "empty embedding batch"))
    }
}

/// Produces a continuation for a prompt.
///
/// Sampling is not deterministic: identical prompts may yield different, equally
/// valid outputs. Callers must check properties of the text, never exact values.
pub trait Generator: Send + Sync {
    fn model_id(&self) -> &str;
    fn generate(&self, prompt: &str) -> Result<String>;
}
