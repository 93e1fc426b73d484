use candle_core::{Device, Tensor};
use tokenizers::Tokenizer;

/// Token ids and attention mask for a batch, each `[B, T]` where `T` is the
/// longest encoding in the batch capped at `max_len`.
pub struct TokenBatch {
    pub input_ids: Tensor,
    pub attention_mask: Tensor,
}

pub fn tokenize_batch(
    tokenizer: &Tokenizer,
    texts: &[String],
    max_len: usize,
    pad_id: u32,
    device: &Device,
) -> Result<TokenBatch, String> {
    let mut rows = Vec::with_capacity(texts.len());
    for text in texts {
        let enc = tokenizer.encode(text.as_str(), true).map_err(|e| format!("tokenization failed: {e}"))?;
        let mut ids = enc.get_ids().to_vec();
        let mut mask = enc.get_attention_mask().to_vec();
        ids.truncate(max_len);
        mask.truncate(max_len);
        rows.push((ids, mask));
    }
    let width = rows.iter().map(|(ids, _)| ids.len()).max().unwrap_or(0).max(1);
    let mut flat_ids = Vec::with_capacity(rows.len() * width);
    let mut flat_mask = Vec::with_capacity(rows.len() * width);
    for (mut ids, mut mask) in rows {
        ids.resize(width, pad_id);
        mask.resize(width, 0);
        flat_ids.extend(ids);
        flat_mask.extend(mask);
    }
    let shape = (texts.len(), width);
    let input_ids = Tensor::from_vec(flat_ids, shape, device).map_err(|e| e.to_string())?;
    let attention_mask = Tensor::from_vec(flat_mask, shape, device).map_err(|e| e.to_string())?;
    Ok(TokenBatch { input_ids, attention_mask })
}
