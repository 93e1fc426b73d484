//! credirag-embed
//!
//! The embedding model used at both ingest and query time. `BertEmbedder`
//! runs a sentence-transformer through candle; `FakeEmbedder` is a hashing
//! stand-in selected with `APP_USE_FAKE_EMBEDDINGS=1`.

pub mod bert;
pub mod device;
pub mod fake;
pub mod pool;
pub mod tokenize;

pub use bert::BertEmbedder;
pub use fake::FakeEmbedder;
pub use pool::masked_mean_l2;

use credirag_core::config::EmbeddingSettings;
use credirag_core::error::Result;
use credirag_core::traits::Embedder;

pub fn use_fake_embeddings() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// The configured embedder, or the fake one when `APP_USE_FAKE_EMBEDDINGS` is set.
pub fn get_default_embedder(settings: &EmbeddingSettings) -> Result<Box<dyn Embedder>> {
    if use_fake_embeddings() {
        tracing::info!("using FakeEmbedder");
        return Ok(Box::new(FakeEmbedder::default()));
    }
    Ok(Box::new(BertEmbedder::load(settings)?))
}
