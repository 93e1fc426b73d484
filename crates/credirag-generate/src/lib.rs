//! credirag-generate
//!
//! Prompt assembly, text generation and answer extraction for the query path.

pub mod extract;
pub mod fake;
pub mod llama;
pub mod prompt;

pub use extract::{AnswerExtractor, ANSWER_MARKER};
pub use fake::FakeGenerator;
pub use llama::QuantizedGenerator;
pub use prompt::{PromptAssembler, PROMPT_TEMPLATE};

use credirag_core::config::GenerationSettings;
use credirag_core::error::Result;
use credirag_core::traits::Generator;

pub fn use_fake_generator() -> bool {
    std::env::var("APP_USE_FAKE_GENERATOR")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// The configured generator, or the extractive fake when `APP_USE_FAKE_GENERATOR` is set.
pub fn get_default_generator(settings: &GenerationSettings) -> Result<Box<dyn Generator>> {
    if use_fake_generator() {
        tracing::info!("using FakeGenerator");
        return Ok(Box::new(FakeGenerator::default()));
    }
    Ok(Box::new(QuantizedGenerator::load(settings)?))
}
