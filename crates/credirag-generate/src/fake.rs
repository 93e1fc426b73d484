use rand::seq::SliceRandom;

use credirag_core::error::Result;
use credirag_core::traits::Generator;

use crate::extract::ANSWER_MARKER;

const NO_CONTEXT: &str = "No related complaints were found for this question.";

/// Extractive stand-in for a language model.
///
/// Picks up to `max_sentences` random sentences from the prompt's context
/// block, so repeated calls on one prompt may differ while staying grounded.
pub struct FakeGenerator {
    max_sentences: usize,
}

impl FakeGenerator {
    pub fn new(max_sentences: usize) -> Self { Self { max_sentences: max_sentences.max(1) } }
}

impl Default for FakeGenerator {
    fn default() -> Self { Self::new(3) }
}

impl Generator for FakeGenerator {
    fn model_id(&self) -> &str { "fake:extractive" }

    fn generate(&self, prompt: &str) -> Result<String> {
        let sentences = context_sentences(prompt);
        let mut rng = rand::thread_rng();
        let picked: Vec<&str> = sentences.choose_multiple(&mut rng, self.max_sentences).copied().collect();
        let body = if picked.is_empty() { NO_CONTEXT.to_string() } else { picked.join(" ") };
        Ok(format!("{ANSWER_MARKER} {body}"))
    }
}

fn context_sentences(prompt: &str) -> Vec<&str> {
    let Some(start) = prompt.find("Context:") else { return Vec::new() };
    let block = &prompt[start + "Context:".len()..];
    let block = block.find("Question:").map_or(block, |end| &block[..end]);
    block
        .split_inclusive(|c: char| matches!(c, '.' | '!' | '?' | '\n'))
        .map(str::trim)
        .filter(|s| s.chars().any(char::is_alphanumeric))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answers_only_from_context() {
        let prompt = "Intro.\nContext:\nthe fee was charged twice. the refund never came!\n\nQuestion:\nwhat happened?\n\nAnswer (in 3-4 sentences):";
        let g = FakeGenerator::new(2);
        for _ in 0..10 {
            let out = g.generate(prompt).expect("generate");
            let body = out.strip_prefix("Answer: ").expect("marker");
            assert!(!body.is_empty());
            for s in ["the fee was charged twice.", "the refund never came!"] {
                assert!(body.contains(s));
            }
            assert!(!body.contains("what happened"));
        }
    }

    #[test]
    fn empty_context_gives_fallback() {
        let out = FakeGenerator::default().generate("Context:\n\n\nQuestion:\nwhy?").expect("generate");
        assert_eq!(out, format!("Answer: {NO_CONTEXT}"));
    }
}
