use credirag_core::types::{Answer, RetrievedDocument};

pub const ANSWER_MARKER: &str = "Answer:";

/// Pulls the answer out of raw generator output.
#[derive(Debug, Clone)]
pub struct AnswerExtractor {
    marker: String,
}

impl Default for AnswerExtractor {
    fn default() -> Self { Self { marker: ANSWER_MARKER.to_string() } }
}

impl AnswerExtractor {
    pub fn new(marker: impl Into<String>) -> Self { Self { marker: marker.into() } }

    /// Text after the last marker, trimmed; the input unchanged when the marker is absent.
    pub fn extract(&self, generated: &str) -> String {
        match generated.rfind(&self.marker) {
            Some(pos) if !self.marker.is_empty() => generated[pos + self.marker.len()..].trim().to_string(),
            _ => generated.to_string(),
        }
    }

    pub fn package(&self, generated: &str, documents: Vec<RetrievedDocument>) -> Answer {
        Answer { text: self.extract(generated), documents }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn takes_text_after_last_marker() {
        let x = AnswerExtractor::default();
        assert_eq!(x.extract("...garbage...Answer: The refund was delayed."), "The refund was delayed.");
        assert_eq!(x.extract("Answer: one\nAnswer:  two "), "two");
    }

    #[test]
    fn missing_marker_returns_input_unchanged() {
        let x = AnswerExtractor::default();
        let raw = "  Customers report late fees.\n";
        assert_eq!(x.extract(raw), raw);
        assert_eq!(x.extract(""), "");
    }

    #[test]
    fn marker_at_end_gives_empty_answer() {
        assert_eq!(AnswerExtractor::default().extract("blah Answer:"), "");
    }
}
