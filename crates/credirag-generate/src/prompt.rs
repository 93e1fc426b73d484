use credirag_core::error::{Error, Result};
use credirag_core::types::RetrievedDocument;

pub const PROMPT_TEMPLATE: &str = "You are a helpful assistant for a financial complaints company.
Use only the following complaint excerpts to answer the question.

Summarize the common problems mentioned by customers. Do not make up information.
Avoid repeating sentences or listing generic facts.

Context:
{context}

Question:
{question}

Answer (in 3-4 sentences):";

const CONTEXT: &str = "{context}";
const QUESTION: &str = "{question}";

/// Renders retrieved excerpts and a question into the grounding prompt.
///
/// Pure: the same documents and question always give the same prompt.
#[derive(Debug, Clone)]
pub struct PromptAssembler {
    template: String,
}

impl Default for PromptAssembler {
    fn default() -> Self { Self { template: PROMPT_TEMPLATE.to_string() } }
}

impl PromptAssembler {
    /// A custom template must contain both `{context}` and `{question}`.
    pub fn with_template(template: impl Into<String>) -> Result<Self> {
        let template = template.into();
        if !template.contains(CONTEXT) || !template.contains(QUESTION) {
            return Err(Error::Configuration("prompt template needs {context} and {question} placeholders".into()));
        }
        Ok(Self { template })
    }

    /// Document texts in retrieval order, separated by a blank line.
    pub fn context(documents: &[RetrievedDocument]) -> String {
        documents.iter().map(|d| d.text.as_str()).collect::<Vec<_>>().join("\n\n")
    }

    pub fn render(&self, documents: &[RetrievedDocument], question: &str) -> String {
        fill(&self.template, &Self::context(documents), question)
    }
}

// Single pass so placeholder text inside excerpts or the question is left alone.
fn fill(template: &str, context: &str, question: &str) -> String {
    let mut out = String::with_capacity(template.len() + context.len() + question.len());
    let mut rest = template;
    while let Some(pos) = rest.find('{') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        if let Some(after) = tail.strip_prefix(CONTEXT) {
            out.push_str(context);
            rest = after;
        } else if let Some(after) = tail.strip_prefix(QUESTION) {
            out.push_str(question);
            rest = after;
        } else {
            out.push('{');
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    out
}
