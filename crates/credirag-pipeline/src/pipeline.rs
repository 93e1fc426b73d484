use std::sync::Arc;
use std::time::{Duration, Instant};

use credirag_core::config::Settings;
use credirag_core::error::{Error, Result};
use credirag_core::traits::{Embedder, Generator};
use credirag_core::types::Answer;
use credirag_embed::get_default_embedder;
use credirag_generate::{get_default_generator, AnswerExtractor, PromptAssembler};

use crate::open_index;
use crate::retriever::Retriever;

/// The query path: embed → retrieve → assemble prompt → generate → extract.
pub struct RagPipeline {
    retriever: Retriever,
    assembler: PromptAssembler,
    generator: Arc<dyn Generator>,
    extractor: AnswerExtractor,
    timeout: Option<Duration>,
}

impl RagPipeline {
    pub fn new(retriever: Retriever, generator: Arc<dyn Generator>) -> Self {
        Self { retriever, assembler: PromptAssembler::default(), generator, extractor: AnswerExtractor::default(), timeout: None }
    }

    /// Bound each generation call; `None` waits indefinitely.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Load models and open the index described by `settings`.
    pub async fn from_settings(settings: &Settings) -> Result<Self> {
        settings.validate()?;
        let embedder: Arc<dyn Embedder> = Arc::from(get_default_embedder(&settings.embedding)?);
        let index = open_index(settings, embedder.as_ref()).await?;
        let generator: Arc<dyn Generator> = Arc::from(get_default_generator(&settings.generation)?);
        let retriever = Retriever::new(embedder, Arc::new(index), settings.retrieval.k);
        Ok(Self::new(retriever, generator).with_timeout(settings.generation.timeout_secs.map(Duration::from_secs)))
    }

    pub fn retriever(&self) -> &Retriever { &self.retriever }

    /// Answer `question` from the indexed complaints.
    ///
    /// Every failure comes back as a typed error; no partial answer is returned.
    pub async fn ask(&self, question: &str) -> Result<Answer> {
        if question.trim().is_empty() {
            return Err(Error::EmptyQuestion);
        }
        let start = Instant::now();
        let documents = self.retriever.retrieve(question).await?;
        let prompt = self.assembler.render(&documents, question);
        let raw = self.generate(prompt).await?;
        let answer = self.extractor.package(&raw, documents);
        tracing::info!(sources = answer.documents.len(), elapsed_ms = start.elapsed().as_millis() as u64, "answered question");
        Ok(answer)
    }

    async fn generate(&self, prompt: String) -> Result<String> {
        let generator = Arc::clone(&self.generator);
        let task = tokio::task::spawn_blocking(move || generator.generate(&prompt));
        let joined = match self.timeout {
            // the blocking call keeps running after a timeout; only the wait is abandoned
            Some(limit) => tokio::time::timeout(limit, task).await.map_err(|_| Error::GenerationTimeout(limit))?,
            None => task.await,
        };
        joined.map_err(|e| Error::model_unavailable(self.generator.model_id(), format!("generation task failed: {e}")))?
    }
}
