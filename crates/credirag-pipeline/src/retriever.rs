use std::sync::Arc;

use credirag_core::error::{Error, Result};
use credirag_core::traits::Embedder;
use credirag_core::types::RetrievedDocument;
use credirag_vector::{into_core_error, VectorIndex};

/// Nearest-neighbour lookup with a fixed result count.
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<VectorIndex>,
    k: usize,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<VectorIndex>, k: usize) -> Self { Self { embedder, index, k } }

    pub fn k(&self) -> usize { self.k }

    pub async fn retrieve(&self, question: &str) -> Result<Vec<RetrievedDocument>> {
        let embedder = Arc::clone(&self.embedder);
        let question = question.to_string();
        let vector = tokio::task::spawn_blocking(move || embedder.embed(&question))
            .await
            .map_err(|e| Error::model_unavailable(self.embedder.model_id(), format!("embedding task failed: {e}")))??;
        self.index.query(&vector, self.k).await.map_err(into_core_error)
    }
}
