//! credirag-pipeline
//!
//! Wires normalization, chunking, embedding, the vector index and generation
//! into the two entry points: [`ingest`] and [`RagPipeline::ask`].

pub mod ingest;
pub mod pipeline;
pub mod retriever;

pub use ingest::{ingest, IngestReport, Ingestor};
pub use pipeline::RagPipeline;
pub use retriever::Retriever;

use credirag_core::config::Settings;
use credirag_core::error::Result;
use credirag_core::traits::Embedder;
use credirag_vector::{into_core_error, VectorIndex};

/// Open the configured index for `embedder`, refusing one built by another model.
pub async fn open_index(settings: &Settings, embedder: &dyn Embedder) -> Result<VectorIndex> {
    VectorIndex::open(
        &settings.data.index_dir,
        &settings.data.table_name,
        embedder.model_id(),
        embedder.dim(),
        settings.ingest.metadata_policy,
    )
    .await
    .map_err(into_core_error)
}
