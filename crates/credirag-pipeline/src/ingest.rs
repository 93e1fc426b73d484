//! Ingestion: records → normalize → chunk → embed → batched index writes.

use std::sync::Arc;
use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};

use credirag_core::chunker::Chunker;
use credirag_core::config::Settings;
use credirag_core::error::{Error, Result};
use credirag_core::metadata::RawMetadata;
use credirag_core::normalize::{NormalizeStats, TextNormalizer};
use credirag_core::records::{read_dataset, RecordColumns};
use credirag_core::traits::Embedder;
use credirag_core::types::{Chunk, EmbeddedChunk, Record};
use credirag_embed::get_default_embedder;
use credirag_vector::{into_core_error, VectorIndex};

use crate::open_index;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub records: NormalizeStats,
    pub chunks: usize,
    pub entries_written: usize,
}

pub struct Ingestor {
    embedder: Arc<dyn Embedder>,
    normalizer: TextNormalizer,
    chunker: Chunker,
    embed_batch_size: usize,
    batch_size: usize,
    progress: bool,
}

impl Ingestor {
    pub fn new(embedder: Arc<dyn Embedder>, settings: &Settings) -> Result<Self> {
        let ingest = &settings.ingest;
        Ok(Self {
            embedder,
            normalizer: TextNormalizer::new(ingest.filter_mode, ingest.min_words),
            chunker: Chunker::new(ingest.chunk_size, ingest.chunk_overlap)?,
            embed_batch_size: ingest.embed_batch_size.max(1),
            batch_size: ingest.batch_size.max(1),
            progress: false,
        })
    }

    /// Show a progress spinner while running.
    pub fn with_progress(mut self, on: bool) -> Self {
        self.progress = on;
        self
    }

    /// Stream `rows` into `index`.
    ///
    /// Malformed rows are counted and skipped. Any embedding or index failure
    /// stops the run; batches written before it stay in the index.
    pub async fn run<I>(&self, rows: I, index: &mut VectorIndex) -> Result<IngestReport>
    where
        I: IntoIterator<Item = Result<Record>>,
    {
        let start = Instant::now();
        let pb = self.progress_bar();
        let mut report = IngestReport::default();
        let mut pending: Vec<(Chunk, RawMetadata)> = Vec::with_capacity(self.embed_batch_size);
        let mut embedded: Vec<EmbeddedChunk> = Vec::new();

        for row in rows {
            let Some(normalized) = self.normalizer.admit(row, &mut report.records)? else { continue };

            for chunk in self.chunker.chunks(normalized.id(), &normalized.cleaned_narrative) {
                let meta = normalized.chunk_metadata(chunk.chunk_index);
                pending.push((chunk, meta));
                report.chunks += 1;
                if pending.len() >= self.embed_batch_size {
                    self.embed_pending(&mut pending, &mut embedded, &pb)?;
                }
                if embedded.len() >= self.batch_size {
                    report.entries_written += self.flush(&mut embedded, index).await?;
                }
            }
        }
        self.embed_pending(&mut pending, &mut embedded, &pb)?;
        report.entries_written += self.flush(&mut embedded, index).await?;

        pb.finish_with_message("done");
        tracing::info!(
            read = report.records.read,
            kept = report.records.kept,
            off_category = report.records.off_category,
            empty = report.records.empty_narrative,
            short = report.records.too_short,
            malformed = report.records.schema_errors,
            chunks = report.chunks,
            written = report.entries_written,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "ingestion finished"
        );
        Ok(report)
    }

    fn embed_pending(&self, pending: &mut Vec<(Chunk, RawMetadata)>, out: &mut Vec<EmbeddedChunk>, pb: &ProgressBar) -> Result<()> {
        if pending.is_empty() { return Ok(()); }
        let texts: Vec<String> = pending.iter().map(|(c, _)| c.text.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts)?;
        if vectors.len() != texts.len() {
            return Err(Error::model_unavailable(
                self.embedder.model_id(),
                format!("returned {} vectors for {} texts", vectors.len(), texts.len()),
            ));
        }
        pb.inc(texts.len() as u64);
        out.extend(pending.drain(..).zip(vectors).map(|((chunk, metadata), vector)| EmbeddedChunk { chunk, vector, metadata }));
        Ok(())
    }

    async fn flush(&self, embedded: &mut Vec<EmbeddedChunk>, index: &mut VectorIndex) -> Result<usize> {
        if embedded.is_empty() { return Ok(0); }
        let written = index.upsert(embedded, self.batch_size).await.map_err(into_core_error)?;
        embedded.clear();
        Ok(written)
    }

    fn progress_bar(&self) -> ProgressBar {
        if !self.progress { return ProgressBar::hidden(); }
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {pos} chunks embedded ({per_sec}) {msg}") {
            pb.set_style(style);
        }
        pb
    }
}

/// Ingest the configured dataset. `rebuild` wipes the index directory first.
pub async fn ingest(settings: &Settings, rebuild: bool) -> Result<IngestReport> {
    settings.validate()?;
    if rebuild {
        VectorIndex::reset(&settings.data.index_dir).map_err(into_core_error)?;
    }
    let embedder: Arc<dyn Embedder> = Arc::from(get_default_embedder(&settings.embedding)?);
    let mut index = open_index(settings, embedder.as_ref()).await?;
    let rows = read_dataset(&settings.data.dataset_path, &RecordColumns::from_settings(&settings.ingest))?;
    Ingestor::new(embedder, settings)?.with_progress(true).run(rows, &mut index).await
}
