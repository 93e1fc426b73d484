use anyhow::{bail, Result};
use arrow_array::{FixedSizeListArray, Int32Array, Int64Array, RecordBatch, RecordBatchIterator, StringArray};
use std::sync::Arc;

use credirag_core::metadata::{sanitize, MetadataPolicy};
use credirag_core::types::EmbeddedChunk;

use crate::schema::build_arrow_schema;
use crate::table::set_meta;
use crate::VectorIndex;

impl VectorIndex {
    /// Persist `entries` in writes of at most `batch_size` rows.
    ///
    /// Rows are keyed by chunk id, so re-ingesting a chunk replaces it. Each
    /// write commits on its own; a failure part way leaves the earlier batches
    /// in place. Returns the number of rows written.
    pub async fn upsert(&mut self, entries: &[EmbeddedChunk], batch_size: usize) -> Result<usize> {
        if entries.is_empty() { return Ok(0); }
        if let Some(bad) = entries.iter().find(|e| e.vector.len() != self.dim) {
            bail!(credirag_core::Error::Configuration(format!(
                "chunk {} has a {}-dim vector, index expects {}",
                bad.chunk.id(),
                bad.vector.len(),
                self.dim
            )));
        }
        let mut written = 0usize;
        for batch in entries.chunks(batch_size.max(1)) {
            let rb = to_record_batch(batch, self.next_seq, self.dim as i32, self.policy)?;
            let reader = Box::new(RecordBatchIterator::new(vec![Ok(rb)].into_iter(), build_arrow_schema(self.dim as i32)));
            let mut mi = self.table.merge_insert(&["id"]);
            mi.when_matched_update_all(None).when_not_matched_insert_all();
            mi.execute(reader).await?;

            self.next_seq += batch.len() as i64;
            set_meta(&self.conn, &self.seq_key(), &self.next_seq.to_string()).await?;
            written += batch.len();
            tracing::debug!(table = %self.table_name, rows = batch.len(), total = written, "wrote batch");
        }
        Ok(written)
    }
}

fn to_record_batch(entries: &[EmbeddedChunk], first_seq: i64, dim: i32, policy: MetadataPolicy) -> Result<RecordBatch> {
    let mut seqs = Vec::with_capacity(entries.len());
    let mut ids = Vec::with_capacity(entries.len());
    let mut record_ids = Vec::with_capacity(entries.len());
    let mut chunk_indices = Vec::with_capacity(entries.len());
    let mut texts = Vec::with_capacity(entries.len());
    let mut metadata = Vec::with_capacity(entries.len());
    let mut vectors: Vec<Option<Vec<Option<f32>>>> = Vec::with_capacity(entries.len());
    for (offset, e) in entries.iter().enumerate() {
        seqs.push(first_seq + offset as i64);
        ids.push(e.chunk.id());
        record_ids.push(e.chunk.source_record_id.clone());
        chunk_indices.push(i32::try_from(e.chunk.chunk_index)?);
        texts.push(e.chunk.text.clone());
        metadata.push(serde_json::to_string(&sanitize(e.metadata.clone(), policy))?);
        vectors.push(Some(e.vector.iter().map(|&x| Some(x)).collect()));
    }
    let rb = RecordBatch::try_new(build_arrow_schema(dim), vec![
        Arc::new(Int64Array::from(seqs)),
        Arc::new(StringArray::from(ids)),
        Arc::new(StringArray::from(record_ids)),
        Arc::new(Int32Array::from(chunk_indices)),
        Arc::new(StringArray::from(texts)),
        Arc::new(StringArray::from(metadata)),
        Arc::new(FixedSizeListArray::from_iter_primitive::<arrow_array::types::Float32Type, _, _>(vectors.into_iter(), dim)),
    ])?;
    Ok(rb)
}
