use anyhow::{anyhow, bail, Result};
use arrow_array::{Array, Float32Array, Int64Array, RecordBatch, StringArray};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::DistanceType;

use credirag_core::metadata::Metadata;
use credirag_core::types::RetrievedDocument;

use crate::schema::{COL_METADATA, COL_SEQ, COL_TEXT};
use crate::VectorIndex;

struct Hit {
    seq: i64,
    doc: RetrievedDocument,
}

impl VectorIndex {
    /// The `k` entries closest to `vector` by cosine distance, nearest first.
    /// Equal distances keep insertion order. An empty index yields no results.
    pub async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<RetrievedDocument>> {
        if vector.len() != self.dim {
            bail!(credirag_core::Error::Configuration(format!(
                "query vector has {} dims, index expects {}",
                vector.len(),
                self.dim
            )));
        }
        if k == 0 || self.len().await? == 0 {
            return Ok(Vec::new());
        }

        // Over-fetch so rows tied at the k-th distance can be re-ordered by seq.
        let fetch = (k * 2).max(k + 8);
        let mut stream = self
            .table
            .vector_search(vector.to_vec())?
            .distance_type(DistanceType::Cosine)
            .limit(fetch)
            .execute()
            .await?;

        let mut hits = Vec::new();
        while let Some(batch) = stream.try_next().await? {
            collect_hits(&batch, &mut hits)?;
        }
        hits.sort_by(|a, b| a.doc.distance.total_cmp(&b.doc.distance).then(a.seq.cmp(&b.seq)));
        hits.truncate(k);
        tracing::debug!(table = %self.table_name, k, returned = hits.len(), "vector query");
        Ok(hits.into_iter().map(|h| h.doc).collect())
    }
}

fn column<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<T>())
        .ok_or_else(|| anyhow!("column '{name}' missing or of unexpected type"))
}

fn collect_hits(batch: &RecordBatch, out: &mut Vec<Hit>) -> Result<()> {
    let seq = column::<Int64Array>(batch, COL_SEQ)?;
    let text = column::<StringArray>(batch, COL_TEXT)?;
    let metadata = column::<StringArray>(batch, COL_METADATA)?;
    let distance = column::<Float32Array>(batch, "_distance")?;
    for i in 0..batch.num_rows() {
        let meta: Metadata = serde_json::from_str(metadata.value(i))?;
        out.push(Hit {
            seq: seq.value(i),
            doc: RetrievedDocument {
                text: text.value(i).to_string(),
                metadata: meta,
                distance: if distance.is_null(i) { f32::INFINITY } else { distance.value(i) },
            },
        });
    }
    Ok(())
}
