//! Domain types flowing through the ingestion and query pipelines.

use serde::{Deserialize, Serialize};

use crate::metadata::{Metadata, MetadataValue, RawMetadata};

pub type RecordId = String;

/// Metadata key holding the source complaint identifier.
pub const META_COMPLAINT_ID: &str = "complaint_id";
/// Metadata key holding the product category.
pub const META_PRODUCT: &str = "product";
/// Metadata key holding the chunk position within its complaint.
pub const META_CHUNK_ID: &str = "chunk_id";

/// One raw complaint as read from the dataset.
///
/// `extra` carries additional configured columns verbatim; they end up in
/// chunk metadata after sanitization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub category: String,
    pub narrative: Option<String>,
    #[serde(default)]
    pub extra: RawMetadata,
}

/// A record whose narrative survived filtering and cleaning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub record: Record,
    pub cleaned_narrative: String,
}

impl NormalizedRecord {
    pub fn id(&self) -> &str { &self.record.id }

    pub fn word_count(&self) -> usize { self.cleaned_narrative.split_whitespace().count() }

    /// Provenance attached to every chunk cut from this record.
    pub fn chunk_metadata(&self, chunk_index: usize) -> RawMetadata {
        let mut meta = self.record.extra.clone();
        meta.insert(META_COMPLAINT_ID.into(), self.record.id.clone().into());
        meta.insert(META_PRODUCT.into(), self.record.category.clone().into());
        meta.insert(META_CHUNK_ID.into(), (chunk_index as u64).into());
        meta
    }
}

/// A bounded, contiguous slice of a narrative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub source_record_id: RecordId,
    pub chunk_index: usize,
}

impl Chunk {
    /// Stable identifier: `<record id>:<chunk index>`.
    pub fn id(&self) -> String { format!("{}:{}", self.source_record_id, self.chunk_index) }
}

/// A chunk with its embedding and the raw metadata to persist with it.
#[derive(Debug, Clone)]
pub struct EmbeddedChunk {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
    pub metadata: RawMetadata,
}

/// A search result handed back by the vector index.
///
/// `distance` is the cosine distance to the query vector (lower is closer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedDocument {
    pub text: String,
    pub metadata: Metadata,
    pub distance: f32,
}

impl RetrievedDocument {
    pub fn similarity(&self) -> f32 { 1.0 - self.distance }

    pub fn meta_str(&self, key: &str) -> Option<String> {
        match self.metadata.get(key) {
            None | Some(MetadataValue::Null) => None,
            Some(v) => Some(v.to_string()),
        }
    }
}

/// A citation as shown to the person asking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub id: String,
    pub category: String,
    pub excerpt: String,
}

impl Source {
    /// Single-line excerpt cut to at most `max_chars` characters, with `...` when cut.
    pub fn preview(&self, max_chars: usize) -> String {
        let flat = self.excerpt.trim().replace('\n', " ");
        if flat.chars().count() <= max_chars { return flat; }
        let mut cut: String = flat.chars().take(max_chars).collect();
        cut.push_str("...");
        cut
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    pub documents: Vec<RetrievedDocument>,
}

impl Answer {
    pub fn sources(&self) -> Vec<Source> {
        self.documents
            .iter()
            .map(|d| Source {
                id: d.meta_str(META_COMPLAINT_ID).unwrap_or_else(|| "Unknown".to_string()),
                category: d.meta_str(META_PRODUCT).unwrap_or_else(|| "Unknown".to_string()),
                excerpt: d.text.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_truncates_on_char_boundary() {
        let s = Source { id: "1".into(), category: "Credit card".into(), excerpt: "héllo\nworld".into() };
        assert_eq!(s.preview(100), "héllo world");
        assert_eq!(s.preview(3), "hél...");
    }

    #[test]
    fn sources_fall_back_to_unknown() {
        let mut metadata = Metadata::new();
        metadata.insert(META_COMPLAINT_ID.into(), "42".into());
        let answer = Answer {
            text: "x".into(),
            documents: vec![RetrievedDocument { text: "fee".into(), metadata, distance: 0.1 }],
        };
        let sources = answer.sources();
        assert_eq!(sources[0].id, "42");
        assert_eq!(sources[0].category, "Unknown");
    }
}
