//! credirag-core
//!
//! Domain types, error taxonomy, configuration and the model-free ingestion
//! stages (record reading, normalization, chunking, metadata sanitization).

pub mod chunker;
pub mod config;
pub mod error;
pub mod metadata;
pub mod normalize;
pub mod records;
pub mod traits;
pub mod types;

pub use chunker::Chunker;
pub use error::{Error, Result};
pub use normalize::{FilterMode, TextNormalizer};
