use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A raw record is missing a required field or carries an unusable value.
    #[error("Malformed record {record}: {reason}")]
    Schema { record: String, reason: String },

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// The embedding or generation model could not be loaded or did not respond.
    #[error("Model '{model}' unavailable: {reason}")]
    ModelUnavailable { model: String, reason: String },

    #[error("Generation did not finish within {0:?}")]
    GenerationTimeout(Duration),

    #[error("Vector index operation failed: {0}")]
    Index(String),

    #[error("Question is empty")]
    EmptyQuestion,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn schema(record: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Schema { record: record.into(), reason: reason.into() }
    }

    pub fn model_unavailable(model: impl Into<String>, reason: impl ToString) -> Self {
        Self::ModelUnavailable { model: model.into(), reason: reason.to_string() }
    }

    /// Errors that only affect a single record and should not stop ingestion.
    pub fn is_record_local(&self) -> bool {
        matches!(self, Self::Schema { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
