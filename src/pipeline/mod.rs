//! Receipt ingestion pipeline.
//!
//! A request-scoped linear sequence: validate → store → extract → persist.
//! Stages share no state across requests; failure at any stage aborts the
//! rest and surfaces as an [`IngestError`] tagged with the failed stage.

pub mod extraction;
pub mod ingest;
pub mod storage;
pub mod validate;

use thiserror::Error;

use crate::db::DatabaseError;
use extraction::ExtractionError;
use storage::StorageError;
use validate::ValidationError;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("upload rejected: {0}")]
    Validation(#[from] ValidationError),
    #[error("image storage failed: {0}")]
    Storage(#[from] StorageError),
    #[error("receipt extraction failed: {0}")]
    Extraction(#[from] ExtractionError),
    #[error("receipt persistence failed: {0}")]
    Persistence(#[from] DatabaseError),
}

impl IngestError {
    /// Pipeline stage the failure belongs to, for logs.
    pub fn stage(&self) -> &'static str {
        match self {
            IngestError::Validation(_) => "validate",
            IngestError::Storage(_) => "store",
            IngestError::Extraction(_) => "extract",
            IngestError::Persistence(_) => "persist",
        }
    }
}
