//! Extraction of structured receipt data from a stored image via an
//! external vision model.
//!
//! The provider is untrusted: its output crosses a strict parse-and-validate
//! boundary (`parser`) before anything reaches the repository. One call, one
//! parse attempt, no retries.

pub mod client;
pub mod parser;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("cannot reach vision provider at {0}")]
    Connection(String),
    #[error("vision provider request failed: {0}")]
    Http(String),
    #[error("vision provider returned status {status}: {body}")]
    Provider { status: u16, body: String },
    #[error("vision provider returned an empty response")]
    EmptyResponse,
    #[error("failed to decode provider response: {0}")]
    ResponseParsing(String),
    #[error("extraction response is not a JSON object: {0}")]
    MalformedJson(String),
    #[error("extracted data failed validation: {0}")]
    Invalid(String),
}
