//! Error taxonomy for the insight service.
//!
//! One closed enum shared by the store, the evaluator/pipeline, and the
//! gateway; the gateway maps each variant to an HTTP status. No variant is
//! retried automatically anywhere.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, InsightError>;

#[derive(Debug, Error)]
pub enum InsightError {
    /// Missing or malformed caller input. No side effects have occurred.
    #[error("validation error: {0}")]
    Validation(String),

    /// A data-store query or mutation failed. `op` names the failing
    /// operation for log correlation.
    #[error("store error during {op}: {detail}")]
    Store { op: &'static str, detail: String },

    /// The LLM endpoint returned a non-OK status or the transport failed.
    #[error("llm error: {0}")]
    Llm(String),

    /// The LLM answered, but its output could not be recovered into the
    /// expected JSON shape. Carries both the raw and the cleaned text so the
    /// caller can diagnose what the model actually said.
    #[error("llm response was not parseable: {detail}")]
    LlmParse {
        detail: String,
        raw: String,
        cleaned: String,
    },

    /// The statistics aggregation did not finish within its 30s ceiling.
    #[error("user stats aggregation timed out")]
    StatsTimeout,

    /// Field encryption or decryption failed.
    #[error("crypto error: {0}")]
    Crypto(String),
}

impl InsightError {
    pub fn store(op: &'static str, detail: impl ToString) -> Self {
        InsightError::Store {
            op,
            detail: detail.to_string(),
        }
    }
}
