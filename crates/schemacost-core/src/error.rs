//! # Error Types
//!
//! Estimation itself never fails: missing statistics are replaced by documented
//! defaults (zero cardinality, cardinality-as-distinct, average length 1) and
//! unknown field types fall back to the string-like byte cost. What *can* fail is
//! turning input documents into the model's types, and constructing a server pool
//! that would divide by zero.
//!
//! - [`LoadError`]: a schema, statistics or workload document does not have the
//!   expected shape. Fatal for the candidate being loaded, never for a whole
//!   comparison.
//! - [`EstimateError`]: invalid estimator configuration.

use crate::operation::OperationKind;

/// Failure to decode a schema description or statistics snapshot.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("schema description must be a list of collections")]
    NotAList,

    #[error("{path}: missing required field `{field}`")]
    MissingField { path: String, field: &'static str },

    #[error("{path}: {reason}")]
    InvalidField { path: String, reason: String },

    #[error("collection `{0}` is declared more than once")]
    DuplicateCollection(String),

    #[error("invalid statistics snapshot: {0}")]
    InvalidStatistics(String),

    #[error("workload `{slot}` {reason}")]
    InvalidWorkload { slot: OperationKind, reason: String },
}

/// Invalid estimator configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EstimateError {
    #[error("server count must be at least 1")]
    InvalidServerCount,
}
