//! Error types for the placement engine.
//!
//! Only problems with the request itself are errors. A scenario that is
//! too cluttered to fill the requested quota is reported through the
//! counters on [`SamplingResult`](crate::types::SamplingResult).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SamplingError {
    /// A record is missing fields, carries the wrong header, or holds a
    /// bounding box that breaks the `min <= max` invariant.
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// The request can never be satisfied as stated: zero samples,
    /// zero attempt budget, or a zero-area footprint.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Failed to serialize sampling result: {0}")]
    Serialization(#[from] serde_json::Error),
}
