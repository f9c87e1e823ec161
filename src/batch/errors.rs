//! Error types for batch execution.

use crate::clients::HttpError;
use thiserror::Error;

/// Error returned when a batch as a whole cannot be executed.
///
/// A failing sub-request is not an error at this level; it is reported on
/// its own [`BatchResponse`](crate::batch::BatchResponse).
#[derive(Debug, Error)]
pub enum BatchError {
    /// No sub-requests were given.
    #[error("Batch requests list cannot be empty")]
    Empty,

    /// The sub-requests target more than one division.
    #[error("Batch mixes divisions {first} and {other}")]
    MixedDivisions {
        /// The division of the first sub-request.
        first: u32,
        /// The first division that differs from it.
        other: u32,
    },

    /// The response `Content-Type` carries no multipart boundary.
    #[error("Invalid batch response: missing boundary")]
    MissingBoundary,

    /// The response holds a different number of parts than were sent.
    #[error("Batch returned {actual} results for {expected} requests")]
    ResultCountMismatch {
        /// The number of sub-requests sent.
        expected: usize,
        /// The number of sub-responses decoded.
        actual: usize,
    },

    /// The batch call itself failed.
    #[error(transparent)]
    Http(#[from] HttpError),
}
