//! OData `$batch` support.
//!
//! A batch carries several independent operations of one division in a
//! single HTTP call and returns one [`BatchResponse`] per operation, in the
//! order they were given. One failing operation does not affect the
//! decoding of the others.
//!
//! On the wire, reads are top-level parts of a `multipart/mixed` body and
//! every write travels in its own changeset with a `Content-ID`.
//!
//! # Example
//!
//! ```rust,ignore
//! use exact_online::batch::{execute_batch, BatchRequest};
//!
//! let result = execute_batch(&client, &[
//!     BatchRequest::get(division, "/crm/Accounts"),
//!     BatchRequest::delete(division, "/crm/Accounts(guid'5b8e...')"),
//! ])
//! .await?;
//!
//! if !result.all_successful() {
//!     println!("{} operations failed", result.failed_count());
//! }
//! ```

mod errors;
mod executor;
mod request;
mod response;

pub use errors::BatchError;
pub use executor::execute_batch;
pub use request::{encode_batch, BatchRequest, EncodedBatch};
pub use response::{boundary_from_content_type, decode_batch, BatchResponse, BatchResult};
