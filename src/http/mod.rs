//! HTTP protocol layer module
//!
//! Header-level building blocks of the pipeline, independent of endpoints:
//! dates, conditional requests, ranges, negotiation, compression and status
//! responses.

pub mod compression;
pub mod conditional;
pub mod date;
pub mod negotiate;
pub mod range;
pub mod response;

// Re-export commonly used types
pub use conditional::{check_preconditions, generate_etag, validate_conditions};
pub use range::{ContentRange, RangeRequest};
pub use response::Response;
