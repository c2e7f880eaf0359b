//! HTTP conditional request module
//!
//! Two independent checks:
//! - write-conflict detection (`If-Unmodified-Since`, `If-Match`), invoked by
//!   endpoint operations before they mutate anything
//! - cache revalidation (`If-Modified-Since`, `If-None-Match`), applied by the
//!   response writer to every resource it is about to serve
//!
//! plus the `If-Range` precondition used by range negotiation.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use hyper::header::{HeaderMap, IF_MATCH, IF_MODIFIED_SINCE, IF_NONE_MATCH, IF_UNMODIFIED_SINCE};

use super::date::{parse_http_date, to_http_precision};
use crate::endpoint::Request;
use crate::error::{Error, Result};
use crate::resource::Resource;

/// Generate `ETag` using fast hashing
///
/// Returns a quoted `ETag` string, e.g. `"abc123def"`
pub fn generate_etag(content: &[u8]) -> String {
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    let v = hasher.finish();
    format!("\"{v:x}\"")
}

/// Returns true if the `If-Unmodified-Since` or `If-Match` headers do not
/// match the current version of `resource`.
///
/// Absent or unparsable headers never signal a conflict.
///
/// ```ignore
/// async fn patch(&self, vars: &RouteVars, r: &Request) -> Result<Option<Box<dyn Resource>>> {
///     let note = self.lookup(vars)?;
///     if validate_conditions(&note, r.headers()) {
///         return Err(Error::PreconditionFailed);
///     }
///     // apply the patch safely from here
/// }
/// ```
pub fn validate_conditions(resource: &dyn Resource, headers: &HeaderMap) -> bool {
    if let Some(since) = header_str(headers, IF_UNMODIFIED_SINCE).and_then(parse_http_date) {
        if since < to_http_precision(resource.last_modified()) {
            return true;
        }
    }

    header_str(headers, IF_MATCH).is_some_and(|etag| !etag.is_empty() && etag != resource.etag())
}

/// [`validate_conditions`] as a `Result`, failing with 412 on conflict
pub fn check_preconditions(resource: &dyn Resource, request: &Request) -> Result<()> {
    if validate_conditions(resource, request.headers()) {
        Err(Error::PreconditionFailed)
    } else {
        Ok(())
    }
}

/// Check whether the client's cached copy is still current (should return 304)
///
/// True when `If-Modified-Since` parses and is not earlier than the last
/// modification, or when any `If-None-Match` entry equals the `ETag`.
pub fn not_modified(resource: &dyn Resource, headers: &HeaderMap) -> bool {
    if let Some(since) = header_str(headers, IF_MODIFIED_SINCE).and_then(parse_http_date) {
        if since >= to_http_precision(resource.last_modified()) {
            return true;
        }
    }

    check_etag_match(header_str(headers, IF_NONE_MATCH), &resource.etag())
}

/// Check if client's `If-None-Match` header matches the server's `ETag`
///
/// Supports:
/// - Single `ETag`: `"abc123"`
/// - Multiple `ETags` separated by `;` or `,`: `"abc123"; "def456"`
/// - Wildcard: `*`
pub fn check_etag_match(if_none_match: Option<&str>, etag: &str) -> bool {
    if_none_match.is_some_and(|client_etag| {
        client_etag
            .split([';', ','])
            .map(str::trim)
            .any(|e| e == etag || e == "*")
    })
}

/// Evaluate an `If-Range` value against the resource
///
/// The value is either an HTTP date, which must equal the last modification
/// exactly, or an `ETag`, which must match exactly.
pub fn if_range_satisfied(resource: &dyn Resource, if_range: &str) -> bool {
    if let Some(date) = parse_http_date(if_range) {
        if date == to_http_precision(resource.last_modified()) {
            return true;
        }
    }
    if_range == resource.etag()
}

fn header_str(headers: &HeaderMap, name: hyper::header::HeaderName) -> Option<&str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
