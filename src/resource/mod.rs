//! Resource capability module
//!
//! A [`Resource`] is what an endpoint operation hands back to the pipeline: an
//! entity with a version identity, a modification date and a caching lifetime.
//! Optional capabilities are queried through the `as_*` accessors, each
//! returning `None` unless the implementor opts in:
//!
//! - [`Ranger`] adds support for range requests and partial responses.
//! - [`Marshaler`] lets the resource produce its own bytes and content type,
//!   bypassing the registered encoders.
//! - [`DirectWriter`] hands the whole response over to the resource. This is
//!   low level and only meant for streaming or custom headers such as
//!   `Content-Disposition`.

use std::time::Duration;

use chrono::{DateTime, Utc};
use hyper::body::Bytes;
use hyper::header::HeaderMap;

use crate::endpoint::Request;
use crate::error::Result;
use crate::http::range::{ContentRange, RangeRequest};
use crate::http::response::Response;

/// An addressable entity whose representation is served
pub trait Resource: Send + Sync {
    /// `ETag` identifying the current version of the resource
    fn etag(&self) -> String;

    /// Date and time of the last modification
    fn last_modified(&self) -> DateTime<Utc>;

    /// Caching duration, zero means no explicit freshness
    fn ttl(&self) -> Duration;

    /// Structured view encoded by the registered encoders
    fn to_value(&self) -> Option<serde_json::Value> {
        None
    }

    fn as_ranger(&self) -> Option<&dyn Ranger> {
        None
    }

    fn as_marshaler(&self) -> Option<&dyn Marshaler> {
        None
    }

    fn as_direct_writer(&self) -> Option<&dyn DirectWriter> {
        None
    }
}

/// Implemented by resources that support partial responses.
///
/// [`Ranger::range`] is only called when the request carries a valid `Range`
/// header that survived `If-Range`; otherwise the request is processed as a
/// normal read.
///
/// ```
/// use yarest::http::range::{ContentRange, RangeRequest};
/// use yarest::resource::{Ranger, Resource};
/// # use yarest::error::Result;
/// # use chrono::{DateTime, Utc};
/// # use std::time::Duration;
/// struct Doc(Vec<u8>);
/// # impl Resource for Doc {
/// #     fn etag(&self) -> String { "\"doc\"".into() }
/// #     fn last_modified(&self) -> DateTime<Utc> { DateTime::UNIX_EPOCH }
/// #     fn ttl(&self) -> Duration { Duration::ZERO }
/// # }
///
/// impl Ranger for Doc {
///     fn units(&self) -> &[&str] {
///         &["bytes"]
///     }
///
///     fn count(&self) -> u64 {
///         self.0.len() as u64
///     }
///
///     fn range(&self, rg: &RangeRequest) -> Result<(ContentRange, Box<dyn Resource>)> {
///         let part = self.0[rg.from as usize..=rg.to as usize].to_vec();
///         Ok((ContentRange::new(rg, self.count()), Box::new(Doc(part))))
///     }
/// }
/// ```
pub trait Ranger: Send + Sync {
    /// Supported range units, advertised in `Accept-Ranges`
    fn units(&self) -> &[&str];

    /// Total number of units available
    fn count(&self) -> u64;

    /// Return the part of the resource covered by an adjusted, in-bounds range
    fn range(&self, range: &RangeRequest) -> Result<(ContentRange, Box<dyn Resource>)>;
}

/// Encoded bytes of a resource along with their media type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Representation {
    pub content_type: String,
    pub body: Bytes,
}

impl Representation {
    pub fn new(content_type: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self {
            content_type: content_type.into(),
            body: body.into(),
        }
    }
}

/// Resources encoding themselves, given the request's `Accept` header
pub trait Marshaler: Send + Sync {
    fn marshal(&self, accept: Option<&str>) -> Result<Representation>;
}

/// Resources taking full control of the response
///
/// `headers` holds everything the pipeline computed so far (`ETag`,
/// `Last-Modified`, `Expires`, `Vary`, range headers).
pub trait DirectWriter: Send + Sync {
    fn write_response(&self, request: &Request, headers: HeaderMap) -> Response;
}
