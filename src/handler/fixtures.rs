//! Resources and endpoints shared by the unit tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use hyper::body::Bytes;
use hyper::header::{HeaderMap, HeaderValue};
use hyper::StatusCode;
use serde_json::{json, Value};

use crate::endpoint::{Created, Deleter, Endpoint, Getter, Patcher, Poster, Putter, Request, RouteVars};
use crate::error::{Error, Result};
use crate::http::conditional::check_preconditions;
use crate::http::range::{ContentRange, RangeRequest};
use crate::http::response::{build_response, Response};
use crate::resource::{DirectWriter, Marshaler, Ranger, Representation, Resource};

pub fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(year, month, day)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        .and_utc()
}

pub fn request(method: &str, headers: &[(&str, &str)]) -> Request {
    request_with_body(method, headers, b"")
}

pub fn request_with_body(method: &str, headers: &[(&str, &str)], body: &[u8]) -> Request {
    let mut builder = hyper::Request::builder().method(method).uri("/test");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder.body(Bytes::copy_from_slice(body)).unwrap()
}

/// Structured resource encoded by the registered encoders
#[derive(Debug, Clone)]
pub struct Item {
    pub etag: String,
    pub modified: DateTime<Utc>,
    pub ttl: Duration,
    pub value: Value,
}

impl Item {
    pub fn new(etag: &str, modified: DateTime<Utc>) -> Self {
        Self {
            etag: etag.to_string(),
            modified,
            ttl: Duration::ZERO,
            value: json!({ "name": "first", "body": "hello", "tags": ["a", "b"] }),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

impl Resource for Item {
    fn etag(&self) -> String {
        self.etag.clone()
    }

    fn last_modified(&self) -> DateTime<Utc> {
        self.modified
    }

    fn ttl(&self) -> Duration {
        self.ttl
    }

    fn to_value(&self) -> Option<Value> {
        Some(self.value.clone())
    }
}

/// Byte-addressable resource marshaling itself as plain text
#[derive(Debug, Clone)]
pub struct Blob {
    etag: String,
    modified: DateTime<Utc>,
    data: Bytes,
}

impl Blob {
    pub fn new(etag: &str, modified: DateTime<Utc>, data: &[u8]) -> Self {
        Self {
            etag: etag.to_string(),
            modified,
            data: Bytes::copy_from_slice(data),
        }
    }
}

impl Resource for Blob {
    fn etag(&self) -> String {
        self.etag.clone()
    }

    fn last_modified(&self) -> DateTime<Utc> {
        self.modified
    }

    fn ttl(&self) -> Duration {
        Duration::ZERO
    }

    fn as_ranger(&self) -> Option<&dyn Ranger> {
        Some(self)
    }

    fn as_marshaler(&self) -> Option<&dyn Marshaler> {
        Some(self)
    }
}

impl Ranger for Blob {
    fn units(&self) -> &[&str] {
        &["bytes"]
    }

    fn count(&self) -> u64 {
        self.data.len() as u64
    }

    fn range(&self, range: &RangeRequest) -> Result<(ContentRange, Box<dyn Resource>)> {
        let from = usize::try_from(range.from).map_err(|e| Error::Internal(e.to_string()))?;
        let to = usize::try_from(range.to).map_err(|e| Error::Internal(e.to_string()))?;
        let part = Self {
            data: self.data.slice(from..=to),
            ..self.clone()
        };
        Ok((ContentRange::new(range, self.count()), Box::new(part)))
    }
}

impl Marshaler for Blob {
    fn marshal(&self, _accept: Option<&str>) -> Result<Representation> {
        Ok(Representation::new("text/plain", self.data.clone()))
    }
}

/// Resource writing its own response
pub struct Streamed {
    etag: String,
    modified: DateTime<Utc>,
}

impl Streamed {
    pub fn new(etag: &str, modified: DateTime<Utc>) -> Self {
        Self {
            etag: etag.to_string(),
            modified,
        }
    }
}

impl Resource for Streamed {
    fn etag(&self) -> String {
        self.etag.clone()
    }

    fn last_modified(&self) -> DateTime<Utc> {
        self.modified
    }

    fn ttl(&self) -> Duration {
        Duration::ZERO
    }

    fn as_direct_writer(&self) -> Option<&dyn DirectWriter> {
        Some(self)
    }
}

impl DirectWriter for Streamed {
    fn write_response(&self, _request: &Request, mut headers: HeaderMap) -> Response {
        headers.insert("Content-Disposition", HeaderValue::from_static("attachment"));
        build_response(StatusCode::OK, headers, Bytes::from_static(b"streamed"))
    }
}

/// Endpoint implementing every operation, counting invocations
///
/// Route variable `id` steers the outcome: `none` yields no resource,
/// `missing` fails with not found.
pub struct Notes {
    pub item: Mutex<Item>,
    pub calls: AtomicUsize,
}

impl Default for Notes {
    fn default() -> Self {
        Self {
            item: Mutex::new(Item::new("\"v1\"", at(2024, 1, 1))),
            calls: AtomicUsize::new(0),
        }
    }
}

impl Notes {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn current(&self) -> Item {
        self.item.lock().unwrap().clone()
    }

    fn enter(&self, vars: &RouteVars) -> Result<bool> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match vars.get("id") {
            Some("missing") => Err(Error::NotFound),
            Some("none") => Ok(false),
            _ => Ok(true),
        }
    }

    fn modify(&self, vars: &RouteVars, request: &Request) -> Result<Option<Box<dyn Resource>>> {
        if !self.enter(vars)? {
            return Ok(None);
        }
        let mut item = self.item.lock().unwrap();
        check_preconditions(&*item, request)?;
        item.etag = "\"v2\"".to_string();
        item.modified = at(2024, 2, 1);
        item.value["body"] = json!(String::from_utf8_lossy(request.body()));
        Ok(Some(Box::new(item.clone())))
    }
}

#[async_trait]
impl Getter for Notes {
    async fn get(&self, vars: &RouteVars, _request: &Request) -> Result<Option<Box<dyn Resource>>> {
        if !self.enter(vars)? {
            return Ok(None);
        }
        Ok(Some(Box::new(self.current())))
    }
}

#[async_trait]
impl Patcher for Notes {
    async fn patch(&self, vars: &RouteVars, request: &Request) -> Result<Option<Box<dyn Resource>>> {
        self.modify(vars, request)
    }
}

#[async_trait]
impl Putter for Notes {
    async fn put(&self, vars: &RouteVars, request: &Request) -> Result<Option<Box<dyn Resource>>> {
        self.modify(vars, request)
    }
}

#[async_trait]
impl Poster for Notes {
    async fn post(&self, vars: &RouteVars, _request: &Request) -> Result<Created> {
        if !self.enter(vars)? {
            return Ok(Created {
                resource: None,
                location: Some("/notes/2".to_string()),
            });
        }
        Ok(Created::new(Box::new(Item::new("\"n2\"", at(2024, 3, 1))), "/notes/2"))
    }
}

#[async_trait]
impl Deleter for Notes {
    async fn delete(&self, vars: &RouteVars, _request: &Request) -> Result<()> {
        self.enter(vars).map(|_| ())
    }
}

impl Endpoint for Notes {
    fn as_getter(&self) -> Option<&dyn Getter> {
        Some(self)
    }

    fn as_patcher(&self) -> Option<&dyn Patcher> {
        Some(self)
    }

    fn as_putter(&self) -> Option<&dyn Putter> {
        Some(self)
    }

    fn as_poster(&self) -> Option<&dyn Poster> {
        Some(self)
    }

    fn as_deleter(&self) -> Option<&dyn Deleter> {
        Some(self)
    }
}

/// Read-only endpoint serving a ten byte blob
pub struct Shelf {
    pub blob: Blob,
}

impl Default for Shelf {
    fn default() -> Self {
        Self {
            blob: Blob::new("\"b1\"", at(2024, 1, 1), b"0123456789"),
        }
    }
}

#[async_trait]
impl Getter for Shelf {
    async fn get(&self, _vars: &RouteVars, _request: &Request) -> Result<Option<Box<dyn Resource>>> {
        Ok(Some(Box::new(self.blob.clone())))
    }
}

impl Endpoint for Shelf {
    fn as_getter(&self) -> Option<&dyn Getter> {
        Some(self)
    }
}

/// Endpoint without any capability
pub struct Bare;

impl Endpoint for Bare {}
