//! Response writer module
//!
//! Turns a resource into the final response. Header assembly always runs in
//! the same order:
//!
//! 1. cache revalidation short-circuit (304), read methods only
//! 2. `Vary: Accept`, `Last-Modified`, `ETag`, `Expires`
//! 3. hand-off to a [`DirectWriter`](crate::resource::DirectWriter)
//! 4. representation negotiation
//! 5. compression and `Vary: Accept-Encoding`, skipped for partial content
//! 6. status selection
//! 7. body suppression for HEAD

use chrono::Utc;
use hyper::body::Bytes;
use hyper::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_ENCODING, CONTENT_ENCODING,
    CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, ETAG, EXPIRES, LAST_MODIFIED, VARY,
};
use hyper::{Method, StatusCode};

use super::HandlerOptions;
use crate::endpoint::Request;
use crate::http::compression;
use crate::http::conditional;
use crate::http::date::format_http_date;
use crate::http::response::{self, Response};
use crate::logger;
use crate::resource::Resource;

/// Which kind of operation produced the resource being written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// GET or HEAD
    Read,
    /// PATCH or PUT
    Modified,
    /// POST
    Created,
}

/// Writes resources for one request
pub struct ResponseWriter<'a> {
    request: &'a Request,
    options: &'a HandlerOptions,
    headers: HeaderMap,
}

impl<'a> ResponseWriter<'a> {
    pub fn new(request: &'a Request, options: &'a HandlerOptions) -> Self {
        Self {
            request,
            options,
            headers: HeaderMap::new(),
        }
    }

    /// Set a header, replacing any previous value
    pub fn set_header(&mut self, name: HeaderName, value: &str) {
        match HeaderValue::from_str(value) {
            Ok(v) => {
                self.headers.insert(name, v);
            }
            Err(e) => logger::log_warning(&format!("Dropping invalid {name} header: {e}")),
        }
    }

    /// Add a `Vary` entry, keeping those already present
    pub fn add_vary(&mut self, value: &'static str) {
        self.headers.append(VARY, HeaderValue::from_static(value));
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Answer 304 if the client's cached copy of `resource` is current
    ///
    /// Only read requests are revalidated. A PATCH, PUT or POST has already
    /// changed state, so its client must see the outcome rather than a 304.
    pub fn revalidate(&self, resource: &dyn Resource, outcome: Outcome) -> Option<Response> {
        if outcome != Outcome::Read || !conditional::not_modified(resource, self.request.headers())
        {
            return None;
        }
        Some(response::build_not_modified_response(
            self.headers.clone(),
            &resource.etag(),
        ))
    }

    /// Write `resource`, revalidating first
    pub fn write(self, resource: &dyn Resource, outcome: Outcome) -> Response {
        if let Some(not_modified) = self.revalidate(resource, outcome) {
            return not_modified;
        }
        self.write_representation(resource, outcome)
    }

    /// Write `resource` without the revalidation step
    ///
    /// Used once revalidation already ran, e.g. against the full resource
    /// before a partial one was extracted.
    pub fn write_representation(mut self, resource: &dyn Resource, outcome: Outcome) -> Response {
        self.add_vary("Accept");
        self.set_header(LAST_MODIFIED, &format_http_date(resource.last_modified()));
        self.set_header(ETAG, &resource.etag());
        self.set_header(EXPIRES, &format_http_date(expires_at(resource)));

        if let Some(direct) = resource.as_direct_writer() {
            return direct.write_response(self.request, self.headers);
        }

        let accept = header_str(self.request, &ACCEPT);
        let representation = match self.options.negotiator.marshal(resource, accept) {
            Ok(r) => r,
            Err(e) => return e.into_response(),
        };
        self.set_header(CONTENT_TYPE, &representation.content_type);

        // Content-Range counts identity bytes
        let body = if self.headers.contains_key(CONTENT_RANGE) {
            representation.body
        } else {
            self.compress(representation.body, &representation.content_type)
        };
        let status = self.select_status(outcome, &body);
        if status != StatusCode::NO_CONTENT {
            self.headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));
        }

        let body = if *self.request.method() == Method::HEAD {
            Bytes::new()
        } else {
            body
        };
        response::build_response(status, self.headers, body)
    }

    fn compress(&mut self, body: Bytes, content_type: &str) -> Bytes {
        let accept_encoding = header_str(self.request, &ACCEPT_ENCODING);
        let Some(encoding) = self
            .options
            .compression
            .select(&body, content_type, accept_encoding)
        else {
            return body;
        };

        match compression::compress(encoding, &body) {
            Ok(compressed) => {
                self.headers
                    .insert(CONTENT_ENCODING, HeaderValue::from_static(encoding.as_str()));
                self.add_vary("Accept-Encoding");
                compressed
            }
            Err(e) => {
                logger::log_warning(&format!(
                    "Failed to {} response body, sending it unencoded: {e}",
                    encoding.as_str()
                ));
                body
            }
        }
    }

    fn select_status(&self, outcome: Outcome, body: &Bytes) -> StatusCode {
        if outcome == Outcome::Created {
            StatusCode::CREATED
        } else if body.is_empty() {
            StatusCode::NO_CONTENT
        } else if self.headers.contains_key(CONTENT_RANGE) {
            StatusCode::PARTIAL_CONTENT
        } else {
            StatusCode::OK
        }
    }

    /// Consume the writer, keeping only the accumulated headers
    pub fn into_headers(self) -> HeaderMap {
        self.headers
    }
}

fn expires_at(resource: &dyn Resource) -> chrono::DateTime<Utc> {
    let now = Utc::now();
    chrono::Duration::from_std(resource.ttl())
        .ok()
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or(now)
}

fn header_str<'r>(request: &'r Request, name: &HeaderName) -> Option<&'r str> {
    request.headers().get(name).and_then(|v| v.to_str().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::fixtures::{at, request, Blob, Item, Streamed};
    use crate::http::compression::CompressionPolicy;
    use crate::http::date::parse_http_date;
    use http_body_util::BodyExt;
    use std::time::Duration;

    async fn body(resp: Response) -> Bytes {
        resp.into_body().collect().await.unwrap().to_bytes()
    }

    #[tokio::test]
    async fn test_write_sets_validators() {
        let req = request("GET", &[]);
        let options = HandlerOptions::default();
        let item = Item::new("\"v1\"", at(2024, 1, 1));
        let resp = ResponseWriter::new(&req, &options).write(&item, Outcome::Read);

        assert_eq!(resp.status(), 200);
        let h = resp.headers();
        assert_eq!(h[ETAG], "\"v1\"");
        assert_eq!(h[LAST_MODIFIED], "Mon, 01 Jan 2024 00:00:00 GMT");
        assert_eq!(h[VARY], "Accept");
        assert_eq!(h[CONTENT_TYPE], "application/json");
        assert!(parse_http_date(h[EXPIRES].to_str().unwrap()).is_some());
        let len: usize = h[CONTENT_LENGTH].to_str().unwrap().parse().unwrap();
        assert_eq!(body(resp).await.len(), len);
    }

    #[test]
    fn test_expires_adds_ttl() {
        let req = request("GET", &[]);
        let options = HandlerOptions::default();
        let item = Item::new("\"v1\"", at(2024, 1, 1)).with_ttl(Duration::from_secs(3600));
        let resp = ResponseWriter::new(&req, &options).write(&item, Outcome::Read);
        let expires = parse_http_date(resp.headers()[EXPIRES].to_str().unwrap()).unwrap();
        let delta = expires - Utc::now();
        assert!(delta > chrono::Duration::seconds(3590));
        assert!(delta <= chrono::Duration::seconds(3600));
    }

    #[test]
    fn test_revalidation_only_on_reads() {
        let req = request("PUT", &[("If-None-Match", "\"v1\"")]);
        let options = HandlerOptions::default();
        let item = Item::new("\"v1\"", at(2024, 1, 1));
        let resp = ResponseWriter::new(&req, &options).write(&item, Outcome::Modified);
        assert_eq!(resp.status(), 200);

        let req = request("POST", &[("If-None-Match", "\"v1\"")]);
        let resp = ResponseWriter::new(&req, &options).write(&item, Outcome::Created);
        assert_eq!(resp.status(), 201);

        let req = request("GET", &[("If-None-Match", "\"v1\"")]);
        let resp = ResponseWriter::new(&req, &options).write(&item, Outcome::Read);
        assert_eq!(resp.status(), 304);
    }

    #[test]
    fn test_created_status() {
        let req = request("POST", &[]);
        let options = HandlerOptions::default();
        let item = Item::new("\"v1\"", at(2024, 1, 1));
        let resp = ResponseWriter::new(&req, &options).write(&item, Outcome::Created);
        assert_eq!(resp.status(), 201);
    }

    #[tokio::test]
    async fn test_empty_body_is_no_content() {
        let req = request("GET", &[]);
        let options = HandlerOptions::default();
        let blob = Blob::new("\"b0\"", at(2024, 1, 1), b"");
        let resp = ResponseWriter::new(&req, &options).write(&blob, Outcome::Read);
        assert_eq!(resp.status(), 204);
        assert!(resp.headers().get(CONTENT_LENGTH).is_none());
        assert!(body(resp).await.is_empty());
    }

    #[test]
    fn test_content_range_selects_partial() {
        let req = request("GET", &[]);
        let options = HandlerOptions::default();
        let blob = Blob::new("\"b1\"", at(2024, 1, 1), b"01234");
        let mut writer = ResponseWriter::new(&req, &options);
        writer.set_header(CONTENT_RANGE, "bytes 0-4/10");
        let resp = writer.write_representation(&blob, Outcome::Read);
        assert_eq!(resp.status(), 206);
    }

    #[tokio::test]
    async fn test_compression() {
        let req = request("GET", &[("Accept-Encoding", "gzip")]);
        let options = HandlerOptions {
            compression: CompressionPolicy {
                enabled: true,
                min_size: 8,
            },
            ..HandlerOptions::default()
        };
        let blob = Blob::new("\"b1\"", at(2024, 1, 1), &[b'x'; 256]);
        let resp = ResponseWriter::new(&req, &options).write(&blob, Outcome::Read);

        assert_eq!(resp.headers()[CONTENT_ENCODING], "gzip");
        let vary: Vec<_> = resp.headers().get_all(VARY).iter().collect();
        assert_eq!(vary, ["Accept", "Accept-Encoding"]);
        let len: usize = resp.headers()[CONTENT_LENGTH].to_str().unwrap().parse().unwrap();
        let bytes = body(resp).await;
        assert_eq!(bytes.len(), len);
        assert!(bytes.len() < 256);
    }

    #[tokio::test]
    async fn test_head_suppresses_body() {
        let options = HandlerOptions::default();
        let item = Item::new("\"v1\"", at(2024, 1, 1));

        let get = ResponseWriter::new(&request("GET", &[]), &options).write(&item, Outcome::Read);
        let head = ResponseWriter::new(&request("HEAD", &[]), &options).write(&item, Outcome::Read);

        assert_eq!(get.status(), head.status());
        assert_eq!(get.headers()[CONTENT_LENGTH], head.headers()[CONTENT_LENGTH]);
        assert!(body(head).await.is_empty());
        assert!(!body(get).await.is_empty());
    }

    #[tokio::test]
    async fn test_direct_writer_takes_over() {
        let req = request("GET", &[]);
        let options = HandlerOptions::default();
        let streamed = Streamed::new("\"s1\"", at(2024, 1, 1));
        let resp = ResponseWriter::new(&req, &options).write(&streamed, Outcome::Read);

        assert_eq!(resp.status(), 200);
        assert_eq!(resp.headers()["Content-Disposition"], "attachment");
        assert_eq!(resp.headers()[ETAG], "\"s1\"");
        assert_eq!(&body(resp).await[..], b"streamed");
    }

    #[test]
    fn test_negotiation_failure() {
        let req = request("GET", &[("Accept", "text/html")]);
        let options = HandlerOptions::default();
        let item = Item::new("\"v1\"", at(2024, 1, 1));
        let resp = ResponseWriter::new(&req, &options).write(&item, Outcome::Read);
        assert_eq!(resp.status(), 406);
        assert!(resp.headers().get(ETAG).is_none());
    }
}
