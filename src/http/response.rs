//! HTTP response building module
//!
//! Provides builders for the status responses the pipeline emits outside of
//! the representation path: errors, 204, 304 and OPTIONS.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderMap, HeaderValue, ALLOW, CONTENT_LENGTH, CONTENT_TYPE};
use hyper::StatusCode;

/// Response type produced by every pipeline component
pub type Response = hyper::Response<Full<Bytes>>;

/// Build a response from a status, a prepared header map and a body
pub fn build_response(status: StatusCode, headers: HeaderMap, body: Bytes) -> Response {
    let mut response = hyper::Response::new(Full::new(body));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

/// Build 204 No Content response
pub fn build_no_content_response(headers: HeaderMap) -> Response {
    build_response(StatusCode::NO_CONTENT, headers, Bytes::new())
}

/// Build 304 Not Modified response
///
/// Headers accumulated before the short-circuit are kept and the current
/// `ETag` is advertised.
pub fn build_not_modified_response(mut headers: HeaderMap, etag: &str) -> Response {
    match HeaderValue::from_str(etag) {
        Ok(value) => {
            headers.insert(hyper::header::ETAG, value);
        }
        Err(e) => log_build_error("304", &e),
    }
    build_response(StatusCode::NOT_MODIFIED, headers, Bytes::new())
}

/// Build OPTIONS response
///
/// `allow` is the endpoint's method list, `alternatives` the media types the
/// negotiator can produce.
pub fn build_options_response(allow: &str, alternatives: &str) -> Response {
    hyper::Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header(ALLOW, allow)
        .header(CONTENT_TYPE, alternatives)
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|e| {
            log_build_error("OPTIONS", &e);
            empty_response(StatusCode::NO_CONTENT)
        })
}

/// Build an error response with a JSON body describing the failure
pub fn build_error_response(
    status: StatusCode,
    message: &str,
    extra_header: Option<(&'static str, String)>,
) -> Response {
    let body = serde_json::json!({
        "error": {
            "code": status.as_u16(),
            "message": message
        }
    })
    .to_string();

    let mut builder = hyper::Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "application/json")
        .header(CONTENT_LENGTH, body.len());
    if let Some((name, value)) = extra_header {
        builder = builder.header(name, value);
    }

    builder
        .body(Full::new(Bytes::from(body)))
        .unwrap_or_else(|e| {
            log_build_error(status.as_str(), &e);
            empty_response(status)
        })
}

fn empty_response(status: StatusCode) -> Response {
    build_response(status, HeaderMap::new(), Bytes::new())
}

/// Log response build error
fn log_build_error(status: &str, error: &dyn std::fmt::Display) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}
