//! Request handler module
//!
//! Serves requests for one endpoint: resolves the method against the
//! endpoint's capabilities, runs the bound operation and writes its outcome.

pub mod dispatch;
pub mod writer;

#[cfg(test)]
pub(crate) mod fixtures;

use std::sync::Arc;

use hyper::body::Bytes;
use hyper::header::{HeaderMap, HeaderName, ACCEPT_RANGES, CONTENT_RANGE, IF_RANGE, LOCATION, RANGE};
use hyper::StatusCode;

use crate::config::HttpConfig;
use crate::endpoint::{Deleter, Endpoint, Getter, Poster, Request, RouteVars};
use crate::error::Error;
use crate::http::compression::CompressionPolicy;
use crate::http::negotiate::Negotiator;
use crate::http::range::{negotiate_range, RangeOutcome};
use crate::http::response::{self, Response};
use crate::logger;
use crate::resource::Resource;

use dispatch::{allow_header, allowed_methods, resolve, Operation, Verb};
pub use writer::{Outcome, ResponseWriter};

/// Collaborators shared by every request an endpoint handler serves
#[derive(Debug, Clone, Default)]
pub struct HandlerOptions {
    /// Representation negotiation and encoding
    pub negotiator: Negotiator,
    /// When and how bodies get compressed
    pub compression: CompressionPolicy,
}

impl HandlerOptions {
    pub fn from_config(http: &HttpConfig) -> Self {
        Self {
            negotiator: Negotiator::from_media_types(&http.representations),
            compression: CompressionPolicy {
                enabled: http.compression.enabled,
                min_size: http.compression.min_size,
            },
        }
    }
}

/// Serves HTTP requests for the resource exposed by an endpoint
#[derive(Clone)]
pub struct EndpointHandler {
    endpoint: Arc<dyn Endpoint>,
    options: Arc<HandlerOptions>,
    allowed: Arc<[Verb]>,
}

impl EndpointHandler {
    pub fn new(endpoint: Arc<dyn Endpoint>) -> Self {
        Self::with_options(endpoint, Arc::new(HandlerOptions::default()))
    }

    pub fn with_options(endpoint: Arc<dyn Endpoint>, options: Arc<HandlerOptions>) -> Self {
        let allowed = allowed_methods(endpoint.as_ref()).into();
        Self {
            endpoint,
            options,
            allowed,
        }
    }

    /// Methods this endpoint supports, in canonical order
    pub fn allowed_methods(&self) -> &[Verb] {
        &self.allowed
    }

    /// Produce the response for `request`
    pub async fn serve(&self, vars: &RouteVars, request: &Request) -> Response {
        let Some(operation) = resolve(self.endpoint.as_ref(), request.method()) else {
            return self.unsupported(request);
        };

        match operation {
            Operation::Options => self.serve_options(),
            Operation::Get(getter) => self.serve_get(getter, vars, request).await,
            Operation::Patch(patcher) => {
                let result = patcher.patch(vars, request).await;
                self.serve_modified(result, request)
            }
            Operation::Put(putter) => {
                let result = putter.put(vars, request).await;
                self.serve_modified(result, request)
            }
            Operation::Post(poster) => self.serve_post(poster, vars, request).await,
            Operation::Delete(deleter) => Self::serve_delete(deleter, vars, request).await,
        }
    }

    fn unsupported(&self, request: &Request) -> Response {
        if self.allowed.is_empty() {
            return Error::NotFound.into_response();
        }
        logger::log_warning(&format!("Method not allowed: {}", request.method()));
        Error::MethodNotAllowed {
            allowed: self.allowed.to_vec(),
        }
        .into_response()
    }

    fn serve_options(&self) -> Response {
        response::build_options_response(
            &allow_header(&self.allowed),
            &self.options.negotiator.alternatives().join(";"),
        )
    }

    async fn serve_get(&self, getter: &dyn Getter, vars: &RouteVars, request: &Request) -> Response {
        let resource = match getter.get(vars, request).await {
            Ok(Some(resource)) => resource,
            Ok(None) => return response::build_no_content_response(HeaderMap::new()),
            Err(e) => return e.into_response(),
        };

        let mut writer = ResponseWriter::new(request, &self.options);
        let Some(ranger) = resource.as_ranger() else {
            return writer.write(resource.as_ref(), Outcome::Read);
        };

        writer.set_header(ACCEPT_RANGES, &ranger.units().join(", "));
        let range_header = header_str(request, &RANGE);
        if range_header.is_some() {
            writer.add_vary("Range");
        }

        if let Some(not_modified) = writer.revalidate(resource.as_ref(), Outcome::Read) {
            return not_modified;
        }
        let Some(range_header) = range_header else {
            return writer.write_representation(resource.as_ref(), Outcome::Read);
        };

        let if_range = header_str(request, &IF_RANGE);
        match negotiate_range(range_header, if_range, resource.as_ref(), ranger) {
            RangeOutcome::Full => writer.write_representation(resource.as_ref(), Outcome::Read),
            RangeOutcome::Unsatisfiable(e) => e.into_response(),
            RangeOutcome::Partial(range) => match ranger.range(&range) {
                Ok((content_range, partial)) => {
                    if !content_range.is_complete() {
                        writer.set_header(CONTENT_RANGE, &content_range.to_string());
                    }
                    writer.write_representation(partial.as_ref(), Outcome::Read)
                }
                Err(e) => {
                    logger::log_warning(&format!(
                        "Failed to extract {} {}-{}: {e}",
                        range.unit, range.from, range.to
                    ));
                    e.into_response()
                }
            },
        }
    }

    fn serve_modified(
        &self,
        result: Result<Option<Box<dyn Resource>>, Error>,
        request: &Request,
    ) -> Response {
        match result {
            Ok(Some(resource)) => {
                ResponseWriter::new(request, &self.options).write(resource.as_ref(), Outcome::Modified)
            }
            Ok(None) => response::build_response(StatusCode::OK, HeaderMap::new(), Bytes::new()),
            Err(e) => e.into_response(),
        }
    }

    async fn serve_post(&self, poster: &dyn Poster, vars: &RouteVars, request: &Request) -> Response {
        let created = match poster.post(vars, request).await {
            Ok(created) => created,
            Err(e) => return e.into_response(),
        };

        let mut writer = ResponseWriter::new(request, &self.options);
        if let Some(location) = created.location.as_deref().filter(|l| !l.is_empty()) {
            writer.set_header(LOCATION, location);
        }

        match created.resource {
            Some(resource) => writer.write(resource.as_ref(), Outcome::Created),
            None => response::build_response(StatusCode::CREATED, writer.into_headers(), Bytes::new()),
        }
    }

    async fn serve_delete(deleter: &dyn Deleter, vars: &RouteVars, request: &Request) -> Response {
        match deleter.delete(vars, request).await {
            Ok(()) => response::build_no_content_response(HeaderMap::new()),
            Err(e) => e.into_response(),
        }
    }
}

fn header_str<'r>(request: &'r Request, name: &HeaderName) -> Option<&'r str> {
    request.headers().get(name).and_then(|v| v.to_str().ok())
}
