//! Error signaling module
//!
//! Every failure a caller-supplied operation or the pipeline itself can report,
//! each mapped to exactly one HTTP status code.

use hyper::StatusCode;
use thiserror::Error;

use crate::handler::dispatch::{allow_header, Verb};
use crate::http::response::{self, Response};

/// Result alias used by endpoint operations
pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline error taxonomy
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// No matching resource or operation
    #[error("resource not found")]
    NotFound,

    /// The endpoint exists but does not implement the requested method
    #[error("method not allowed, expected one of: {}", allow_header(.allowed))]
    MethodNotAllowed { allowed: Vec<Verb> },

    /// The request conflicts with the current state of the resource
    #[error("conflict: {0}")]
    Conflict(String),

    /// A conditional request header did not match the current resource version
    #[error("precondition failed")]
    PreconditionFailed,

    /// The request body is in a format the endpoint does not accept
    #[error("unsupported media type, expected one of: {}", .supported.join(", "))]
    UnsupportedMediaType { supported: Vec<String> },

    /// No representation satisfies the `Accept` header
    #[error("no acceptable representation, available: {}", .alternatives.join(", "))]
    NotAcceptable { alternatives: Vec<String> },

    /// A well-formed range that cannot be served from this resource
    #[error("range not satisfiable, resource has {count} {unit}")]
    RangeNotSatisfiable { unit: String, count: u64 },

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("payload too large")]
    PayloadTooLarge,

    #[error("internal server error: {0}")]
    Internal(String),
}

impl Error {
    /// Shorthand for [`Error::Conflict`]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// Shorthand for [`Error::UnsupportedMediaType`]
    pub fn unsupported_media_type<I, S>(supported: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::UnsupportedMediaType {
            supported: supported.into_iter().map(Into::into).collect(),
        }
    }

    /// HTTP status code this error is reported with
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::PreconditionFailed => StatusCode::PRECONDITION_FAILED,
            Self::UnsupportedMediaType { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::NotAcceptable { .. } => StatusCode::NOT_ACCEPTABLE,
            Self::RangeNotSatisfiable { .. } => StatusCode::RANGE_NOT_SATISFIABLE,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Build the terminal response for this error
    ///
    /// The body is a JSON document describing the failure; no header
    /// accumulated for a successful response survives.
    pub fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            crate::logger::log_error(&self.to_string());
        }

        let extra = match &self {
            Self::MethodNotAllowed { allowed } => Some(("Allow", allow_header(allowed))),
            Self::UnsupportedMediaType { supported } => Some(("Accept", supported.join(", "))),
            Self::RangeNotSatisfiable { unit, count } => {
                Some(("Content-Range", format!("{unit} */{count}")))
            }
            _ => None,
        };

        response::build_error_response(status, &self.to_string(), extra)
    }
}

impl From<Error> for Response {
    fn from(error: Error) -> Self {
        error.into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_kind_has_one_status() {
        assert_eq!(Error::NotFound.status(), 404);
        assert_eq!(
            Error::MethodNotAllowed { allowed: vec![] }.status(),
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert_eq!(Error::conflict("stale").status(), 409);
        assert_eq!(Error::PreconditionFailed.status(), 412);
        assert_eq!(Error::unsupported_media_type(["application/json"]).status(), 415);
        assert_eq!(
            Error::NotAcceptable {
                alternatives: vec![]
            }
            .status(),
            406
        );
        assert_eq!(
            Error::RangeNotSatisfiable {
                unit: "bytes".into(),
                count: 0
            }
            .status(),
            416
        );
    }

    #[test]
    fn test_method_not_allowed_carries_allow() {
        let resp = Error::MethodNotAllowed {
            allowed: vec![Verb::Head, Verb::Get],
        }
        .into_response();
        assert_eq!(resp.status(), 405);
        assert_eq!(resp.headers()["Allow"], "HEAD, GET");
    }

    #[test]
    fn test_range_not_satisfiable_reports_size() {
        let resp = Error::RangeNotSatisfiable {
            unit: "bytes".into(),
            count: 10,
        }
        .into_response();
        assert_eq!(resp.status(), 416);
        assert_eq!(resp.headers()["Content-Range"], "bytes */10");
    }

    #[test]
    fn test_unsupported_media_type_lists_accept() {
        let resp = Error::unsupported_media_type(["application/json", "application/toml"])
            .into_response();
        assert_eq!(resp.headers()["Accept"], "application/json, application/toml");
    }
}
