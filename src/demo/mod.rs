//! Demo endpoints served by the binary
//!
//! - `/notes`: list notes, create one from a JSON body
//! - `/notes/{id}`: read, replace, patch or delete a note
//! - `/documents/{name}`: ranged reads, raw byte uploads
//! - `/documents/{name}/download`: the same bytes as an attachment

mod documents;
mod notes;

use std::sync::Arc;

use hyper::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use yarest::endpoint::Request;
use yarest::error::{Error, Result};
use yarest::handler::HandlerOptions;
use yarest::routing::Router;

pub fn router(options: HandlerOptions) -> std::result::Result<Router, String> {
    let notes = Arc::new(notes::NoteStore::seeded());
    let documents = Arc::new(documents::DocumentStore::seeded());

    Router::new(options)
        .route("/notes", Arc::new(notes::NoteCollection::new(Arc::clone(&notes))))?
        .route("/notes/{id}", Arc::new(notes::NoteEntry::new(notes)))?
        .route(
            "/documents/{name}/download",
            Arc::new(documents::Downloads::new(Arc::clone(&documents))),
        )?
        .route("/documents/{name}", Arc::new(documents::Documents::new(documents)))
}

/// Decode a JSON request body, rejecting other media types with 415
fn parse_json<T: DeserializeOwned>(request: &Request) -> Result<T> {
    let media_type = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map_or("", str::trim);
    if !media_type.eq_ignore_ascii_case("application/json") {
        return Err(Error::unsupported_media_type(["application/json"]));
    }

    serde_json::from_slice(request.body())
        .map_err(|e| Error::BadRequest(format!("invalid JSON body: {e}")))
}

#[cfg(test)]
fn request(method: &str, uri: &str, headers: &[(&str, &str)], body: &[u8]) -> Request {
    let mut builder = hyper::Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder
        .body(hyper::body::Bytes::copy_from_slice(body))
        .unwrap()
}
