//! Byte documents with range support

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hyper::body::Bytes;
use hyper::header::{HeaderMap, HeaderValue, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE, IF_MATCH};
use hyper::{Method, StatusCode};
use tokio::sync::RwLock;
use yarest::endpoint::{Endpoint, Getter, Putter, Request, RouteVars};
use yarest::error::{Error, Result};
use yarest::http::response::build_response;
use yarest::http::{check_preconditions, generate_etag, ContentRange, RangeRequest, Response};
use yarest::resource::{DirectWriter, Marshaler, Ranger, Representation, Resource};

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";
const DOCUMENT_TTL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct Document {
    name: String,
    content: Bytes,
    content_type: String,
    etag: String,
    modified: DateTime<Utc>,
}

impl Document {
    fn new(name: &str, content: Bytes, content_type: &str) -> Self {
        Self {
            name: name.to_string(),
            etag: generate_etag(&content),
            content,
            content_type: content_type.to_string(),
            modified: Utc::now(),
        }
    }
}

impl Resource for Document {
    fn etag(&self) -> String {
        self.etag.clone()
    }

    fn last_modified(&self) -> DateTime<Utc> {
        self.modified
    }

    fn ttl(&self) -> Duration {
        DOCUMENT_TTL
    }

    fn as_ranger(&self) -> Option<&dyn Ranger> {
        Some(self)
    }

    fn as_marshaler(&self) -> Option<&dyn Marshaler> {
        Some(self)
    }
}

impl Ranger for Document {
    fn units(&self) -> &[&str] {
        &["bytes"]
    }

    fn count(&self) -> u64 {
        self.content.len() as u64
    }

    fn range(&self, range: &RangeRequest) -> Result<(ContentRange, Box<dyn Resource>)> {
        let from = usize::try_from(range.from).map_err(|e| Error::Internal(e.to_string()))?;
        let to = usize::try_from(range.to).map_err(|e| Error::Internal(e.to_string()))?;
        if to >= self.content.len() {
            return Err(Error::RangeNotSatisfiable {
                unit: range.unit.clone(),
                count: self.count(),
            });
        }

        let part = Self {
            content: self.content.slice(from..=to),
            ..self.clone()
        };
        Ok((ContentRange::new(range, self.count()), Box::new(part)))
    }
}

impl Marshaler for Document {
    fn marshal(&self, _accept: Option<&str>) -> Result<Representation> {
        Ok(Representation::new(self.content_type.clone(), self.content.clone()))
    }
}

/// A document sent as a file attachment
struct Download(Document);

impl Resource for Download {
    fn etag(&self) -> String {
        self.0.etag()
    }

    fn last_modified(&self) -> DateTime<Utc> {
        self.0.last_modified()
    }

    fn ttl(&self) -> Duration {
        self.0.ttl()
    }

    fn as_direct_writer(&self) -> Option<&dyn DirectWriter> {
        Some(self)
    }
}

impl DirectWriter for Download {
    fn write_response(&self, request: &Request, mut headers: HeaderMap) -> Response {
        let doc = &self.0;
        let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", doc.name))
            .unwrap_or_else(|_| HeaderValue::from_static("attachment"));
        headers.insert(CONTENT_DISPOSITION, disposition);
        if let Ok(content_type) = HeaderValue::from_str(&doc.content_type) {
            headers.insert(CONTENT_TYPE, content_type);
        }
        headers.insert(CONTENT_LENGTH, HeaderValue::from(doc.content.len()));

        let body = if *request.method() == Method::HEAD {
            Bytes::new()
        } else {
            doc.content.clone()
        };
        build_response(StatusCode::OK, headers, body)
    }
}

pub struct DocumentStore {
    documents: RwLock<HashMap<String, Document>>,
}

impl DocumentStore {
    pub fn seeded() -> Self {
        let readme = Document::new(
            "readme",
            Bytes::from_static(b"Documents support Range requests. Try: Range: bytes=0-9\n"),
            "text/plain",
        );
        Self {
            documents: RwLock::new(HashMap::from([(readme.name.clone(), readme)])),
        }
    }

    async fn get(&self, vars: &RouteVars) -> Result<Document> {
        let name = vars.get("name").ok_or(Error::NotFound)?;
        self.documents
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or(Error::NotFound)
    }
}

/// `/documents/{name}`
pub struct Documents {
    store: Arc<DocumentStore>,
}

impl Documents {
    pub const fn new(store: Arc<DocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Getter for Documents {
    async fn get(&self, vars: &RouteVars, _request: &Request) -> Result<Option<Box<dyn Resource>>> {
        Ok(Some(Box::new(self.store.get(vars).await?)))
    }
}

#[async_trait]
impl Putter for Documents {
    /// Store the raw body; the response carries no body
    async fn put(&self, vars: &RouteVars, request: &Request) -> Result<Option<Box<dyn Resource>>> {
        let name = vars.get("name").ok_or(Error::NotFound)?;
        let content_type = request
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(DEFAULT_CONTENT_TYPE);

        let mut documents = self.store.documents.write().await;
        match documents.get(name) {
            Some(current) => check_preconditions(current, request)?,
            // If-Match never matches a document that does not exist yet
            None if request.headers().contains_key(IF_MATCH) => {
                return Err(Error::PreconditionFailed)
            }
            None => {}
        }

        let document = Document::new(name, request.body().clone(), content_type);
        documents.insert(name.to_string(), document);
        Ok(None)
    }
}

impl Endpoint for Documents {
    fn as_getter(&self) -> Option<&dyn Getter> {
        Some(self)
    }

    fn as_putter(&self) -> Option<&dyn Putter> {
        Some(self)
    }
}

/// `/documents/{name}/download`
pub struct Downloads {
    store: Arc<DocumentStore>,
}

impl Downloads {
    pub const fn new(store: Arc<DocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Getter for Downloads {
    async fn get(&self, vars: &RouteVars, _request: &Request) -> Result<Option<Box<dyn Resource>>> {
        Ok(Some(Box::new(Download(self.store.get(vars).await?))))
    }
}

impl Endpoint for Downloads {
    fn as_getter(&self) -> Option<&dyn Getter> {
        Some(self)
    }
}
