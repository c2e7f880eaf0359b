//! In-memory notes collection

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use yarest::endpoint::{
    Created, Deleter, Endpoint, Getter, Patcher, Poster, Putter, Request, RouteVars,
};
use yarest::error::{Error, Result};
use yarest::http::{check_preconditions, generate_etag};
use yarest::resource::Resource;

use super::parse_json;

/// Clients may cache note lists for this long
const LIST_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Serialize)]
pub struct Note {
    id: u64,
    title: String,
    body: String,
    version: u64,
    #[serde(skip)]
    modified: DateTime<Utc>,
}

impl Note {
    fn new(id: u64, title: String, body: String) -> Self {
        Self {
            id,
            title,
            body,
            version: 1,
            modified: Utc::now(),
        }
    }

    fn touch(&mut self) {
        self.version += 1;
        self.modified = Utc::now();
    }
}

impl Resource for Note {
    fn etag(&self) -> String {
        format!("\"{}-{}\"", self.id, self.version)
    }

    fn last_modified(&self) -> DateTime<Utc> {
        self.modified
    }

    fn ttl(&self) -> Duration {
        Duration::ZERO
    }

    fn to_value(&self) -> Option<serde_json::Value> {
        serde_json::to_value(self).ok()
    }
}

/// Snapshot of every note, newest id last
struct NoteList(Vec<Note>);

impl Resource for NoteList {
    fn etag(&self) -> String {
        let versions: String = self.0.iter().map(Resource::etag).collect();
        generate_etag(versions.as_bytes())
    }

    fn last_modified(&self) -> DateTime<Utc> {
        self.0
            .iter()
            .map(|n| n.modified)
            .max()
            .unwrap_or(DateTime::UNIX_EPOCH)
    }

    fn ttl(&self) -> Duration {
        LIST_TTL
    }

    fn to_value(&self) -> Option<serde_json::Value> {
        Some(serde_json::json!({ "notes": self.0 }))
    }
}

#[derive(Debug, Deserialize)]
struct NoteInput {
    title: String,
    #[serde(default)]
    body: String,
}

#[derive(Debug, Deserialize)]
struct NotePatch {
    title: Option<String>,
    body: Option<String>,
}

pub struct NoteStore {
    notes: RwLock<BTreeMap<u64, Note>>,
}

impl NoteStore {
    pub fn seeded() -> Self {
        let welcome = Note::new(
            1,
            "Welcome".to_string(),
            "Notes are served as JSON or TOML.".to_string(),
        );
        Self {
            notes: RwLock::new(BTreeMap::from([(welcome.id, welcome)])),
        }
    }

    /// Titles are unique across the collection
    fn ensure_unique(notes: &BTreeMap<u64, Note>, title: &str, except: Option<u64>) -> Result<()> {
        let taken = notes
            .values()
            .any(|n| Some(n.id) != except && n.title == title);
        if taken {
            return Err(Error::conflict(format!("a note titled {title:?} already exists")));
        }
        Ok(())
    }
}

fn note_id(vars: &RouteVars) -> Result<u64> {
    vars.get("id")
        .and_then(|id| id.parse().ok())
        .ok_or(Error::NotFound)
}

fn validate_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(Error::BadRequest("title must not be empty".to_string()));
    }
    Ok(())
}

/// `/notes`
pub struct NoteCollection {
    store: Arc<NoteStore>,
}

impl NoteCollection {
    pub const fn new(store: Arc<NoteStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Getter for NoteCollection {
    async fn get(&self, _vars: &RouteVars, _request: &Request) -> Result<Option<Box<dyn Resource>>> {
        let notes = self.store.notes.read().await;
        Ok(Some(Box::new(NoteList(notes.values().cloned().collect()))))
    }
}

#[async_trait]
impl Poster for NoteCollection {
    async fn post(&self, _vars: &RouteVars, request: &Request) -> Result<Created> {
        let input: NoteInput = parse_json(request)?;
        validate_title(&input.title)?;

        let mut notes = self.store.notes.write().await;
        NoteStore::ensure_unique(&notes, &input.title, None)?;
        let id = notes.keys().next_back().map_or(1, |last| last + 1);
        let note = Note::new(id, input.title, input.body);
        notes.insert(id, note.clone());

        Ok(Created::new(Box::new(note), format!("/notes/{id}")))
    }
}

impl Endpoint for NoteCollection {
    fn as_getter(&self) -> Option<&dyn Getter> {
        Some(self)
    }

    fn as_poster(&self) -> Option<&dyn Poster> {
        Some(self)
    }
}

/// `/notes/{id}`
pub struct NoteEntry {
    store: Arc<NoteStore>,
}

impl NoteEntry {
    pub const fn new(store: Arc<NoteStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Getter for NoteEntry {
    async fn get(&self, vars: &RouteVars, _request: &Request) -> Result<Option<Box<dyn Resource>>> {
        let id = note_id(vars)?;
        let notes = self.store.notes.read().await;
        let note = notes.get(&id).ok_or(Error::NotFound)?;
        Ok(Some(Box::new(note.clone())))
    }
}

#[async_trait]
impl Putter for NoteEntry {
    async fn put(&self, vars: &RouteVars, request: &Request) -> Result<Option<Box<dyn Resource>>> {
        let id = note_id(vars)?;
        let input: NoteInput = parse_json(request)?;
        validate_title(&input.title)?;

        let mut notes = self.store.notes.write().await;
        NoteStore::ensure_unique(&notes, &input.title, Some(id))?;
        let note = notes.get_mut(&id).ok_or(Error::NotFound)?;
        check_preconditions(&*note, request)?;

        note.title = input.title;
        note.body = input.body;
        note.touch();
        Ok(Some(Box::new(note.clone())))
    }
}

#[async_trait]
impl Patcher for NoteEntry {
    async fn patch(&self, vars: &RouteVars, request: &Request) -> Result<Option<Box<dyn Resource>>> {
        let id = note_id(vars)?;
        let patch: NotePatch = parse_json(request)?;
        if let Some(title) = &patch.title {
            validate_title(title)?;
        }

        let mut notes = self.store.notes.write().await;
        if let Some(title) = &patch.title {
            NoteStore::ensure_unique(&notes, title, Some(id))?;
        }
        let note = notes.get_mut(&id).ok_or(Error::NotFound)?;
        check_preconditions(&*note, request)?;

        if let Some(title) = patch.title {
            note.title = title;
        }
        if let Some(body) = patch.body {
            note.body = body;
        }
        note.touch();
        Ok(Some(Box::new(note.clone())))
    }
}

#[async_trait]
impl Deleter for NoteEntry {
    async fn delete(&self, vars: &RouteVars, request: &Request) -> Result<()> {
        let id = note_id(vars)?;
        let mut notes = self.store.notes.write().await;
        let note = notes.get(&id).ok_or(Error::NotFound)?;
        check_preconditions(&*note, request)?;
        notes.remove(&id);
        Ok(())
    }
}

impl Endpoint for NoteEntry {
    fn as_getter(&self) -> Option<&dyn Getter> {
        Some(self)
    }

    fn as_patcher(&self) -> Option<&dyn Patcher> {
        Some(self)
    }

    fn as_putter(&self) -> Option<&dyn Putter> {
        Some(self)
    }

    fn as_deleter(&self) -> Option<&dyn Deleter> {
        Some(self)
    }
}
