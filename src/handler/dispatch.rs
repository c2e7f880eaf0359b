//! Method dispatch module
//!
//! Resolves a request method against the capabilities an endpoint declares.
//! [`Verb::ALL`] is the single ordered list of dispatchable methods; both the
//! dispatch table and the `Allow` list are derived from it so they never
//! disagree.

use std::fmt;

use hyper::Method;

use crate::endpoint::{Deleter, Endpoint, Getter, Patcher, Poster, Putter};

/// Methods bound to endpoint capabilities, in canonical `Allow` order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Head,
    Get,
    Patch,
    Put,
    Post,
    Delete,
}

impl Verb {
    pub const ALL: [Self; 6] = [
        Self::Head,
        Self::Get,
        Self::Patch,
        Self::Put,
        Self::Post,
        Self::Delete,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Head => "HEAD",
            Self::Get => "GET",
            Self::Patch => "PATCH",
            Self::Put => "PUT",
            Self::Post => "POST",
            Self::Delete => "DELETE",
        }
    }

    /// Verb for a request method, `None` for OPTIONS and unknown methods
    pub fn from_method(method: &Method) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(method.as_str()))
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operation a request is bound to
pub enum Operation<'a> {
    /// Synthesized, never touches the endpoint's operations
    Options,
    /// GET and HEAD share the getter
    Get(&'a dyn Getter),
    Patch(&'a dyn Patcher),
    Put(&'a dyn Putter),
    Post(&'a dyn Poster),
    Delete(&'a dyn Deleter),
}

impl fmt::Debug for Operation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Options => "Options",
            Self::Get(_) => "Get",
            Self::Patch(_) => "Patch",
            Self::Put(_) => "Put",
            Self::Post(_) => "Post",
            Self::Delete(_) => "Delete",
        };
        f.write_str(name)
    }
}

/// Dispatch table: the endpoint capability serving `verb`, if implemented
pub fn bind(endpoint: &dyn Endpoint, verb: Verb) -> Option<Operation<'_>> {
    match verb {
        Verb::Head | Verb::Get => endpoint.as_getter().map(Operation::Get),
        Verb::Patch => endpoint.as_patcher().map(Operation::Patch),
        Verb::Put => endpoint.as_putter().map(Operation::Put),
        Verb::Post => endpoint.as_poster().map(Operation::Post),
        Verb::Delete => endpoint.as_deleter().map(Operation::Delete),
    }
}

/// Resolve `method` to an operation, `None` when the endpoint does not support it
pub fn resolve<'a>(endpoint: &'a dyn Endpoint, method: &Method) -> Option<Operation<'a>> {
    if *method == Method::OPTIONS {
        return Some(Operation::Options);
    }
    Verb::from_method(method).and_then(|verb| bind(endpoint, verb))
}

/// Methods supported by `endpoint`, in canonical order
pub fn allowed_methods(endpoint: &dyn Endpoint) -> Vec<Verb> {
    Verb::ALL
        .into_iter()
        .filter(|verb| bind(endpoint, *verb).is_some())
        .collect()
}

/// `Allow` header value for a method list
pub fn allow_header(verbs: &[Verb]) -> String {
    verbs
        .iter()
        .map(|v| v.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
