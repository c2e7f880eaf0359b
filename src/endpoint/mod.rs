//! Endpoint capability module
//!
//! An [`Endpoint`] is the access point exposing a resource. It declares which
//! methods it supports by returning `Some` from the matching `as_*` accessor;
//! the dispatcher queries these once per request. The answers must not change
//! over the lifetime of the endpoint, since the `Allow` list is derived from
//! them.
//!
//! ```
//! use async_trait::async_trait;
//! use yarest::endpoint::{Endpoint, Getter, Request, RouteVars};
//! use yarest::error::{Error, Result};
//! use yarest::resource::Resource;
//!
//! struct Users;
//!
//! #[async_trait]
//! impl Getter for Users {
//!     async fn get(&self, vars: &RouteVars, _r: &Request) -> Result<Option<Box<dyn Resource>>> {
//!         match vars.get("id") {
//!             Some(_id) => Ok(None), // look the user up here
//!             None => Err(Error::NotFound),
//!         }
//!     }
//! }
//!
//! impl Endpoint for Users {
//!     fn as_getter(&self) -> Option<&dyn Getter> {
//!         Some(self)
//!     }
//! }
//! ```

mod vars;

use async_trait::async_trait;
use hyper::body::Bytes;

use crate::error::Result;
use crate::resource::Resource;

pub use vars::RouteVars;

/// Request as seen by endpoint operations, with its body fully collected
pub type Request = hyper::Request<Bytes>;

/// Implemented by endpoints allowing the GET and HEAD methods.
#[async_trait]
pub trait Getter: Send + Sync {
    /// Returns the resource or an error. `None` answers 204 No Content.
    async fn get(&self, vars: &RouteVars, request: &Request) -> Result<Option<Box<dyn Resource>>>;
}

/// Implemented by endpoints allowing the PATCH method.
///
/// Call [`check_preconditions`](crate::http::conditional::check_preconditions)
/// before applying the patch to detect write conflicts.
#[async_trait]
pub trait Patcher: Send + Sync {
    /// Returns the patched resource or an error. `None` answers 200 with no body.
    async fn patch(&self, vars: &RouteVars, request: &Request)
        -> Result<Option<Box<dyn Resource>>>;
}

/// Implemented by endpoints allowing the PUT method.
///
/// Same conflict-detection contract as [`Patcher`].
#[async_trait]
pub trait Putter: Send + Sync {
    /// Returns the modified resource or an error. `None` answers 200 with no body.
    async fn put(&self, vars: &RouteVars, request: &Request) -> Result<Option<Box<dyn Resource>>>;
}

/// Outcome of a successful POST
#[derive(Default)]
pub struct Created {
    /// Newly created resource, written with 201 when present
    pub resource: Option<Box<dyn Resource>>,
    /// URI where the new resource can be located, sent as `Location`
    pub location: Option<String>,
}

impl Created {
    pub fn new(resource: Box<dyn Resource>, location: impl Into<String>) -> Self {
        Self {
            resource: Some(resource),
            location: Some(location.into()),
        }
    }
}

/// Implemented by endpoints allowing the POST method.
#[async_trait]
pub trait Poster: Send + Sync {
    async fn post(&self, vars: &RouteVars, request: &Request) -> Result<Created>;
}

/// Implemented by endpoints allowing the DELETE method.
#[async_trait]
pub trait Deleter: Send + Sync {
    async fn delete(&self, vars: &RouteVars, request: &Request) -> Result<()>;
}

/// An access point exposing a resource
pub trait Endpoint: Send + Sync {
    fn as_getter(&self) -> Option<&dyn Getter> {
        None
    }

    fn as_patcher(&self) -> Option<&dyn Patcher> {
        None
    }

    fn as_putter(&self) -> Option<&dyn Putter> {
        None
    }

    fn as_poster(&self) -> Option<&dyn Poster> {
        None
    }

    fn as_deleter(&self) -> Option<&dyn Deleter> {
        None
    }
}
