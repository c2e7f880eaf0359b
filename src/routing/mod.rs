//! Routing module
//!
//! Maps request paths to endpoint handlers. Routes are tried in registration
//! order and the first pattern matching the path wins; its `{var}` segments
//! become the [`RouteVars`] handed to the endpoint operations.

mod matcher;

use std::sync::Arc;

use crate::endpoint::{Endpoint, Request, RouteVars};
use crate::error::Error;
use crate::handler::dispatch::allow_header;
use crate::handler::{EndpointHandler, HandlerOptions};
use crate::http::response::Response;
use crate::logger;

pub use matcher::PathPattern;

struct Route {
    pattern: PathPattern,
    handler: EndpointHandler,
}

/// Ordered table of path patterns and their handlers
pub struct Router {
    options: Arc<HandlerOptions>,
    routes: Vec<Route>,
}

impl Router {
    pub fn new(options: HandlerOptions) -> Self {
        Self {
            options: Arc::new(options),
            routes: Vec::new(),
        }
    }

    /// Register `endpoint` under `pattern`
    pub fn route(mut self, pattern: &str, endpoint: Arc<dyn Endpoint>) -> Result<Self, String> {
        let pattern = PathPattern::parse(pattern)?;
        let handler = EndpointHandler::with_options(endpoint, Arc::clone(&self.options));
        logger::log_route(&pattern.to_string(), &allow_header(handler.allowed_methods()));
        self.routes.push(Route { pattern, handler });
        Ok(self)
    }

    /// First handler whose pattern matches `path`, with the bound variables
    pub fn resolve(&self, path: &str) -> Option<(&EndpointHandler, RouteVars)> {
        self.routes
            .iter()
            .find_map(|route| route.pattern.matches(path).map(|vars| (&route.handler, vars)))
    }

    /// Serve `request`, answering 404 when no route matches
    pub async fn handle(&self, request: &Request) -> Response {
        match self.resolve(request.uri().path()) {
            Some((handler, vars)) => handler.serve(&vars, request).await,
            None => {
                logger::log_debug(&format!("No route for {}", request.uri().path()));
                Error::NotFound.into_response()
            }
        }
    }
}
