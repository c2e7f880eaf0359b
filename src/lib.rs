//! yarest: a resource-oriented HTTP pipeline on hyper.
//!
//! Application code implements [`endpoint::Endpoint`] and the per-method
//! operation traits; the pipeline dispatches each request to the matching
//! operation and handles the HTTP mechanics around it: `Allow` lists,
//! conditional requests, range requests, content negotiation, compression
//! and the status code of every outcome.
//!
//! The `routing`, `server`, `config` and `logger` modules wire the pipeline
//! into a runnable tokio server.

pub mod config;
pub mod endpoint;
pub mod error;
pub mod handler;
pub mod http;
pub mod logger;
pub mod resource;
pub mod routing;
pub mod server;
