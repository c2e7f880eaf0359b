// Connection handling module
// Accepts TCP connections, serves HTTP/1 requests through the router

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::{Body, Bytes, Incoming};
use hyper::header::{CONTENT_LENGTH, SERVER};
use hyper::http::request::Parts;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::{TokioIo, TokioTimer};

use super::ServerState;
use crate::endpoint::Request;
use crate::error::Error;
use crate::http::response::Response;
use crate::logger::{self, AccessLogEntry};

/// Accept a connection unless the connection limit is reached.
///
/// The counter is incremented before the check so concurrent accepts cannot
/// both slip under the limit.
pub fn accept_connection(stream: tokio::net::TcpStream, peer_addr: SocketAddr, state: &Arc<ServerState>) {
    let prev_count = state.active_connections.fetch_add(1, Ordering::SeqCst);

    if let Some(max_conn) = state.settings.max_connections {
        if prev_count >= usize::try_from(max_conn).unwrap_or(usize::MAX) {
            state.active_connections.fetch_sub(1, Ordering::SeqCst);
            logger::log_warning(&format!(
                "Max connections reached: {prev_count}/{max_conn}. Connection rejected."
            ));
            drop(stream);
            return;
        }
    }

    logger::log_connection_accepted(&peer_addr);
    handle_connection(stream, peer_addr, Arc::clone(state));
}

/// Serve a connection in a spawned task, releasing its slot when done
fn handle_connection(stream: tokio::net::TcpStream, peer_addr: SocketAddr, state: Arc<ServerState>) {
    tokio::spawn(async move {
        let io = TokioIo::new(stream);
        let settings = &state.settings;

        let mut builder = http1::Builder::new();
        builder
            .timer(TokioTimer::new())
            .keep_alive(!settings.keep_alive.is_zero())
            .header_read_timeout(settings.read_timeout);

        let service_state = Arc::clone(&state);
        let conn = builder.serve_connection(
            io,
            service_fn(move |req| serve_request(req, peer_addr, Arc::clone(&service_state))),
        );

        let lifetime = settings.keep_alive.max(settings.read_timeout);
        match tokio::time::timeout(lifetime, conn).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => logger::log_connection_error(&err),
            Err(_) => logger::log_debug(&format!(
                "Connection from {peer_addr} closed after {} seconds",
                lifetime.as_secs()
            )),
        }

        state.active_connections.fetch_sub(1, Ordering::SeqCst);
    });
}

async fn serve_request(
    req: hyper::Request<Incoming>,
    peer_addr: SocketAddr,
    state: Arc<ServerState>,
) -> Result<Response, Infallible> {
    let (parts, body) = req.into_parts();
    let mut entry = state
        .settings
        .access_log
        .as_ref()
        .map(|_| AccessLogEntry::new(peer_addr, &parts));

    let mut response = match read_body(&parts, body, &state).await {
        Ok(bytes) => state.router.handle(&Request::from_parts(parts, bytes)).await,
        Err(e) => e.into_response(),
    };

    if let Some(server) = &state.settings.server_name {
        response.headers_mut().insert(SERVER, server.clone());
    }

    if let (Some(entry), Some(format)) = (entry.as_mut(), &state.settings.access_log) {
        let size = response.body().size_hint().exact().unwrap_or(0);
        entry.finish(response.status().as_u16(), size);
        logger::log_access(entry, format);
    }

    Ok(response)
}

/// Collect the request body, enforcing the size limit and read timeout
async fn read_body(parts: &Parts, body: Incoming, state: &ServerState) -> Result<Bytes, Error> {
    let max = state.settings.max_body_size;

    let declared = parts
        .headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    if declared.is_some_and(|len| len > max) {
        logger::log_warning(&format!(
            "Request body too large: {} > {max}",
            declared.unwrap_or_default()
        ));
        return Err(Error::PayloadTooLarge);
    }

    let limited = Limited::new(body, usize::try_from(max).unwrap_or(usize::MAX));
    match tokio::time::timeout(state.settings.read_timeout, limited.collect()).await {
        Ok(Ok(collected)) => Ok(collected.to_bytes()),
        Ok(Err(e)) if e.is::<LengthLimitError>() => Err(Error::PayloadTooLarge),
        Ok(Err(e)) => Err(Error::BadRequest(format!("failed to read request body: {e}"))),
        Err(_) => Err(Error::BadRequest("timed out reading request body".to_string())),
    }
}
