//! Async TCP server using Tokio.
//!
//! Accepts TCP connections and answers exactly one HTTP/1.1 request on each
//! before closing it. Every connection runs in its own task; a failure on one
//! connection is logged and never affects the accept loop or other peers.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::files::FileAccess;
use crate::http::{StatusCode, request::Request, request::RequestError};
use crate::router::{RouteError, Router};

pub mod reader;

pub use reader::{ReadError, read_request};

/// Errors produced by the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that end a single connection.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("read failed: {0}")]
    Read(#[from] ReadError),

    #[error("bad request: {0}")]
    BadRequest(#[from] RequestError),

    #[error(transparent)]
    Route(#[from] RouteError),

    #[error("write failed: {0}")]
    Write(#[source] std::io::Error),

    #[error("{stage} timed out after {after:?}")]
    TimedOut { stage: &'static str, after: Duration },
}

/// Maximum size of a complete HTTP request we will buffer before rejecting it (8 MiB).
pub const DEFAULT_MAX_REQUEST_BYTES: usize = 8 * 1024 * 1024;

/// Default deadline for reading a request and, separately, for writing the response.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// How long unread request bytes are discarded after the response is sent.
const DRAIN_TIMEOUT: Duration = Duration::from_millis(250);

/// Upper bound on the bytes discarded after the response is sent.
const DRAIN_LIMIT: usize = 64 * 1024;

/// Per-connection limits.
#[derive(Debug, Clone, Copy)]
pub struct ServerOptions {
    pub max_request_bytes: usize,
    pub timeout: Duration,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            max_request_bytes: DEFAULT_MAX_REQUEST_BYTES,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// The HTTP server.
///
/// Binds to a TCP address and hands each accepted connection to a
/// [`Router`].
///
/// # Examples
///
/// ```rust,no_run
/// use shuttle::files::DiskFiles;
/// use shuttle::router::{Router, RouterConfig};
/// use shuttle::server::{Server, ServerOptions};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let server = Server::bind("127.0.0.1:4221", ServerOptions::default()).await?;
///     server.run(Router::new(RouterConfig::default(), DiskFiles)).await?;
///     Ok(())
/// }
/// ```
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
    options: ServerOptions,
}

impl Server {
    /// Binds the server to the given TCP address.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the address cannot be bound
    /// (e.g. port already in use, insufficient permissions).
    pub async fn bind(addr: impl AsRef<str>, options: ServerOptions) -> Result<Self, ServerError> {
        let addr = addr.as_ref();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Bind {
                addr: addr.to_owned(),
                source: e,
            })?;
        let local_addr = listener.local_addr()?;
        Ok(Self {
            listener,
            local_addr,
            options,
        })
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Starts accepting connections and serving them with `router`.
    ///
    /// Runs until the process is terminated. Accept errors are logged and
    /// the loop keeps going.
    ///
    /// # Errors
    ///
    /// Currently never returns an error; the `Result` leaves room for
    /// listener-level failures.
    pub async fn run<F: FileAccess>(self, router: Router<F>) -> Result<(), ServerError> {
        let router = Arc::new(router);
        let options = self.options;
        info!(address = %self.local_addr, "shuttle listening");

        loop {
            let (mut stream, peer_addr) = match self.listener.accept().await {
                Ok(pair) => pair,
                Err(e) => {
                    error!(error = %e, "failed to accept connection");
                    continue;
                }
            };

            debug!(peer = %peer_addr, "connection accepted");
            let router = Arc::clone(&router);

            tokio::spawn(async move {
                match handle_connection(&mut stream, &router, options).await {
                    Ok(status) => {
                        debug!(peer = %peer_addr, %status, "response sent");
                    }
                    Err(e) => {
                        warn!(peer = %peer_addr, error = %e, "connection closed with error");
                    }
                }
            });
        }
    }
}

/// Serves exactly one request on `stream`.
///
/// Reads the request under the read deadline, routes it, writes the
/// serialized response under the write deadline and shuts the write side
/// down. Any request bytes still unread are then discarded for a short
/// while. On error nothing is written; dropping the stream closes it.
pub async fn handle_connection<S, F>(
    stream: &mut S,
    router: &Router<F>,
    options: ServerOptions,
) -> Result<StatusCode, ConnectionError>
where
    S: AsyncRead + AsyncWrite + Unpin,
    F: FileAccess,
{
    let raw = timeout(options.timeout, read_request(stream, options.max_request_bytes))
        .await
        .map_err(|_| ConnectionError::TimedOut {
            stage: "read",
            after: options.timeout,
        })??;

    let request = Request::parse(&raw)?;
    let response = router.route(&request).await?;
    let status = response.status();
    let bytes = response.into_bytes();

    timeout(options.timeout, async {
        stream.write_all(&bytes).await?;
        stream.flush().await?;
        stream.shutdown().await
    })
    .await
    .map_err(|_| ConnectionError::TimedOut {
        stage: "write",
        after: options.timeout,
    })?
    .map_err(ConnectionError::Write)?;

    drain(stream).await;
    Ok(status)
}

// Closing a socket with unread input resets the connection, which can
// discard the response before the peer reads it.
async fn drain<S: AsyncRead + Unpin>(stream: &mut S) {
    let mut sink = [0u8; 4096];
    let mut drained = 0;
    let _ = timeout(DRAIN_TIMEOUT, async {
        while drained < DRAIN_LIMIT {
            match stream.read(&mut sink).await {
                Ok(0) | Err(_) => break,
                Ok(n) => drained += n,
            }
        }
    })
    .await;
}
