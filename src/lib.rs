//! # shuttle
//!
//! A small HTTP/1.1 server that answers exactly one request per connection.
//!
//! Each accepted connection goes through the same pipeline:
//! [`server::read_request`] → [`Request::parse`] → [`Router::route`] →
//! [`Response::into_bytes`] → write → close.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use shuttle::files::DiskFiles;
//! use shuttle::router::{Router, RouterConfig};
//! use shuttle::server::{Server, ServerOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RouterConfig { base_dir: "/tmp/files".into() };
//!     let server = Server::bind("0.0.0.0:4221", ServerOptions::default()).await?;
//!     server.run(Router::new(config, DiskFiles)).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod files;
pub mod http;
pub mod router;
pub mod server;

// ── Convenience re-exports ────────────────────────────────────────────────────
pub use config::Config;
pub use http::{Headers, Method, Request, Response, StatusCode};
pub use router::{Router, RouterConfig};
pub use server::{Server, ServerError};
