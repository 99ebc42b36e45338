//! Command-line configuration.
//!
//! ```bash
//! shuttle --directory /tmp/files
//! shuttle -d /tmp/files --port 8080 --timeout-secs 5
//! SHUTTLE_DIRECTORY=/srv/files shuttle
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::router::RouterConfig;
use crate::server::{DEFAULT_MAX_REQUEST_BYTES, ServerOptions};

/// Server configuration, parsed from flags and environment variables.
#[derive(Debug, Clone, Parser)]
#[command(name = "shuttle", version, about = "Single-exchange HTTP/1.1 file and echo server")]
pub struct Config {
    /// Directory that `/files/<name>` reads from and writes to
    #[arg(short, long, default_value = ".", env = "SHUTTLE_DIRECTORY")]
    pub directory: PathBuf,

    /// Host/IP to listen on
    #[arg(long, default_value = "0.0.0.0", env = "SHUTTLE_HOST")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = 4221, env = "SHUTTLE_PORT")]
    pub port: u16,

    /// Largest request (head plus body) accepted, in bytes
    #[arg(long = "max-request-bytes", default_value_t = DEFAULT_MAX_REQUEST_BYTES)]
    pub max_request_bytes: usize,

    /// Deadline for reading a request and for writing its response, in seconds
    #[arg(long = "timeout-secs", default_value_t = 30)]
    pub timeout_secs: u64,
}

impl Config {
    /// Returns the `host:port` address to bind.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn router_config(&self) -> RouterConfig {
        RouterConfig {
            base_dir: self.directory.clone(),
        }
    }

    pub fn server_options(&self) -> ServerOptions {
        ServerOptions {
            max_request_bytes: self.max_request_bytes,
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::try_parse_from(["shuttle"]).unwrap();
        assert_eq!(config.address(), "0.0.0.0:4221");
        assert_eq!(config.router_config().base_dir, PathBuf::from("."));
        assert_eq!(config.server_options().timeout, Duration::from_secs(30));
        assert_eq!(config.max_request_bytes, DEFAULT_MAX_REQUEST_BYTES);
    }

    #[test]
    fn short_and_long_directory_flags() {
        let short = Config::try_parse_from(["shuttle", "-d", "/tmp/a"]).unwrap();
        assert_eq!(short.directory, PathBuf::from("/tmp/a"));
        let long = Config::try_parse_from(["shuttle", "--directory", "/tmp/b"]).unwrap();
        assert_eq!(long.directory, PathBuf::from("/tmp/b"));
    }

    #[test]
    fn rejects_bad_port() {
        assert!(Config::try_parse_from(["shuttle", "--port", "70000"]).is_err());
    }
}
