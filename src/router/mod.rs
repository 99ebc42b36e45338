//! Request routing — map a parsed request to a response.
//!
//! The route table is fixed and evaluated in order; the first pattern that
//! matches the request path wins:
//!
//! | Pattern        | Match style | Endpoint                              |
//! |----------------|-------------|---------------------------------------|
//! | `/`            | exact       | empty `200`                           |
//! | `/echo`        | prefix      | echoes the text after `/echo/`        |
//! | `/user-agent`  | prefix      | echoes the `User-Agent` header        |
//! | `/files`       | prefix      | `GET` reads, `POST` writes a file     |
//!
//! Anything else, including `/files` with a method other than `GET` or
//! `POST`, is answered with `404 Not Found`.

use std::path::{Component, Path, PathBuf};

use bytes::Bytes;
use thiserror::Error;
use tracing::{debug, warn};

use crate::files::{FileAccess, FileError};
use crate::{Method, Request, Response, StatusCode};

const TEXT_PLAIN: &str = "text/plain";
const OCTET_STREAM: &str = "application/octet-stream";

/// Errors the router cannot turn into a response.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("failed to store uploaded file: {0}")]
    FileWrite(#[source] FileError),
}

/// Router settings.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Directory that `/files/<name>` paths are resolved against.
    pub base_dir: PathBuf,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
        }
    }
}

// Compiled representation of a route pattern string.
#[derive(Debug, Clone, Copy)]
enum Pattern {
    // Matches one exact path string, e.g. `/`.
    Exact(&'static str),
    // Matches any path that starts with the given prefix, e.g. `/files`.
    Prefix(&'static str),
}

impl Pattern {
    // Returns the path remainder after the matched pattern, `None` on a miss.
    fn matches<'p>(&self, path: &'p str) -> Option<&'p str> {
        match self {
            Pattern::Exact(p) => (path == *p).then_some(""),
            Pattern::Prefix(prefix) => path.strip_prefix(*prefix),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endpoint {
    Root,
    Echo,
    UserAgent,
    Files,
}

const ROUTES: [(Pattern, Endpoint); 4] = [
    (Pattern::Exact("/"), Endpoint::Root),
    (Pattern::Prefix("/echo"), Endpoint::Echo),
    (Pattern::Prefix("/user-agent"), Endpoint::UserAgent),
    (Pattern::Prefix("/files"), Endpoint::Files),
];

/// Dispatches requests to the fixed set of endpoints.
///
/// The router holds no mutable state; one instance is shared by every
/// connection. Filesystem access goes through `F`.
///
/// # Examples
///
/// ```rust,no_run
/// use shuttle::files::DiskFiles;
/// use shuttle::http::{Request, StatusCode};
/// use shuttle::router::{Router, RouterConfig};
///
/// # async fn demo() {
/// let router = Router::new(RouterConfig::default(), DiskFiles);
/// let request = Request::parse(b"GET /echo/hi HTTP/1.1\r\n\r\n").unwrap();
/// let response = router.route(&request).await.unwrap();
/// assert_eq!(response.status(), StatusCode::Ok);
/// # }
/// ```
#[derive(Debug)]
pub struct Router<F> {
    config: RouterConfig,
    files: F,
}

impl<F: FileAccess> Router<F> {
    pub fn new(config: RouterConfig, files: F) -> Self {
        Self { config, files }
    }

    /// Produces the response for `request`.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::FileWrite`] when a `POST /files/...` upload cannot
    /// be written. Read failures are answered with `404` instead.
    pub async fn route(&self, request: &Request) -> Result<Response, RouteError> {
        let path = request.path();
        let Some((endpoint, remainder)) = ROUTES
            .iter()
            .find_map(|(pattern, endpoint)| pattern.matches(path).map(|rest| (*endpoint, rest)))
        else {
            return Ok(not_found());
        };

        debug!(method = %request.method(), path, ?endpoint, "dispatching request");

        match endpoint {
            Endpoint::Root => Ok(text(StatusCode::Ok)),
            Endpoint::Echo => {
                let echoed = path.split_once("/echo/").map_or("", |(_, rest)| rest);
                Ok(text(StatusCode::Ok).body(echoed.to_owned()))
            }
            Endpoint::UserAgent => {
                let agent = request.header("User-Agent").unwrap_or_default();
                Ok(text(StatusCode::Ok).body(agent.to_owned()))
            }
            Endpoint::Files => match request.method() {
                Method::Get => Ok(self.read_file(remainder).await),
                Method::Post => self.write_file(remainder, request.body()).await,
                Method::Custom(_) => Ok(not_found()),
            },
        }
    }

    async fn read_file(&self, remainder: &str) -> Response {
        let Some(file_path) = resolve(&self.config.base_dir, remainder) else {
            warn!(remainder, "rejected file path outside base directory");
            return not_found();
        };

        match self.files.get(&file_path).await {
            Ok(contents) => Response::new(StatusCode::Ok)
                .header("Content-type", OCTET_STREAM)
                .body(contents),
            Err(e) => {
                debug!(error = %e, "file read failed");
                not_found()
            }
        }
    }

    async fn write_file(&self, remainder: &str, body: &Bytes) -> Result<Response, RouteError> {
        let Some(file_path) = resolve(&self.config.base_dir, remainder) else {
            warn!(remainder, "rejected file path outside base directory");
            return Ok(not_found());
        };

        self.files
            .put(&file_path, body)
            .await
            .map_err(RouteError::FileWrite)?;
        debug!(path = %file_path.display(), bytes = body.len(), "file stored");
        Ok(text(StatusCode::Created))
    }
}

fn text(status: StatusCode) -> Response {
    Response::new(status).header("Content-type", TEXT_PLAIN)
}

fn not_found() -> Response {
    text(StatusCode::NotFound)
}

/// Joins the path remainder onto `base`.
///
/// Returns `None` when the remainder is empty or contains anything but plain
/// file name components (`..`, `.`, a second root), so the result always
/// stays inside `base`.
fn resolve(base: &Path, remainder: &str) -> Option<PathBuf> {
    let relative = remainder.strip_prefix('/').unwrap_or(remainder);
    let relative = Path::new(relative);

    let mut components = relative.components().peekable();
    components.peek()?;
    if !components.all(|c| matches!(c, Component::Normal(_))) {
        return None;
    }
    Some(base.join(relative))
}
