//! HTTP/1.1 request parsing.
//!
//! The parser is deliberately lenient: it only requires a method and a path
//! on the request line. Header lines are split once on `": "`, and the first
//! line that does not split ends the header section. The body is whatever
//! follows the first blank line, cut to the declared `Content-Length`.

use std::str;

use bytes::Bytes;
use memchr::memmem;
use thiserror::Error;

use super::{Headers, Method};

/// Line terminator between the request line and each header line.
const CRLF: &str = "\r\n";

/// Blank-line separator between the header section and the body.
pub(crate) const HEADER_END: &[u8] = b"\r\n\r\n";

/// Errors that can occur while parsing an HTTP/1.1 request.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("malformed request: {reason}")]
    Malformed { reason: &'static str },

    #[error("request head is not valid UTF-8: {0}")]
    Encoding(#[from] str::Utf8Error),
}

/// A parsed HTTP/1.1 request.
///
/// Created by [`Request::parse`] from the raw bytes read off a connection and
/// never modified afterwards.
///
/// # Examples
///
/// ```
/// use shuttle::http::{Method, Request};
///
/// let raw = b"POST /files/a.txt HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello";
/// let request = Request::parse(raw).unwrap();
///
/// assert_eq!(request.method(), &Method::Post);
/// assert_eq!(request.path(), "/files/a.txt");
/// assert_eq!(request.header("Content-Length"), Some("5"));
/// assert_eq!(&request.body()[..], b"hello");
/// ```
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    path: String,
    headers: Headers,
    body: Bytes,
}

impl Request {
    /// Parse a request from a raw byte buffer.
    ///
    /// With a declared `Content-Length`, the body is exactly that many bytes
    /// (or fewer, if the buffer ends first) and is kept verbatim. Without one,
    /// trailing NUL padding is ignored, so a zero-filled fixed-size read
    /// buffer parses the same as an exact one.
    ///
    /// # Errors
    ///
    /// - [`RequestError::Malformed`] — the request line lacks a method or a
    ///   path, or the path does not start with `/`.
    /// - [`RequestError::Encoding`] — the request line or header section is
    ///   not valid UTF-8.
    pub fn parse(raw: &[u8]) -> Result<Self, RequestError> {
        let (head, body) = match find_header_end(raw) {
            Some(pos) => (&raw[..pos], &raw[pos + HEADER_END.len()..]),
            None => (trim_trailing_nul(raw), &[][..]),
        };
        let head = str::from_utf8(head)?;

        let mut lines = head.split(CRLF);
        let request_line = lines.next().unwrap_or_default();
        let mut tokens = request_line.split(' ');

        let method = match tokens.next() {
            Some(m) if !m.is_empty() => Method::from(m),
            _ => return Err(RequestError::Malformed { reason: "missing method" }),
        };
        let path = match tokens.next() {
            Some(p) if p.starts_with('/') => p.to_owned(),
            Some(p) if !p.is_empty() => {
                return Err(RequestError::Malformed {
                    reason: "path must start with '/'",
                });
            }
            _ => return Err(RequestError::Malformed { reason: "missing path" }),
        };

        let mut headers = Headers::new();
        for line in lines {
            let Some((name, value)) = line.split_once(": ") else {
                break;
            };
            if name.is_empty() {
                break;
            }
            headers.insert(name, value);
        }

        let mut request = Self {
            method,
            path,
            headers,
            body: Bytes::new(),
        };
        let body = match request.content_length() {
            Some(len) => &body[..len.min(body.len())],
            None => trim_trailing_nul(body),
        };
        request.body = Bytes::copy_from_slice(body);
        Ok(request)
    }

    /// Returns the HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the raw request path, exactly as sent.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the request headers.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Returns the value of the named header (exact name match).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Returns the request body bytes.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns the declared `Content-Length`, if present and numeric.
    ///
    /// The name is matched case-insensitively since this is a framing concern.
    pub fn content_length(&self) -> Option<usize> {
        self.headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse().ok())
    }
}

/// Returns the offset of the first `\r\n\r\n` in `buf`, if any.
pub(crate) fn find_header_end(buf: &[u8]) -> Option<usize> {
    memmem::find(buf, HEADER_END)
}

fn trim_trailing_nul(bytes: &[u8]) -> &[u8] {
    let end = bytes.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    &bytes[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_get() {
        let raw = b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n";
        let req = Request::parse(raw).unwrap();
        assert_eq!(req.method(), &Method::Get);
        assert_eq!(req.path(), "/");
        assert_eq!(req.header("Host"), Some("localhost"));
        assert!(req.body().is_empty());
    }

    #[test]
    fn reproduces_all_four_fields() {
        let raw = b"PUT /a/b HTTP/1.1\r\nX-One: 1\r\nUser-Agent: foo/bar\r\n\r\n\x00\x01binary";
        let req = Request::parse(raw).unwrap();
        assert_eq!(req.method(), &Method::Custom("PUT".to_owned()));
        assert_eq!(req.path(), "/a/b");
        assert_eq!(req.headers().len(), 2);
        assert_eq!(req.header("X-One"), Some("1"));
        assert_eq!(req.header("User-Agent"), Some("foo/bar"));
        assert_eq!(&req.body()[..], b"\x00\x01binary");
    }

    #[test]
    fn version_token_is_optional() {
        let req = Request::parse(b"GET /echo/hi\r\n\r\n").unwrap();
        assert_eq!(req.path(), "/echo/hi");
    }

    #[test]
    fn strips_nul_padding_from_body() {
        let mut raw = b"POST /files/x HTTP/1.1\r\n\r\nhello".to_vec();
        raw.resize(1024, 0);
        let req = Request::parse(&raw).unwrap();
        assert_eq!(&req.body()[..], b"hello");
    }

    #[test]
    fn declared_length_keeps_trailing_nul() {
        let raw = b"POST /files/b.bin HTTP/1.1\r\nContent-Length: 4\r\n\r\nab\x00\x00";
        let req = Request::parse(raw).unwrap();
        assert_eq!(&req.body()[..], b"ab\x00\x00");
    }

    #[test]
    fn declared_length_bounds_body() {
        let raw = b"POST / HTTP/1.1\r\nContent-Length: 2\r\n\r\nhiEXTRA";
        assert_eq!(&Request::parse(raw).unwrap().body()[..], b"hi");

        let short = b"POST / HTTP/1.1\r\nContent-Length: 10\r\n\r\nhi\x00";
        assert_eq!(&Request::parse(short).unwrap().body()[..], b"hi\x00");
    }

    #[test]
    fn missing_separator_means_empty_body() {
        let req = Request::parse(b"GET /user-agent HTTP/1.1\r\nUser-Agent: x").unwrap();
        assert_eq!(req.header("User-Agent"), Some("x"));
        assert!(req.body().is_empty());
    }

    #[test]
    fn line_without_separator_ends_headers() {
        let raw = b"GET / HTTP/1.1\r\nA: 1\r\ngarbage\r\nB: 2\r\n\r\n";
        let req = Request::parse(raw).unwrap();
        assert_eq!(req.header("A"), Some("1"));
        assert_eq!(req.header("B"), None);
    }

    #[test]
    fn header_value_split_once() {
        let req = Request::parse(b"GET / HTTP/1.1\r\nX-Pair: a: b\r\n\r\n").unwrap();
        assert_eq!(req.header("X-Pair"), Some("a: b"));
    }

    #[test]
    fn duplicate_header_last_wins() {
        let raw = b"GET / HTTP/1.1\r\nUser-Agent: one\r\nUser-Agent: two\r\n\r\n";
        let req = Request::parse(raw).unwrap();
        assert_eq!(req.header("User-Agent"), Some("two"));
    }

    #[test]
    fn missing_path_is_malformed() {
        for raw in [&b""[..], b"\r\n\r\n", b"GET\r\n\r\n", b"GET  /\r\n\r\n"] {
            assert!(
                matches!(Request::parse(raw), Err(RequestError::Malformed { .. })),
                "{raw:?}"
            );
        }
    }

    #[test]
    fn relative_path_is_malformed() {
        let err = Request::parse(b"GET echo/x HTTP/1.1\r\n\r\n").unwrap_err();
        assert!(matches!(err, RequestError::Malformed { .. }));
    }

    #[test]
    fn invalid_utf8_head() {
        let err = Request::parse(b"GET /\xff HTTP/1.1\r\n\r\n").unwrap_err();
        assert!(matches!(err, RequestError::Encoding(_)));
    }

    #[test]
    fn content_length_any_case() {
        let req = Request::parse(b"POST / HTTP/1.1\r\ncontent-length: 12\r\n\r\n").unwrap();
        assert_eq!(req.content_length(), Some(12));
        let req = Request::parse(b"POST / HTTP/1.1\r\nContent-Length: abc\r\n\r\n").unwrap();
        assert_eq!(req.content_length(), None);
    }
}
