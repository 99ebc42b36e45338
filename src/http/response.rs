//! HTTP/1.1 response builder.
//!
//! Provides an owned builder for constructing responses and serializing them
//! to the exact wire bytes written back to the client.

use bytes::{BufMut, Bytes, BytesMut};

use super::{Headers, StatusCode};

/// An HTTP/1.1 response, ready to be serialized and sent.
///
/// Every builder method consumes and returns `self`, so a response is never
/// shared between handlers while it is being assembled.
///
/// # Examples
///
/// ```
/// use shuttle::http::{Response, StatusCode};
///
/// let response = Response::new(StatusCode::Ok)
///     .header("Content-type", "text/plain")
///     .body("abc");
///
/// let bytes = response.into_bytes();
/// assert_eq!(
///     &bytes[..],
///     b"HTTP/1.1 200 OK \r\nContent-type: text/plain\r\nContent-Length: 3\r\n\r\nabc\r\n"
/// );
/// ```
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: Headers,
    body: Option<Bytes>,
}

impl Response {
    /// Creates a new response with the given status, no headers and no body.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: None,
        }
    }

    /// Sets a response header, overwriting any previous value for `name`.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Sets the response body and its `Content-Length` header.
    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        let body = body.into();
        self.headers.insert("Content-Length", body.len().to_string());
        self.body = Some(body);
        self
    }

    /// Returns the status code of this response.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the response headers.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Returns the body, or `None` if none was set.
    pub fn body_bytes(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Serializes the response into its HTTP/1.1 wire form.
    ///
    /// The status line carries a space after the reason phrase and the body
    /// is always followed by `\r\n`, even when empty.
    pub fn into_bytes(self) -> BytesMut {
        let body_len = self.body.as_ref().map_or(0, Bytes::len);
        let estimated_size = 64 + self.headers.len() * 48 + body_len;
        let mut buf = BytesMut::with_capacity(estimated_size);

        // Status line
        buf.put(
            format!(
                "HTTP/1.1 {} {} \r\n",
                self.status.as_u16(),
                self.status.reason()
            )
            .as_bytes(),
        );

        // Headers
        buf.put(self.headers.to_string().as_bytes());

        // Header/body separator
        buf.put(&b"\r\n"[..]);

        if let Some(body) = self.body {
            buf.put(body);
        }
        buf.put(&b"\r\n"[..]);

        buf
    }
}
