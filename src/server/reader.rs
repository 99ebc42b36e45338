//! Reads one complete request off a connection.

use bytes::BytesMut;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::http::request::{HEADER_END, Request, find_header_end};

/// Initial read buffer capacity per connection.
const INITIAL_BUF_SIZE: usize = 1024;

/// Errors produced while reading request bytes.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("connection closed before any request bytes arrived")]
    Closed,

    #[error("request exceeds maximum allowed size of {max_bytes} bytes")]
    TooLarge { max_bytes: usize },
}

/// Reads from `stream` until a full request has been buffered.
///
/// A request is complete once the blank line ending the header section has
/// arrived and, if the head declares a `Content-Length`, that many body bytes
/// follow it; bytes past the declared body are dropped. Without a declared
/// length, the request ends with the head and every byte buffered so far is
/// kept as the body. If the peer closes early, whatever was received is
/// returned and left for the parser to judge.
///
/// # Errors
///
/// - [`ReadError::Closed`] — the peer closed without sending anything.
/// - [`ReadError::TooLarge`] — the buffered or declared size exceeds `max_bytes`.
/// - [`ReadError::Io`] — the underlying read failed.
pub async fn read_request<S>(stream: &mut S, max_bytes: usize) -> Result<BytesMut, ReadError>
where
    S: AsyncRead + Unpin,
{
    let mut buf = BytesMut::with_capacity(INITIAL_BUF_SIZE.min(max_bytes));
    let mut expected_len: Option<usize> = None;

    loop {
        if let Some(total) = expected_len {
            if buf.len() >= total {
                buf.truncate(total);
                return Ok(buf);
            }
        }

        let bytes_read = stream.read_buf(&mut buf).await?;
        if bytes_read == 0 {
            if buf.is_empty() {
                return Err(ReadError::Closed);
            }
            return Ok(buf);
        }

        if expected_len.is_some() {
            continue;
        }
        let Some(head_len) = find_header_end(&buf) else {
            if buf.len() > max_bytes {
                return Err(ReadError::TooLarge { max_bytes });
            }
            continue;
        };

        let declared = Request::parse(&buf[..head_len])
            .ok()
            .and_then(|head| head.content_length());
        match declared {
            Some(body_len) => {
                let total = head_len
                    .saturating_add(HEADER_END.len())
                    .saturating_add(body_len);
                if total > max_bytes {
                    return Err(ReadError::TooLarge { max_bytes });
                }
                expected_len = Some(total);
            }
            None if buf.len() > max_bytes => return Err(ReadError::TooLarge { max_bytes }),
            None => return Ok(buf),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    const MAX: usize = 8 * 1024;

    #[tokio::test]
    async fn reads_headers_only_request() {
        let mut raw: &[u8] = b"GET / HTTP/1.1\r\nHost: x\r\n\r\n";
        let buf = read_request(&mut raw, MAX).await.unwrap();
        assert_eq!(&buf[..], b"GET / HTTP/1.1\r\nHost: x\r\n\r\n");
    }

    #[tokio::test]
    async fn waits_for_declared_body() {
        let (mut client, mut server) = tokio::io::duplex(64);
        let writer = tokio::spawn(async move {
            client
                .write_all(b"POST /files/a HTTP/1.1\r\nContent-Length: 10\r\n\r\nhello")
                .await
                .unwrap();
            tokio::task::yield_now().await;
            client.write_all(b"world").await.unwrap();
            client
        });

        let buf = read_request(&mut server, MAX).await.unwrap();
        assert!(buf.ends_with(b"\r\n\r\nhelloworld"));
        drop(writer.await.unwrap());
    }

    #[tokio::test]
    async fn reassembles_split_head() {
        let (mut client, mut server) = tokio::io::duplex(64);
        let writer = tokio::spawn(async move {
            for part in [&b"GET /echo/abc HT"[..], b"TP/1.1\r\nHost: x\r", b"\n\r\n"] {
                client.write_all(part).await.unwrap();
                tokio::task::yield_now().await;
            }
            client
        });

        let buf = read_request(&mut server, MAX).await.unwrap();
        assert_eq!(&buf[..], b"GET /echo/abc HTTP/1.1\r\nHost: x\r\n\r\n");
        drop(writer.await.unwrap());
    }

    #[tokio::test]
    async fn drops_bytes_past_declared_body() {
        let mut raw: &[u8] = b"POST / HTTP/1.1\r\nContent-Length: 2\r\n\r\nhiEXTRA";
        let buf = read_request(&mut raw, MAX).await.unwrap();
        assert!(buf.ends_with(b"\r\n\r\nhi"));
    }

    #[tokio::test]
    async fn keeps_body_without_content_length() {
        let mut raw: &[u8] = b"POST /files/a.txt HTTP/1.1\r\nHost: x\r\n\r\nhello";
        let buf = read_request(&mut raw, MAX).await.unwrap();
        assert_eq!(&buf[..], b"POST /files/a.txt HTTP/1.1\r\nHost: x\r\n\r\nhello");
    }

    #[tokio::test]
    async fn keeps_trailing_nul_in_declared_body() {
        let mut raw: &[u8] = b"POST /files/b.bin HTTP/1.1\r\nContent-Length: 4\r\n\r\nab\x00\x00";
        let buf = read_request(&mut raw, MAX).await.unwrap();
        assert!(buf.ends_with(b"\r\n\r\nab\x00\x00"));
        let request = Request::parse(&buf).unwrap();
        assert_eq!(&request.body()[..], b"ab\x00\x00");
    }

    #[tokio::test]
    async fn early_close_returns_partial() {
        let mut raw: &[u8] = b"GET /echo/x HTTP/1.1\r\n";
        let buf = read_request(&mut raw, MAX).await.unwrap();
        assert_eq!(&buf[..], b"GET /echo/x HTTP/1.1\r\n");
    }

    #[tokio::test]
    async fn empty_connection_is_closed() {
        let mut raw: &[u8] = b"";
        assert!(matches!(read_request(&mut raw, MAX).await, Err(ReadError::Closed)));
    }

    #[tokio::test]
    async fn oversized_declared_body_rejected() {
        let mut raw: &[u8] = b"POST / HTTP/1.1\r\nContent-Length: 999999\r\n\r\n";
        assert!(matches!(
            read_request(&mut raw, MAX).await,
            Err(ReadError::TooLarge { max_bytes: MAX })
        ));
    }

    #[tokio::test]
    async fn oversized_head_rejected() {
        let mut head = b"GET / HTTP/1.1\r\nX-Pad: ".to_vec();
        head.resize(MAX + 16, b'a');
        let mut raw: &[u8] = &head;
        assert!(matches!(
            read_request(&mut raw, MAX).await,
            Err(ReadError::TooLarge { .. })
        ));
    }
}
