//! Wire types and codec for forwarded invocations.
//!
//! One connection carries exactly one request: a single JSON line followed by the
//! client closing the stream. Keeping the codec here lets it be tested without sockets.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

/// Upper bound on a single encoded request, newline included.
pub const MAX_REQUEST_BYTES: u64 = 1024 * 1024;

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("failed to read request: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed request: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("request truncated after {bytes} bytes")]
    Truncated { bytes: usize },

    #[error("request of {bytes} bytes exceeds the {limit} byte limit")]
    TooLarge { bytes: u64, limit: u64 },
}

/// The invocation arguments a client forwards to the warm server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub args: Vec<String>,
}

impl Request {
    pub fn new(args: Vec<String>) -> Self {
        Self { args }
    }
}

/// Serializes a request into its newline-terminated wire form.
///
/// Fails with `TooLarge` when the encoded line would not fit `MAX_REQUEST_BYTES`.
pub fn encode(request: &Request) -> Result<Vec<u8>, ProtocolError> {
    let mut bytes = serde_json::to_vec(request)?;
    bytes.push(b'\n');

    let len = bytes.len() as u64;
    if len > MAX_REQUEST_BYTES {
        return Err(ProtocolError::TooLarge {
            bytes: len,
            limit: MAX_REQUEST_BYTES,
        });
    }
    Ok(bytes)
}

/// Reads one request from the stream.
///
/// Returns `Ok(None)` when the peer closed the stream without sending anything.
pub async fn read_request<R>(reader: R) -> Result<Option<Request>, ProtocolError>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    let bytes = reader.take(MAX_REQUEST_BYTES).read_line(&mut line).await?;

    if bytes == 0 {
        return Ok(None);
    }
    if !line.ends_with('\n') {
        if bytes as u64 >= MAX_REQUEST_BYTES {
            return Err(ProtocolError::TooLarge {
                bytes: bytes as u64,
                limit: MAX_REQUEST_BYTES,
            });
        }
        return Err(ProtocolError::Truncated { bytes });
    }

    Ok(Some(serde_json::from_str(&line)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_encode_is_single_json_line() {
        let bytes = encode(&Request::new(args(&["--select", "entry1"]))).unwrap();
        let text = String::from_utf8(bytes).unwrap();

        assert_eq!(text, "{\"args\":[\"--select\",\"entry1\"]}\n");
    }

    #[tokio::test]
    async fn test_read_request_preserves_argument_order() {
        let request = Request::new(args(&["c", "a", "b", "", "a b"]));
        let bytes = encode(&request).unwrap();

        let decoded = read_request(bytes.as_slice()).await.unwrap();

        assert_eq!(decoded, Some(request));
    }

    #[tokio::test]
    async fn test_read_request_empty_args() {
        let decoded = read_request(&b"{\"args\":[]}\n"[..]).await.unwrap();
        assert_eq!(decoded, Some(Request::default()));
    }

    #[tokio::test]
    async fn test_read_request_clean_eof_is_none() {
        let decoded = read_request(&b""[..]).await.unwrap();
        assert_eq!(decoded, None);
    }

    #[tokio::test]
    async fn test_read_request_truncated_payload() {
        let err = read_request(&b"{\"args\":[\"--sel"[..]).await.unwrap_err();
        assert!(matches!(err, ProtocolError::Truncated { bytes: 15 }));
    }

    /// A request whose encoded line is exactly `len` bytes, newline included.
    fn request_of_len(len: usize) -> Request {
        // {"args":["<fill>"]}\n is 14 bytes of framing.
        Request::new(vec!["x".repeat(len - 14)])
    }

    #[tokio::test]
    async fn test_request_at_size_limit_round_trips() {
        let request = request_of_len(MAX_REQUEST_BYTES as usize);
        let bytes = encode(&request).unwrap();
        assert_eq!(bytes.len() as u64, MAX_REQUEST_BYTES);

        let decoded = read_request(bytes.as_slice()).await.unwrap();
        assert_eq!(decoded, Some(request));
    }

    #[test]
    fn test_encode_rejects_request_over_limit() {
        let request = request_of_len(MAX_REQUEST_BYTES as usize + 1);

        let err = encode(&request).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::TooLarge { bytes, limit: MAX_REQUEST_BYTES } if bytes == MAX_REQUEST_BYTES + 1
        ));
    }

    #[tokio::test]
    async fn test_read_request_over_limit_is_too_large() {
        let mut bytes = serde_json::to_vec(&request_of_len(MAX_REQUEST_BYTES as usize + 1)).unwrap();
        bytes.push(b'\n');

        let err = read_request(bytes.as_slice()).await.unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::TooLarge { bytes, .. } if bytes == MAX_REQUEST_BYTES
        ));
    }

    #[tokio::test]
    async fn test_read_request_invalid_utf8_is_io_error() {
        let err = read_request(&b"\xff\xfe\n"[..]).await.unwrap_err();
        assert!(matches!(err, ProtocolError::Io(_)));
    }

    #[tokio::test]
    async fn test_read_request_malformed_payload() {
        let err = read_request(&b"not json\n"[..]).await.unwrap_err();
        assert!(matches!(err, ProtocolError::Malformed(_)));

        let err = read_request(&b"{\"args\":\"flat\"}\n"[..]).await.unwrap_err();
        assert!(matches!(err, ProtocolError::Malformed(_)));
    }
}
