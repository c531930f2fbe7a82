//! Minimal HTTP/1.1 request-head parsing.
//!
//! Just enough HTTP to route an inbound connection: the request line and a
//! header map with case-insensitive lookup. Bodies are never parsed; the
//! served surfaces are the upgrade handshake and GET paths for static
//! assets and metrics.

use thiserror::Error;

/// Errors from [`RequestHead::parse`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HttpParseError {
    /// The head was empty or not valid UTF-8.
    #[error("request head is not parseable text")]
    NotText,
    /// The first line did not look like `METHOD target HTTP/x.y`.
    #[error("malformed request line")]
    BadRequestLine,
    /// A header line had no `:` separator.
    #[error("malformed header line: {0:?}")]
    BadHeaderLine(String),
}

/// Parsed request line plus headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHead {
    /// Request method, e.g. `GET`.
    pub method: String,
    /// Request target as sent, query string included.
    pub target: String,
    headers: Vec<(String, String)>,
}

/// Find the end of the request head in `buf`.
///
/// Returns the index just past the `\r\n\r\n` terminator, or `None` while
/// the head is still incomplete. Bytes after the terminator belong to the
/// next protocol layer and must be preserved by the caller.
pub fn find_head_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n").map(|i| i + 4)
}

impl RequestHead {
    /// Parse a request head (bytes up to, and optionally including, the
    /// blank line).
    pub fn parse(head: &[u8]) -> Result<Self, HttpParseError> {
        let text = std::str::from_utf8(head).map_err(|_| HttpParseError::NotText)?;
        let mut lines = text.split("\r\n");

        let request_line = lines.next().ok_or(HttpParseError::BadRequestLine)?;
        let mut parts = request_line.split_whitespace();
        let method = parts.next().ok_or(HttpParseError::BadRequestLine)?;
        let target = parts.next().ok_or(HttpParseError::BadRequestLine)?;
        if parts.next().is_none() {
            return Err(HttpParseError::BadRequestLine);
        }

        let mut headers = Vec::new();
        for line in lines {
            if line.is_empty() {
                break;
            }
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| HttpParseError::BadHeaderLine(line.to_owned()))?;
            headers.push((name.trim().to_owned(), value.trim().to_owned()));
        }

        Ok(Self {
            method: method.to_owned(),
            target: target.to_owned(),
            headers,
        })
    }

    /// Case-insensitive header lookup; first match wins.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The request target with any query string stripped.
    pub fn path(&self) -> &str {
        self.target
            .split_once('?')
            .map_or(self.target.as_str(), |(path, _)| path)
    }
}
