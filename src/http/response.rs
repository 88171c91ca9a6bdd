//! Response assembly
//!
//! Every response has the same shape:
//!
//! ```text
//! HTTP/1.1 <status> <reason>\r\n
//! Content-Type: text/plain\r\n
//! Content-Length: <n>\r\n
//! Connection: close\r\n
//! \r\n
//! <body>
//! ```

use super::CRLF;
use bytes::Bytes;
use std::fmt;

/// Response status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusCode(u16);

impl StatusCode {
    pub const OK: StatusCode = StatusCode(200);
    pub const BAD_REQUEST: StatusCode = StatusCode(400);
    pub const NOT_FOUND: StatusCode = StatusCode(404);
    pub const INTERNAL_SERVER_ERROR: StatusCode = StatusCode(500);

    pub fn new(code: u16) -> Self {
        StatusCode(code)
    }

    pub fn code(&self) -> u16 {
        self.0
    }

    /// Reason phrase; anything outside the known set is "Unknown"
    pub fn reason_phrase(&self) -> &'static str {
        match self.0 {
            200 => "OK",
            400 => "Bad Request",
            404 => "Not Found",
            500 => "Internal Server Error",
            _ => "Unknown",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.0, self.reason_phrase())
    }
}

/// A response ready to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: StatusCode,
    body: Bytes,
}

impl Response {
    pub fn new(status: StatusCode) -> Self {
        Response {
            status,
            body: Bytes::new(),
        }
    }

    /// 200 response echoing `body`
    pub fn echo(body: Bytes) -> Self {
        Response::new(StatusCode::OK).with_body(body)
    }

    /// Fixed 500 response with an empty body
    pub fn internal_error() -> Self {
        Response::new(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Status line and headers, including the blank line
    pub fn head(&self) -> Vec<u8> {
        format!(
            "HTTP/1.1 {status}{crlf}\
             Content-Type: text/plain{crlf}\
             Content-Length: {len}{crlf}\
             Connection: close{crlf}{crlf}",
            status = self.status,
            len = self.body.len(),
            crlf = CRLF,
        )
        .into_bytes()
    }

    /// Head followed by body
    pub fn to_wire(&self) -> Vec<u8> {
        let mut wire = self.head();
        wire.extend_from_slice(&self.body);
        wire
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_phrases() {
        assert_eq!(StatusCode::OK.reason_phrase(), "OK");
        assert_eq!(StatusCode::BAD_REQUEST.reason_phrase(), "Bad Request");
        assert_eq!(StatusCode::NOT_FOUND.reason_phrase(), "Not Found");
        assert_eq!(StatusCode::INTERNAL_SERVER_ERROR.reason_phrase(), "Internal Server Error");
        assert_eq!(StatusCode::new(418).reason_phrase(), "Unknown");
        assert_eq!(StatusCode::new(418).to_string(), "418 Unknown");
    }

    #[test]
    fn test_echo_wire_format() {
        let response = Response::echo(Bytes::from_static(b"hello world"));
        assert_eq!(
            response.to_wire(),
            b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 11\r\nConnection: close\r\n\r\nhello world"
        );
    }

    #[test]
    fn test_internal_error_has_empty_body() {
        let wire = Response::internal_error().to_wire();
        let text = String::from_utf8(wire).unwrap();
        assert!(text.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
        assert!(text.contains("Content-Length: 0\r\n"));
        assert!(text.ends_with("\r\n\r\n"));
    }
}
