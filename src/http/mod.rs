//! HTTP/1.1 request framing over a raw socket
//!
//! This module reads one request per connection and writes one response.
//!
//! # Architecture
//!
//! - [`BufferedSocketReader`] owns a fixed-size buffer over any `Read` and
//!   offers three read strategies: delimiter scan, fixed length, chunked
//! - [`HttpMessageParser`] drives the reader to produce an [`HttpMessage`]
//!   (start line, lowercase headers, body)
//! - [`Response`] renders the fixed response layout used by the server
//!
//! # Examples
//!
//! ```
//! use echopool::http::HttpMessageParser;
//!
//! let raw = b"POST /echo HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello";
//! let msg = HttpMessageParser::new().parse(&raw[..]).unwrap();
//! assert_eq!(msg.start_line(), "POST /echo HTTP/1.1");
//! assert_eq!(msg.headers().get("content-length"), Some("5"));
//! assert_eq!(&msg.body()[..], b"hello");
//! ```

pub mod chunked;
pub mod headers;
pub mod message;
pub mod reader;
pub mod response;

pub use headers::Headers;
pub use message::{HttpMessage, HttpMessageParser};
pub use reader::BufferedSocketReader;
pub use response::{Response, StatusCode};

/// Result type for per-connection operations
pub type Result<T> = std::result::Result<T, Error>;

/// Per-connection errors
///
/// None of these are fatal to the server: the connection is abandoned and
/// the worker goes back to the queue.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Short read: expected {expected} bytes, got {received}")]
    ShortRead { expected: usize, received: usize },

    #[error("Invalid chunk size: {0}")]
    InvalidChunkSize(String),

    #[error("Expected CRLF after chunk data")]
    MissingChunkTerminator,

    #[error("Incomplete message")]
    Incomplete,

    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    #[error("Invalid Content-Length: {0}")]
    InvalidContentLength(String),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Peer reset the connection")]
    PeerReset,
}

impl Error {
    /// True when the peer is gone and writing an error response is pointless
    pub fn is_peer_gone(&self) -> bool {
        match self {
            Error::ConnectionClosed | Error::PeerReset => true,
            Error::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
            ),
            _ => false,
        }
    }
}

/// Default size of the reader buffer (16 KiB)
pub const DEFAULT_BUFFER_SIZE: usize = 16 * 1024;

/// CRLF line ending
pub const CRLF: &str = "\r\n";

/// Blank line terminating the header block
pub const HEADER_TERMINATOR: &str = "\r\n\r\n";
