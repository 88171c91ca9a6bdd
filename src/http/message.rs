//! HTTP request message and its parser
//!
//! The parser reads the header block with a delimiter scan, then picks a
//! body strategy from the headers: chunked, fixed length, or none.

use super::{BufferedSocketReader, Error, Headers, Result, CRLF, DEFAULT_BUFFER_SIZE, HEADER_TERMINATOR};
use bytes::Bytes;
use std::io::Read;

/// One parsed request
///
/// Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpMessage {
    start_line: String,
    headers: Headers,
    body: Bytes,
}

impl HttpMessage {
    pub fn new(start_line: impl Into<String>, headers: Headers, body: impl Into<Bytes>) -> Self {
        HttpMessage {
            start_line: start_line.into(),
            headers,
            body: body.into(),
        }
    }

    /// Request line, without its CRLF
    pub fn start_line(&self) -> &str {
        &self.start_line
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn into_body(self) -> Bytes {
        self.body
    }
}

/// How the request body is framed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFraming {
    Chunked,
    Length(usize),
    None,
}

impl BodyFraming {
    /// Pick the framing announced by `headers`
    ///
    /// `Transfer-Encoding: chunked` wins over `Content-Length`.
    pub fn from_headers(headers: &Headers) -> Result<Self> {
        if headers
            .get("transfer-encoding")
            .is_some_and(|te| te.eq_ignore_ascii_case("chunked"))
        {
            return Ok(BodyFraming::Chunked);
        }

        match headers.get("content-length") {
            Some(cl) if !cl.is_empty() && cl.bytes().all(|b| b.is_ascii_digit()) => cl
                .parse::<usize>()
                .map(BodyFraming::Length)
                .map_err(|_| Error::InvalidContentLength(cl.to_string())),
            Some(cl) => Err(Error::InvalidContentLength(cl.to_string())),
            None => Ok(BodyFraming::None),
        }
    }
}

/// Reads one request off a stream
#[derive(Debug, Clone, Copy)]
pub struct HttpMessageParser {
    buffer_size: usize,
}

impl HttpMessageParser {
    /// Parser using the default 16 KiB read buffer
    pub fn new() -> Self {
        Self::with_buffer_size(DEFAULT_BUFFER_SIZE)
    }

    pub fn with_buffer_size(buffer_size: usize) -> Self {
        HttpMessageParser {
            buffer_size: buffer_size.max(1),
        }
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Read one complete request from `stream`
    pub fn parse<R: Read>(&self, stream: R) -> Result<HttpMessage> {
        let mut reader = BufferedSocketReader::with_capacity(stream, self.buffer_size);
        self.parse_from(&mut reader)
    }

    /// Read one complete request from an existing reader
    pub fn parse_from<R: Read>(&self, reader: &mut BufferedSocketReader<R>) -> Result<HttpMessage> {
        let block = reader.read_until(HEADER_TERMINATOR.as_bytes())?;

        if block.is_empty() {
            return Err(Error::MalformedRequest("missing start line".to_string()));
        }
        if !block.ends_with(HEADER_TERMINATOR.as_bytes()) {
            return Err(Error::MalformedRequest(format!(
                "header block not terminated after {} bytes",
                block.len()
            )));
        }

        let (start_line, headers) = parse_header_block(&block)?;

        let body = match BodyFraming::from_headers(&headers)? {
            BodyFraming::Chunked => reader.read_chunked()?,
            BodyFraming::Length(len) => reader.read_fixed(len)?,
            BodyFraming::None => Vec::new(),
        };

        Ok(HttpMessage::new(start_line, headers, body))
    }
}

impl Default for HttpMessageParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Split a header block into its start line and normalized headers
///
/// Lines without a colon are skipped.
pub fn parse_header_block(block: &[u8]) -> Result<(String, Headers)> {
    let text = String::from_utf8_lossy(block);
    let mut lines = text.split(CRLF);

    let start_line = match lines.next() {
        Some(line) if !line.is_empty() && text.contains(CRLF) => line.to_string(),
        _ => return Err(Error::MalformedRequest("missing start line".to_string())),
    };

    let mut headers = Headers::new();
    for line in lines.take_while(|line| !line.is_empty()) {
        if let Some((name, value)) = Headers::parse_header_line(line) {
            headers.insert(name, value);
        }
    }

    Ok((start_line, headers))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &[u8]) -> Result<HttpMessage> {
        HttpMessageParser::new().parse(raw)
    }

    #[test]
    fn test_parse_get_without_body() {
        let msg = parse(b"GET / HTTP/1.1\r\nHost: x\r\n\r\n").unwrap();
        assert_eq!(msg.start_line(), "GET / HTTP/1.1");
        assert_eq!(msg.headers().get("host"), Some("x"));
        assert!(msg.body().is_empty());
    }

    #[test]
    fn test_parse_content_length_body() {
        let msg = parse(b"POST /e HTTP/1.1\r\nContent-Length:  11 \r\n\r\nhello world").unwrap();
        assert_eq!(msg.headers().get("content-length"), Some("11"));
        assert_eq!(&msg.body()[..], b"hello world");
    }

    #[test]
    fn test_parse_chunked_body() {
        let msg = parse(
            b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n4\r\nWiki\r\n5\r\npedia\r\n0\r\n\r\n",
        )
        .unwrap();
        assert_eq!(&msg.body()[..], b"Wikipedia");
    }

    #[test]
    fn test_chunked_wins_over_content_length() {
        let msg = parse(
            b"POST / HTTP/1.1\r\nContent-Length: 99\r\nTransfer-Encoding: Chunked\r\n\r\n3\r\nabc\r\n0\r\n\r\n",
        )
        .unwrap();
        assert_eq!(&msg.body()[..], b"abc");
    }

    #[test]
    fn test_headers_normalized_and_last_wins() {
        let msg = parse(b"GET / HTTP/1.1\r\nX-A: one\r\nnot a header\r\nx-a:two\r\n\r\n").unwrap();
        assert_eq!(msg.headers().len(), 1);
        assert_eq!(msg.headers().get("x-a"), Some("two"));
    }

    #[test]
    fn test_small_buffer_parse() {
        let raw = b"POST / HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello";
        let msg = HttpMessageParser::with_buffer_size(3).parse(&raw[..]).unwrap();
        assert_eq!(&msg.body()[..], b"hello");
    }

    #[test]
    fn test_empty_stream_is_malformed() {
        match parse(b"") {
            Err(Error::MalformedRequest(reason)) => assert_eq!(reason, "missing start line"),
            other => panic!("expected MalformedRequest, got {:?}", other),
        }
    }

    #[test]
    fn test_unterminated_header_block() {
        assert!(matches!(parse(b"GET / HTTP/1.1\r\nHost: x\r\n"), Err(Error::MalformedRequest(_))));
        assert!(matches!(parse(b"garbage"), Err(Error::MalformedRequest(_))));
    }

    #[test]
    fn test_empty_start_line() {
        assert!(matches!(parse(b"\r\n\r\n"), Err(Error::MalformedRequest(_))));
    }

    #[test]
    fn test_invalid_content_length() {
        let err = parse(b"POST / HTTP/1.1\r\nContent-Length: five\r\n\r\nhello").unwrap_err();
        assert!(matches!(err, Error::InvalidContentLength(ref v) if v == "five"));
    }

    #[test]
    fn test_signed_content_length_rejected() {
        let err = parse(b"POST / HTTP/1.1\r\nContent-Length: +5\r\n\r\nhello").unwrap_err();
        assert!(matches!(err, Error::InvalidContentLength(ref v) if v == "+5"));

        let negative: Headers = [("Content-Length", "-0")].into_iter().collect();
        assert!(matches!(
            BodyFraming::from_headers(&negative),
            Err(Error::InvalidContentLength(_))
        ));
    }

    #[test]
    fn test_short_body() {
        let err = parse(b"POST / HTTP/1.1\r\nContent-Length: 20\r\n\r\nhello").unwrap_err();
        assert!(matches!(err, Error::ShortRead { expected: 20, received: 5 }));
    }

    #[test]
    fn test_body_framing_from_headers() {
        let none = Headers::new();
        assert_eq!(BodyFraming::from_headers(&none).unwrap(), BodyFraming::None);

        let gzip: Headers = [("Transfer-Encoding", "gzip"), ("Content-Length", "3")]
            .into_iter()
            .collect();
        assert_eq!(BodyFraming::from_headers(&gzip).unwrap(), BodyFraming::Length(3));
    }
}
