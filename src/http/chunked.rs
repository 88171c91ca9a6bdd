//! Chunked transfer encoding support
//!
//! Decoding happens in [`BufferedSocketReader::read_chunked`]; this module
//! holds the chunk-size line grammar and an encoder for producing chunked
//! bodies on the client side.
//!
//! [`BufferedSocketReader::read_chunked`]: super::BufferedSocketReader::read_chunked

use super::{Error, Result, CRLF};
use std::io::Write;

/// Parse a chunk-size line (without its CRLF)
///
/// Accepts surrounding whitespace and ignores chunk extensions after `;`.
pub fn parse_chunk_size(line: &[u8]) -> Result<usize> {
    let line = String::from_utf8_lossy(line);
    let size_str = line.split(';').next().unwrap_or_default().trim();

    if size_str.is_empty() || !size_str.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(Error::InvalidChunkSize(size_str.to_string()));
    }

    usize::from_str_radix(size_str, 16).map_err(|_| Error::InvalidChunkSize(size_str.to_string()))
}

/// Chunked encoder
///
/// Encodes data in HTTP chunked transfer encoding format
pub struct ChunkedEncoder<W: Write> {
    writer: W,
}

impl<W: Write> ChunkedEncoder<W> {
    pub fn new(writer: W) -> Self {
        ChunkedEncoder { writer }
    }

    /// Write one chunk; empty input is skipped since a zero-size chunk
    /// would end the body
    pub fn write_chunk(&mut self, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }

        write!(self.writer, "{:x}{}", data.len(), CRLF)?;
        self.writer.write_all(data)?;
        self.writer.write_all(CRLF.as_bytes())?;
        Ok(())
    }

    /// Write the terminating zero-size chunk and an empty trailer block
    pub fn finish(&mut self) -> Result<()> {
        write!(self.writer, "0{}{}", CRLF, CRLF)?;
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Encode `data` as a chunked body with chunks of at most `chunk_size` bytes
pub fn encode_chunked_body(data: &[u8], chunk_size: usize) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    let mut encoder = ChunkedEncoder::new(&mut output);

    for chunk in data.chunks(chunk_size.max(1)) {
        encoder.write_chunk(chunk)?;
    }

    encoder.finish()?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chunk_size() {
        assert_eq!(parse_chunk_size(b"4").unwrap(), 4);
        assert_eq!(parse_chunk_size(b"1A").unwrap(), 26);
        assert_eq!(parse_chunk_size(b"ff").unwrap(), 255);
        assert_eq!(parse_chunk_size(b"0").unwrap(), 0);
        assert_eq!(parse_chunk_size(b" 10 ").unwrap(), 16);
        assert_eq!(parse_chunk_size(b"5;extension=value").unwrap(), 5);
    }

    #[test]
    fn test_parse_chunk_size_rejects_garbage() {
        assert!(matches!(parse_chunk_size(b""), Err(Error::InvalidChunkSize(_))));
        assert!(matches!(parse_chunk_size(b";ext"), Err(Error::InvalidChunkSize(_))));
        assert!(matches!(parse_chunk_size(b"xyz"), Err(Error::InvalidChunkSize(_))));
        assert!(matches!(parse_chunk_size(b"-1"), Err(Error::InvalidChunkSize(_))));
        assert!(matches!(parse_chunk_size(b"+a"), Err(Error::InvalidChunkSize(_))));
        assert!(matches!(parse_chunk_size(b"0x10"), Err(Error::InvalidChunkSize(_))));
        assert!(matches!(
            parse_chunk_size(b"ffffffffffffffffffff"),
            Err(Error::InvalidChunkSize(_))
        ));
    }

    #[test]
    fn test_encode_multiple_chunks() {
        let mut output = Vec::new();
        let mut encoder = ChunkedEncoder::new(&mut output);

        encoder.write_chunk(b"Wiki").unwrap();
        encoder.write_chunk(b"").unwrap();
        encoder.write_chunk(b"pedia").unwrap();
        encoder.finish().unwrap();

        assert_eq!(output, b"4\r\nWiki\r\n5\r\npedia\r\n0\r\n\r\n");
    }

    #[test]
    fn test_encode_chunked_body_splits() {
        let output = encode_chunked_body(b"Hello, World!", 5).unwrap();
        assert_eq!(output, b"5\r\nHello\r\n5\r\n, Wor\r\n3\r\nld!\r\n0\r\n\r\n");
        assert_eq!(encode_chunked_body(b"", 5).unwrap(), b"0\r\n\r\n");
    }
}
