//! Buffered socket reader
//!
//! A single reusable buffer with a read cursor over one stream. Every
//! refill is exactly one blocking `read` call; a refill returning zero
//! bytes is end-of-stream for all three read strategies.

use super::{chunked, Error, Result, CRLF, DEFAULT_BUFFER_SIZE};
use std::io::{self, Read};

/// Buffered reader over a connection
///
/// Strictly sequential and single-owner: bytes come out in exactly the
/// order they arrived on the socket.
pub struct BufferedSocketReader<R: Read> {
    inner: R,
    buffer: Box<[u8]>,
    pos: usize,
    filled: usize,
    eof: bool,
}

impl<R: Read> BufferedSocketReader<R> {
    /// Create a reader with the default 16 KiB buffer
    pub fn new(inner: R) -> Self {
        Self::with_capacity(inner, DEFAULT_BUFFER_SIZE)
    }

    /// Create a reader with a specific buffer size (at least one byte)
    pub fn with_capacity(inner: R, capacity: usize) -> Self {
        BufferedSocketReader {
            inner,
            buffer: vec![0u8; capacity.max(1)].into_boxed_slice(),
            pos: 0,
            filled: 0,
            eof: false,
        }
    }

    /// Size of the internal buffer
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Bytes read from the socket but not yet handed out
    pub fn buffered(&self) -> &[u8] {
        &self.buffer[self.pos..self.filled]
    }

    /// Read up to and including the first occurrence of `delimiter`
    ///
    /// On end-of-stream the bytes collected so far are returned, possibly
    /// none. A result that does not end with `delimiter` is a framing error
    /// for the caller to report.
    pub fn read_until(&mut self, delimiter: &[u8]) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        if delimiter.is_empty() {
            return Ok(out);
        }

        loop {
            if self.pos >= self.filled && self.refill()? == 0 {
                return Ok(out);
            }

            // A match may straddle the previous refill boundary
            let search_from = out.len().saturating_sub(delimiter.len() - 1);
            let available = self.filled - self.pos;
            out.extend_from_slice(&self.buffer[self.pos..self.filled]);

            if let Some(offset) = find(&out[search_from..], delimiter) {
                let end = search_from + offset + delimiter.len();
                let unused = out.len() - end;
                out.truncate(end);
                self.pos = self.filled - unused;
                debug_assert!(unused < available);
                return Ok(out);
            }

            self.pos = self.filled;
        }
    }

    /// Read exactly `len` bytes
    pub fn read_fixed(&mut self, len: usize) -> Result<Vec<u8>> {
        // Never trust a peer-supplied length for the allocation
        let mut out = Vec::with_capacity(len.min(self.buffer.len()));

        while out.len() < len {
            if self.pos >= self.filled && self.refill()? == 0 {
                return Err(Error::ShortRead {
                    expected: len,
                    received: out.len(),
                });
            }

            let take = (self.filled - self.pos).min(len - out.len());
            out.extend_from_slice(&self.buffer[self.pos..self.pos + take]);
            self.pos += take;
        }

        Ok(out)
    }

    /// Decode a chunked transfer-encoded body
    ///
    /// Reads `<hex-size>\r\n<data>\r\n` chunks until the zero-size chunk,
    /// then consumes the trailer block up to its blank line.
    pub fn read_chunked(&mut self) -> Result<Vec<u8>> {
        let mut body = Vec::new();

        loop {
            let line = self.read_line()?;
            let size = chunked::parse_chunk_size(&line)?;

            if size == 0 {
                self.skip_trailers()?;
                return Ok(body);
            }

            let chunk = self.read_fixed(size)?;
            body.extend_from_slice(&chunk);

            if self.read_until(CRLF.as_bytes())? != CRLF.as_bytes() {
                return Err(Error::MissingChunkTerminator);
            }
        }
    }

    /// Consume the underlying stream
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Get a reference to the underlying stream
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    fn read_line(&mut self) -> Result<Vec<u8>> {
        let mut line = self.read_until(CRLF.as_bytes())?;
        if !line.ends_with(CRLF.as_bytes()) {
            return Err(Error::Incomplete);
        }
        line.truncate(line.len() - CRLF.len());
        Ok(line)
    }

    fn skip_trailers(&mut self) -> Result<()> {
        loop {
            let line = self.read_until(CRLF.as_bytes())?;
            // Blank line ends the trailers; end-of-stream after the last
            // chunk still leaves a complete body
            if line == CRLF.as_bytes() || !line.ends_with(CRLF.as_bytes()) {
                return Ok(());
            }
        }
    }

    fn refill(&mut self) -> Result<usize> {
        self.pos = 0;
        self.filled = 0;
        if self.eof {
            return Ok(0);
        }

        let n = loop {
            match self.inner.read(&mut self.buffer) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::Io(e)),
            }
        };

        self.filled = n;
        self.eof = n == 0;
        Ok(n)
    }
}

/// Find the first occurrence of `needle` in `haystack`
fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
