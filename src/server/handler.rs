//! Connection handling
//!
//! A handler performs exactly one request/response cycle on a connection
//! and returns. It never closes the connection; the worker that owns it
//! does.

use super::Connection;
use crate::http::{self, HttpMessageParser, Response};
use crate::log::Logger;
use std::io::{self, Write};

/// Processes one connection
///
/// Implementations must not let per-connection failures escape: log them
/// and return.
pub trait ConnectionHandler: Send + Sync + 'static {
    fn handle(&self, conn: &Connection);
}

/// Echoes the request body back in a 200 response
#[derive(Debug, Clone)]
pub struct EchoHandler {
    parser: HttpMessageParser,
    logger: Logger,
}

impl EchoHandler {
    pub fn new(buffer_size: usize, logger: Logger) -> Self {
        EchoHandler {
            parser: HttpMessageParser::with_buffer_size(buffer_size),
            logger: logger.scoped("handler"),
        }
    }

    /// Parse, build and send; returns the body length echoed
    fn respond(&self, conn: &Connection) -> http::Result<usize> {
        let request = self.parser.parse(conn.stream())?;
        self.logger.debug(format_args!(
            "{}: \"{}\" with {} header(s), {} byte body",
            conn,
            request.start_line(),
            request.headers().len(),
            request.body().len()
        ));

        let response = Response::echo(request.into_body());
        send_all(conn.stream(), &response.head())?;
        send_all(conn.stream(), response.body())?;

        Ok(response.body().len())
    }
}

impl ConnectionHandler for EchoHandler {
    fn handle(&self, conn: &Connection) {
        match self.respond(conn) {
            Ok(len) => self.logger.info(format_args!("{}: echoed {} bytes", conn, len)),
            Err(e) => {
                self.logger.error(format_args!("{}: request failed: {}", conn, e));
                if e.is_peer_gone() {
                    return;
                }
                if let Err(send_err) = send_all(conn.stream(), &Response::internal_error().to_wire()) {
                    self.logger
                        .debug(format_args!("{}: could not deliver 500: {}", conn, send_err));
                }
            }
        }
    }
}

/// Write all of `data`, looping over partial writes
///
/// A reset or closed peer aborts immediately with no retry.
pub fn send_all<W: Write>(mut writer: W, data: &[u8]) -> http::Result<()> {
    let mut written = 0;

    while written < data.len() {
        match writer.write(&data[written..]) {
            Ok(0) => return Err(http::Error::ConnectionClosed),
            Ok(n) => written += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::BrokenPipe | io::ErrorKind::ConnectionReset
                ) =>
            {
                return Err(http::Error::PeerReset)
            }
            Err(e) => return Err(http::Error::Io(e)),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::{CaptureSink, Level};
    use std::io::Read;
    use std::net::{Shutdown, TcpListener, TcpStream};
    use std::sync::Arc;
    use std::thread;

    /// Accepts at most `limit` bytes per write call
    struct Partial {
        out: Vec<u8>,
        limit: usize,
        calls: usize,
    }

    impl Write for Partial {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.calls += 1;
            if self.calls % 2 == 0 {
                return Err(io::Error::new(io::ErrorKind::Interrupted, "signal"));
            }
            let n = buf.len().min(self.limit);
            self.out.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct Failing(io::ErrorKind);

    impl Write for Failing {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(self.0, "failing"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_send_all_loops_partial_writes() {
        let mut sink = Partial {
            out: Vec::new(),
            limit: 3,
            calls: 0,
        };
        send_all(&mut sink, b"hello world").unwrap();
        assert_eq!(sink.out, b"hello world");
    }

    #[test]
    fn test_send_all_broken_peer() {
        assert!(matches!(
            send_all(Failing(io::ErrorKind::BrokenPipe), b"x"),
            Err(http::Error::PeerReset)
        ));
        assert!(matches!(
            send_all(Failing(io::ErrorKind::ConnectionReset), b"x"),
            Err(http::Error::PeerReset)
        ));
        assert!(matches!(
            send_all(Failing(io::ErrorKind::Other), b"x"),
            Err(http::Error::Io(_))
        ));
        assert!(matches!(
            send_all(&mut [0u8; 0][..], b"x"),
            Err(http::Error::ConnectionClosed)
        ));
    }

    fn run_handler(request: &'static [u8], sink: Arc<CaptureSink>) -> Vec<u8> {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let client = thread::spawn(move || {
            let mut stream = TcpStream::connect(addr).unwrap();
            stream.write_all(request).unwrap();
            stream.shutdown(Shutdown::Write).unwrap();

            let mut buf = Vec::new();
            let _ = stream.read_to_end(&mut buf);
            buf
        });

        let (stream, peer) = listener.accept().unwrap();
        let conn = Connection::new(stream, peer);
        EchoHandler::new(64, Logger::new(sink)).handle(&conn);
        conn.close();

        client.join().unwrap()
    }

    #[test]
    fn test_handle_echoes_body() {
        let sink = Arc::new(CaptureSink::new());
        let response = run_handler(
            b"POST / HTTP/1.1\r\nContent-Length: 11\r\n\r\nhello world",
            sink.clone(),
        );
        let text = String::from_utf8(response).unwrap();

        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.contains("Content-Length: 11\r\n"));
        assert!(text.ends_with("\r\n\r\nhello world"));
        assert!(sink.contains(Level::Info, "echoed 11 bytes"));
    }

    #[test]
    fn test_handle_bad_chunk_sends_500() {
        let sink = Arc::new(CaptureSink::new());
        let response = run_handler(
            b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\nnothex\r\n",
            sink.clone(),
        );
        let text = String::from_utf8(response).unwrap();

        assert!(text.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
        assert!(text.contains("Content-Length: 0\r\n"));
        assert!(sink.contains(Level::Error, "Invalid chunk size"));
    }

    #[test]
    fn test_handle_empty_request_sends_500() {
        let sink = Arc::new(CaptureSink::new());
        let response = run_handler(b"", sink.clone());
        let text = String::from_utf8(response).unwrap();

        assert!(text.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
        assert!(sink.contains(Level::Error, "missing start line"));
    }
}
