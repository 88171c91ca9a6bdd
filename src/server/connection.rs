//! Accepted client connection

use std::fmt;
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::os::fd::AsRawFd;

/// An accepted connection and its peer address
///
/// Ownership moves acceptor -> queue -> one worker. The descriptor is
/// closed when the value is closed or dropped, so it cannot be closed
/// twice.
pub struct Connection {
    stream: TcpStream,
    peer: SocketAddr,
}

impl Connection {
    pub fn new(stream: TcpStream, peer: SocketAddr) -> Self {
        Connection { stream, peer }
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn stream(&self) -> &TcpStream {
        &self.stream
    }

    pub fn fd(&self) -> i32 {
        self.stream.as_raw_fd()
    }

    /// Shut down both directions, then release the descriptor
    pub fn close(self) {
        // The peer may already be gone
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("fd", &self.fd())
            .field("peer", &self.peer)
            .finish()
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [fd {}]", self.peer, self.fd())
    }
}
