//! Connection acceptor
//!
//! Owns the listening socket and runs the blocking accept loop, handing
//! every accepted connection to the worker pool. `stop()` shuts down the
//! read half of the listener, which makes a parked `accept()` return.

use super::{Connection, Error, Result, Shutdown, WorkerPool};
use crate::log::Logger;
use socket2::{Domain, Protocol, SockRef, Socket, Type};
use std::io;
use std::net::{Shutdown as Direction, SocketAddr, SocketAddrV4, TcpListener};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

/// What the accept loop does after a failed `accept()`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptAction {
    /// Interrupted by a signal: try again right away
    Retry,
    /// Transient condition: try again after the given delay
    Backoff(Duration),
    /// The listening socket is unusable: leave the loop
    Exit,
}

/// Map an accept error to the loop's reaction
///
/// `backoff` is the delay for resource exhaustion; would-block waits half
/// of it.
pub fn classify_accept_error(err: &io::Error, backoff: Duration) -> AcceptAction {
    match err.raw_os_error() {
        Some(libc::EINTR) => AcceptAction::Retry,
        Some(code) if code == libc::EAGAIN || code == libc::EWOULDBLOCK => {
            AcceptAction::Backoff(backoff / 2)
        }
        Some(libc::EBADF | libc::EINVAL | libc::ENOTSOCK | libc::EOPNOTSUPP) => AcceptAction::Exit,
        Some(_) => AcceptAction::Backoff(backoff),
        None if err.kind() == io::ErrorKind::Interrupted => AcceptAction::Retry,
        None => AcceptAction::Backoff(backoff),
    }
}

/// Listening socket plus accept loop
pub struct ConnectionAcceptor {
    addr: SocketAddrV4,
    backoff: Duration,
    listener: Mutex<Option<Arc<TcpListener>>>,
    shutdown: Shutdown,
    logger: Logger,
}

impl ConnectionAcceptor {
    pub fn new(addr: SocketAddrV4, backoff: Duration, shutdown: Shutdown, logger: Logger) -> Self {
        ConnectionAcceptor {
            addr,
            backoff,
            listener: Mutex::new(None),
            shutdown,
            logger: logger.scoped("acceptor"),
        }
    }

    /// Create, configure, bind and listen
    ///
    /// Any failure is fatal and returned as is. Calling `start()` while a
    /// listener exists returns the existing address.
    pub fn start(&self) -> Result<SocketAddr> {
        let mut slot = self.lock_listener();
        if let Some(listener) = slot.as_ref() {
            self.logger.info("listener already started");
            return listener.local_addr().map_err(|e| Error::socket("getsockname", e));
        }

        let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP))
            .map_err(|e| Error::socket("socket", e))?;
        socket
            .set_reuse_address(true)
            .map_err(|e| Error::socket("setsockopt(SO_REUSEADDR)", e))?;
        socket
            .bind(&SocketAddr::V4(self.addr).into())
            .map_err(|e| Error::socket("bind", e))?;
        socket
            .listen(libc::SOMAXCONN)
            .map_err(|e| Error::socket("listen", e))?;

        let listener: TcpListener = socket.into();
        let local = listener
            .local_addr()
            .map_err(|e| Error::socket("getsockname", e))?;

        self.shutdown.reset();
        *slot = Some(Arc::new(listener));
        self.logger.info(format_args!("listening on {}", local));
        Ok(local)
    }

    /// Address of the active listener, if any
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.lock_listener()
            .as_ref()
            .and_then(|l| l.local_addr().ok())
    }

    /// Accept connections until stopped, submitting each to `pool`
    pub fn run(&self, pool: &WorkerPool) -> Result<()> {
        let listener = self.lock_listener().clone().ok_or(Error::NotStarted)?;
        self.logger.info("accept loop running");

        while !self.shutdown.is_requested() {
            match listener.accept() {
                Ok((stream, peer)) => {
                    let conn = Connection::new(stream, peer);
                    self.logger.info(format_args!("accepted {}", conn));
                    pool.submit(conn);
                }
                Err(e) => {
                    if self.shutdown.is_requested() {
                        self.logger.info("accept interrupted by stop request");
                        break;
                    }
                    match classify_accept_error(&e, self.backoff) {
                        AcceptAction::Retry => {
                            self.logger.debug("accept interrupted by signal, retrying");
                        }
                        AcceptAction::Backoff(delay) => {
                            self.logger.error(format_args!(
                                "accept failed: {}; retrying in {:?}",
                                e, delay
                            ));
                            thread::sleep(delay);
                        }
                        AcceptAction::Exit => {
                            self.logger
                                .error(format_args!("accept failed: {}; leaving accept loop", e));
                            break;
                        }
                    }
                }
            }
        }

        self.logger.info("accept loop finished");
        Ok(())
    }

    /// Unblock `run()` and release the listener
    ///
    /// Idempotent: once the listener is gone there is nothing left to do.
    pub fn stop(&self) {
        self.shutdown.request();

        let Some(listener) = self.lock_listener().take() else {
            self.logger.debug("stop: no active listener");
            return;
        };

        self.logger.info("shutting down listener to interrupt accept()");
        if let Err(e) = SockRef::from(listener.as_ref()).shutdown(Direction::Read) {
            // Some platforms refuse shutdown on a listener; the flag still ends the loop
            self.logger.debug(format_args!("listener shutdown: {}", e));
        }
    }

    fn lock_listener(&self) -> MutexGuard<'_, Option<Arc<TcpListener>>> {
        self.listener.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
