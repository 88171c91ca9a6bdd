//! Accept / dispatch pipeline
//!
//! One acceptor thread feeds a fixed-size [`WorkerPool`] through a FIFO
//! queue; each worker runs a [`ConnectionHandler`] and closes the
//! connection. A shared [`Shutdown`] flag stops both sides.
//!
//! # Examples
//!
//! ```no_run
//! use echopool::{Config, Logger, Server};
//! use std::sync::Arc;
//! use std::thread;
//!
//! let config = Config::default();
//! let server = Arc::new(Server::new(&config, Logger::tracing()).unwrap());
//! server.start().unwrap();
//!
//! let stopper = Arc::clone(&server);
//! thread::spawn(move || stopper.stop());
//! server.run().unwrap();
//! ```

pub mod acceptor;
pub mod connection;
pub mod handler;
pub mod pool;
pub mod shutdown;

pub use acceptor::ConnectionAcceptor;
pub use connection::Connection;
pub use handler::{ConnectionHandler, EchoHandler};
pub use pool::WorkerPool;
pub use shutdown::Shutdown;

use crate::config::Config;
use crate::log::Logger;
use std::net::SocketAddr;
use std::sync::Arc;

/// Result type for server lifecycle operations
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal server errors
///
/// These escalate to the caller. Per-connection failures are
/// [`crate::http::Error`] and never convert into this type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{op} failed: {source}")]
    Socket {
        op: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Server not started")]
    NotStarted,
}

impl Error {
    pub(crate) fn socket(op: &'static str, source: std::io::Error) -> Self {
        Error::Socket { op, source }
    }
}

/// Acceptor and worker pool sharing one stop flag
///
/// A worker count of 1 handles connections one at a time.
pub struct Server {
    acceptor: ConnectionAcceptor,
    pool: WorkerPool,
    shutdown: Shutdown,
    logger: Logger,
}

impl Server {
    /// Build a server that echoes request bodies
    pub fn new(config: &Config, logger: Logger) -> Result<Self> {
        let handler = Arc::new(EchoHandler::new(config.buffer_size, logger.clone()));
        Self::with_handler(config, handler, logger)
    }

    /// Build a server around a custom handler
    pub fn with_handler(
        config: &Config,
        handler: Arc<dyn ConnectionHandler>,
        logger: Logger,
    ) -> Result<Self> {
        config.validate()?;

        let shutdown = Shutdown::new();
        let pool = WorkerPool::new(config.workers(), handler, shutdown.clone(), logger.clone())?;
        let acceptor = ConnectionAcceptor::new(
            config.address(),
            config.accept_backoff(),
            shutdown.clone(),
            logger.clone(),
        );

        Ok(Server {
            acceptor,
            pool,
            shutdown,
            logger: logger.scoped("server"),
        })
    }

    /// Bind the listener, then spawn the workers
    pub fn start(&self) -> Result<SocketAddr> {
        let addr = self.acceptor.start()?;
        if let Err(e) = self.pool.start() {
            self.acceptor.stop();
            return Err(e);
        }
        self.logger.info(format_args!(
            "started on {} with {} worker(s)",
            addr,
            self.pool.size()
        ));
        Ok(addr)
    }

    /// Run the accept loop on the calling thread
    ///
    /// Returns after the loop ends and every worker has been joined.
    pub fn run(&self) -> Result<()> {
        let result = match self.acceptor.run(&self.pool) {
            // stop() won the race and already released the listener
            Err(Error::NotStarted) if self.shutdown.is_requested() => Ok(()),
            other => other,
        };
        self.pool.stop();
        self.logger.info("server stopped");
        result
    }

    /// Stop accepting and wait for the workers; safe to call repeatedly
    /// and from any thread
    pub fn stop(&self) {
        self.logger.info("stop requested");
        self.acceptor.stop();
        self.pool.stop();
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.acceptor.local_addr()
    }

    pub fn is_stopping(&self) -> bool {
        self.shutdown.is_requested()
    }
}
