//! echopool - pooled HTTP/1.1 echo server
//!
//! A blocking TCP listener that hands accepted connections to a fixed-size
//! worker pool. Each worker parses one HTTP/1.1 request straight off the
//! socket (Content-Length or chunked bodies) and echoes the body back.
//!
//! - `http`: buffered socket reader, request framing, response assembly
//! - `server`: acceptor, worker pool, shutdown coordination
//! - `log`: injected logging sink used by every component
//! - `config`: command line / environment configuration

pub mod config;
pub mod http;
pub mod log;
pub mod server;

pub use config::Config;
pub use log::{Level, LogSink, Logger};
pub use server::Server;
