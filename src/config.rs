//! Server configuration
//!
//! Parsed from the command line with environment fallbacks:
//!
//! ```bash
//! echopool --port 8080 --workers 8 --buffer-size 16384
//! ECHOPOOL_PORT=9000 ECHOPOOL_WORKERS=2 echopool
//! ```

use crate::http::DEFAULT_BUFFER_SIZE;
use crate::server::{Error, Result};
use clap::{Parser, ValueEnum};
use std::net::{Ipv4Addr, SocketAddrV4};
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_ACCEPT_BACKOFF_MS: u64 = 100;

/// Worker count used when the platform cannot report its parallelism
const FALLBACK_WORKERS: usize = 4;

/// How much the process logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Info,
    Debug,
}

impl LogLevel {
    /// Maximum `tracing` level, or `None` when logging is off
    pub fn as_tracing(&self) -> Option<tracing::Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(tracing::Level::ERROR),
            LogLevel::Info => Some(tracing::Level::INFO),
            LogLevel::Debug => Some(tracing::Level::DEBUG),
        }
    }
}

/// echopool configuration
#[derive(Debug, Clone, Parser)]
#[command(name = "echopool")]
#[command(about = "Pooled HTTP/1.1 echo server")]
#[command(version)]
pub struct Config {
    /// IPv4 address to listen on
    #[arg(long, default_value_t = Ipv4Addr::UNSPECIFIED, env = "ECHOPOOL_HOST")]
    pub host: Ipv4Addr,

    /// Port to listen on (0 picks a free port)
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "ECHOPOOL_PORT")]
    pub port: u16,

    /// Number of worker threads (defaults to available parallelism)
    #[arg(short, long, env = "ECHOPOOL_WORKERS")]
    pub workers: Option<usize>,

    /// Size of each connection's read buffer in bytes
    #[arg(long, default_value_t = DEFAULT_BUFFER_SIZE, env = "ECHOPOOL_BUFFER_SIZE")]
    pub buffer_size: usize,

    /// Delay before retrying accept() after resource exhaustion, in milliseconds
    #[arg(long, default_value_t = DEFAULT_ACCEPT_BACKOFF_MS, env = "ECHOPOOL_ACCEPT_BACKOFF_MS")]
    pub accept_backoff_ms: u64,

    /// Log verbosity
    #[arg(long, value_enum, default_value_t = LogLevel::Info, env = "ECHOPOOL_LOG_LEVEL")]
    pub log_level: LogLevel,
}

impl Config {
    /// Resolved worker count; an explicit zero is passed through so the
    /// pool can reject it
    pub fn workers(&self) -> usize {
        self.workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(FALLBACK_WORKERS)
        })
    }

    pub fn address(&self) -> SocketAddrV4 {
        SocketAddrV4::new(self.host, self.port)
    }

    pub fn accept_backoff(&self) -> Duration {
        Duration::from_millis(self.accept_backoff_ms)
    }

    /// Reject values no component can run with
    pub fn validate(&self) -> Result<()> {
        if self.buffer_size == 0 {
            return Err(Error::InvalidConfig(
                "buffer size must be at least one byte".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: Ipv4Addr::UNSPECIFIED,
            port: DEFAULT_PORT,
            workers: None,
            buffer_size: DEFAULT_BUFFER_SIZE,
            accept_backoff_ms: DEFAULT_ACCEPT_BACKOFF_MS,
            log_level: LogLevel::Info,
        }
    }
}
