//! echopool entry point
//!
//! Parses configuration, installs logging and signal handling, then runs
//! the accept loop on the main thread. Exits non-zero only when the server
//! cannot be set up.

use clap::Parser;
use echopool::{Config, Logger, Server};
use std::process::ExitCode;
use std::sync::Arc;

fn main() -> ExitCode {
    let config = Config::parse();

    let logger = match config.log_level.as_tracing() {
        Some(level) => {
            tracing_subscriber::fmt()
                .with_max_level(level)
                .with_target(false)
                .with_thread_names(true)
                .init();
            Logger::tracing()
        }
        None => Logger::disabled(),
    };

    let server = match Server::new(&config, logger.clone()) {
        Ok(server) => Arc::new(server),
        Err(e) => {
            logger.error(format_args!("startup failed: {}", e));
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = server.start() {
        logger.error(format_args!("startup failed: {}", e));
        return ExitCode::FAILURE;
    }

    let stopper = Arc::clone(&server);
    let signal_logger = logger.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        signal_logger.info("shutdown signal received");
        stopper.stop();
    }) {
        logger.error(format_args!("failed to install signal handler: {}", e));
        server.stop();
        return ExitCode::FAILURE;
    }

    match server.run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            logger.error(format_args!("server error: {}", e));
            ExitCode::FAILURE
        }
    }
}
