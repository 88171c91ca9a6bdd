//! Worker pool
//!
//! N long-lived threads pull connections from a shared FIFO queue guarded
//! by one mutex and one condition variable. The queue is the only state
//! touched by more than one thread.

use super::{Connection, ConnectionHandler, Error, Result, Shutdown};
use crate::log::Logger;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

struct Shared {
    queue: Mutex<VecDeque<Connection>>,
    available: Condvar,
    shutdown: Shutdown,
}

impl Shared {
    fn lock_queue(&self) -> MutexGuard<'_, VecDeque<Connection>> {
        // Handlers run outside the lock, so a poisoned queue is still consistent
        self.queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Fixed-size pool of connection workers
pub struct WorkerPool {
    shared: Arc<Shared>,
    handler: Arc<dyn ConnectionHandler>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    size: usize,
    logger: Logger,
}

impl WorkerPool {
    /// Create a pool of `size` workers; zero is a configuration error
    pub fn new(
        size: usize,
        handler: Arc<dyn ConnectionHandler>,
        shutdown: Shutdown,
        logger: Logger,
    ) -> Result<Self> {
        if size == 0 {
            return Err(Error::InvalidConfig(
                "worker pool needs at least one thread".to_string(),
            ));
        }

        Ok(WorkerPool {
            shared: Arc::new(Shared {
                queue: Mutex::new(VecDeque::new()),
                available: Condvar::new(),
                shutdown,
            }),
            handler,
            workers: Mutex::new(Vec::with_capacity(size)),
            size,
            logger: logger.scoped("pool"),
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Connections waiting for a worker
    pub fn queued(&self) -> usize {
        self.shared.lock_queue().len()
    }

    /// Spawn the worker threads
    ///
    /// Clears the stop flag for a fresh cycle. Calling it on a running pool
    /// only logs.
    pub fn start(&self) -> Result<()> {
        let mut workers = self.lock_workers();
        if !workers.is_empty() {
            self.logger.info("worker threads already started");
            return Ok(());
        }

        self.shared.shutdown.reset();
        self.logger.info(format_args!("starting {} worker threads", self.size));

        for id in 0..self.size {
            let shared = Arc::clone(&self.shared);
            let handler = Arc::clone(&self.handler);
            let logger = self.logger.clone();

            let spawned = thread::Builder::new()
                .name(format!("worker-{}", id))
                .spawn(move || worker_loop(id, &shared, handler.as_ref(), &logger));

            match spawned {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    drop(workers);
                    self.stop();
                    return Err(Error::Spawn(e));
                }
            }
        }

        Ok(())
    }

    /// Queue a connection and wake one worker
    ///
    /// After shutdown has been requested the connection is closed instead.
    pub fn submit(&self, conn: Connection) {
        let mut queue = self.shared.lock_queue();
        // Checked under the queue lock: stop() raises the flag before its
        // final drain, so nothing can be pushed after that drain
        if self.shared.shutdown.is_requested() {
            drop(queue);
            self.logger
                .info(format_args!("{}: shutting down, closing without dispatch", conn));
            conn.close();
            return;
        }

        queue.push_back(conn);
        drop(queue);
        self.shared.available.notify_one();
    }

    /// Stop the pool and wait for every worker to exit
    ///
    /// Connections still queued afterwards are closed unprocessed. A second
    /// call finds no workers and returns immediately.
    pub fn stop(&self) {
        // Held for the whole join, so concurrent callers return only once
        // every worker is gone
        let mut workers = self.lock_workers();

        self.shared.shutdown.request();
        {
            // Taking the lock orders the flag store before any worker's
            // next emptiness check
            let _queue = self.shared.lock_queue();
            self.shared.available.notify_all();
        }

        if workers.is_empty() {
            self.logger.debug("stop: no running workers");
        } else {
            self.logger
                .info(format_args!("waiting for {} worker threads to join", workers.len()));
            for handle in workers.drain(..) {
                if handle.join().is_err() {
                    self.logger.error("worker thread panicked outside a handler");
                }
            }
            self.logger.info("all worker threads joined");
        }

        let leftovers: Vec<Connection> = self.shared.lock_queue().drain(..).collect();
        for conn in leftovers {
            self.logger
                .error(format_args!("{}: never dispatched, closing", conn));
            conn.close();
        }
    }

    fn lock_workers(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.workers.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.stop();
    }
}

fn worker_loop(id: usize, shared: &Shared, handler: &dyn ConnectionHandler, logger: &Logger) {
    logger.debug(format_args!("worker {} started", id));

    loop {
        let conn = {
            let mut queue = shared.lock_queue();
            loop {
                if let Some(conn) = queue.pop_front() {
                    break conn;
                }
                if shared.shutdown.is_requested() {
                    logger.debug(format_args!("worker {} exiting", id));
                    return;
                }
                queue = shared
                    .available
                    .wait(queue)
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
            }
        };

        logger.debug(format_args!("worker {} handling {}", id, conn));
        if panic::catch_unwind(AssertUnwindSafe(|| handler.handle(&conn))).is_err() {
            logger.error(format_args!("worker {}: handler panicked on {}", id, conn));
        }

        let label = conn.to_string();
        conn.close();
        logger.debug(format_args!("worker {} closed {}", id, label));
    }
}
