//! Shutdown coordination
//!
//! One stop flag shared by the acceptor and the worker pool. It starts
//! cleared, is set once per shutdown, and is only cleared again by a new
//! `start()` cycle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cloneable handle onto a shared stop flag
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    requested: Arc<AtomicBool>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the flag; returns `true` only for the call that set it
    pub fn request(&self) -> bool {
        !self.requested.swap(true, Ordering::SeqCst)
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Clear the flag for a fresh start cycle
    pub(crate) fn reset(&self) {
        self.requested.store(false, Ordering::SeqCst);
    }
}
