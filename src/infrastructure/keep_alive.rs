//! Keep-processing-alive resource held for the life of a scan session.
//!
//! [`KeepAliveGuard`] releases in `Drop`, so the lock is given back on every
//! exit path of the session task, including errors and panics.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

pub trait KeepAlive: Send + Sync + 'static {
    fn acquire(&self);
    fn release(&self);
}

/// Default keep-alive: tracks whether the session holds the lock.
#[derive(Debug, Default)]
pub struct ProcessKeepAlive {
    held: AtomicBool,
}

impl ProcessKeepAlive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::SeqCst)
    }
}

impl KeepAlive for ProcessKeepAlive {
    fn acquire(&self) {
        if !self.held.swap(true, Ordering::SeqCst) {
            info!("Keep-alive acquired");
        }
    }

    fn release(&self) {
        if self.held.swap(false, Ordering::SeqCst) {
            info!("Keep-alive released");
        }
    }
}

pub struct KeepAliveGuard {
    lock: Arc<dyn KeepAlive>,
}

impl KeepAliveGuard {
    pub fn acquire(lock: Arc<dyn KeepAlive>) -> Self {
        lock.acquire();
        Self { lock }
    }
}

impl Drop for KeepAliveGuard {
    fn drop(&mut self) {
        self.lock.release();
    }
}
