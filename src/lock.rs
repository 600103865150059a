//! Best-effort mutual exclusion around the read-modify-append sequence of the submission handler.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::debug;

#[async_trait]
pub trait Lock: Send + Sync {
    /// Waits at most `timeout` for the lock. `None` means the wait expired.
    /// The lock is released when the returned guard is dropped.
    async fn try_acquire(&self, timeout: Duration) -> Option<LockGuard>;
}

/// Holds the lock until dropped.
#[derive(Debug)]
pub struct LockGuard {
    _permit: OwnedSemaphorePermit,
}

impl LockGuard {
    pub fn new(permit: OwnedSemaphorePermit) -> Self {
        Self { _permit: permit }
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        debug!("{:<20} - Released", "lock");
    }
}

/// A single lock shared by every request of the process.
#[derive(Debug, Clone)]
pub struct ProcessLock {
    permits: Arc<Semaphore>,
}

impl ProcessLock {
    pub fn new() -> Self {
        Self {
            permits: Arc::new(Semaphore::new(1)),
        }
    }
}

impl Default for ProcessLock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Lock for ProcessLock {
    async fn try_acquire(&self, timeout: Duration) -> Option<LockGuard> {
        match tokio::time::timeout(timeout, self.permits.clone().acquire_owned()).await {
            Ok(Ok(permit)) => Some(LockGuard::new(permit)),
            // The semaphore is never closed, an error here can only be the timeout.
            Ok(Err(_)) | Err(_) => None,
        }
    }
}
