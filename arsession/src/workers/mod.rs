//! Bounded worker pool for I/O-bound work.
//!
//! Fetching or validating trackable datasets involves network and file I/O
//! that must never occupy the engine context. The [`WorkerPool`] runs such
//! work on ordinary Tokio tasks gated by a semaphore, so at most
//! `capacity` pieces of work are in flight at once.
//!
//! The pool runs the work only. Marshaling a completion value back onto
//! the engine context is the session's job (see
//! [`Session::submit_io`](crate::session::Session::submit_io)); nothing
//! that touches lifecycle state or tracker handles executes on a worker.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

/// Bounded pool of I/O worker tasks.
#[derive(Clone)]
pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
}

impl WorkerPool {
    /// Creates a pool allowing `capacity` concurrent pieces of work.
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(capacity.max(1))),
        }
    }

    /// Spawns work onto the pool.
    ///
    /// The work starts once a permit is available; permits are released as
    /// each piece of work finishes. The returned handle can be awaited but
    /// does not need to be; work is not cancelled when the handle drops.
    pub fn spawn<F>(&self, work: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let semaphore = Arc::clone(&self.semaphore);
        tokio::spawn(async move {
            let Ok(_permit) = semaphore.acquire_owned().await else {
                return;
            };
            work.await;
        })
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("available_permits", &self.semaphore.available_permits())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
