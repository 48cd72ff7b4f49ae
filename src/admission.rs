//! Two-level admission control
//!
//! Every front draws from one process-wide [`TokenPool`] and from its own
//! local pool. Tokens are always taken global first, then local, and given
//! back local first, then global. Callers never see the two pools; they get a
//! [`FrontGate`] whose [`FrontGate::admit`] returns a [`Ticket`] that
//! releases both tokens, in order, when dropped.

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Default process-wide connection ceiling
pub const DEFAULT_GLOBAL_CAPACITY: usize = 8192;

/// Default per-front connection ceiling
pub const DEFAULT_FRONT_CAPACITY: usize = 1024;

/// Fixed-capacity pool of interchangeable permits
#[derive(Debug, Clone)]
pub struct TokenPool {
    capacity: usize,
    permits: Arc<Semaphore>,
}

impl TokenPool {
    /// Create a pool holding `capacity` permits, all available
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            permits: Arc::new(Semaphore::new(capacity)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Permits currently available
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Wait for a permit. Returns `None` once the pool has been drained.
    pub async fn acquire(&self) -> Option<OwnedSemaphorePermit> {
        self.permits.clone().acquire_owned().await.ok()
    }

    /// Close the pool; pending and future acquisitions give up.
    pub fn drain(&self) {
        self.permits.close();
    }

    pub fn is_drained(&self) -> bool {
        self.permits.is_closed()
    }
}

/// Process-wide admission state, owned by the orchestrator and handed to
/// every front at construction time.
#[derive(Debug, Clone)]
pub struct Admission {
    global: TokenPool,
}

impl Admission {
    pub fn new(global_capacity: usize) -> Self {
        Self {
            global: TokenPool::new(global_capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.global.capacity()
    }

    /// Global permits currently available
    pub fn available(&self) -> usize {
        self.global.available()
    }

    /// Build the gate for one front with its own local ceiling
    pub fn front_gate(&self, local_capacity: usize) -> FrontGate {
        FrontGate {
            global: self.global.clone(),
            local: TokenPool::new(local_capacity),
        }
    }
}

impl Default for Admission {
    fn default() -> Self {
        Self::new(DEFAULT_GLOBAL_CAPACITY)
    }
}

/// Admission entry point for a single front
#[derive(Debug)]
pub struct FrontGate {
    global: TokenPool,
    local: TokenPool,
}

impl FrontGate {
    /// Block until both a global and a local token are held.
    ///
    /// There is no timeout. `None` means the front has been drained and is
    /// shutting down.
    pub async fn admit(&self) -> Option<Ticket> {
        let global = self.global.acquire().await?;
        let local = self.local.acquire().await?;
        Some(Ticket {
            local: Some(local),
            global: Some(global),
        })
    }

    /// Local ceiling of this front
    pub fn capacity(&self) -> usize {
        self.local.capacity()
    }

    /// Local tokens currently available
    pub fn available(&self) -> usize {
        self.local.available()
    }

    /// Close the local pool. The global pool is shared and stays open.
    pub fn drain(&self) {
        self.local.drain();
    }

    pub fn is_drained(&self) -> bool {
        self.local.is_drained()
    }
}

/// Proof of admission. Dropping it releases the local token, then the
/// global one.
#[derive(Debug)]
#[must_use = "dropping a ticket releases the admission slot"]
pub struct Ticket {
    local: Option<OwnedSemaphorePermit>,
    global: Option<OwnedSemaphorePermit>,
}

impl Ticket {
    /// Give the slot back. Same as dropping the ticket.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for Ticket {
    fn drop(&mut self) {
        drop(self.local.take());
        drop(self.global.take());
    }
}
