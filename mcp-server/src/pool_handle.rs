//! In-process stand-in for the connection pool the controller governs.
//!
//! The relational database itself is an out-of-scope external
//! collaborator (spec §1); this crate still owns the pool *controller*
//! (`mcp-pool`), so it needs something implementing `PoolHandle` to
//! drive. [`SimulatedPool`] tracks size/checkout bookkeeping the same
//! way `mcp-pool`'s own test `FakePool` does, swapping in a resized
//! capacity on `resize` rather than opening real connections.

use mcp_pool::PoolHandle;
use std::sync::atomic::{AtomicUsize, Ordering};

pub struct SimulatedPool {
    size: AtomicUsize,
    checked_out: AtomicUsize,
    overflow: AtomicUsize,
}

impl SimulatedPool {
    pub fn new(initial_size: usize) -> Self {
        Self { size: AtomicUsize::new(initial_size), checked_out: AtomicUsize::new(0), overflow: AtomicUsize::new(0) }
    }

    pub fn checkout(&self) {
        self.checked_out.fetch_add(1, Ordering::Relaxed);
    }

    pub fn checkin(&self) {
        self.checked_out.fetch_sub(1, Ordering::Relaxed);
    }
}

#[async_trait::async_trait]
impl PoolHandle for SimulatedPool {
    fn current_size(&self) -> usize {
        self.size.load(Ordering::Relaxed)
    }

    fn checked_out(&self) -> usize {
        self.checked_out.load(Ordering::Relaxed)
    }

    fn overflow(&self) -> usize {
        self.overflow.load(Ordering::Relaxed)
    }

    async fn resize(&self, new_size: usize) {
        self.size.store(new_size, Ordering::Relaxed);
    }
}
