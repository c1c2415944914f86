//! C6: a monotonically increasing, never-reused transaction id source.

use std::sync::atomic::{AtomicU64, Ordering};

/// `0` is reserved to mean "no transaction".
pub type TxId = u64;

pub struct TxIdAllocator {
    next: AtomicU64,
}

impl TxIdAllocator {
    pub fn new() -> Self {
        Self { next: AtomicU64::new(1) }
    }

    /// Resumes allocation after WAL replay: the allocator starts at
    /// `max(tx_id seen) + 1`.
    pub fn starting_at(next: TxId) -> Self {
        Self { next: AtomicU64::new(next) }
    }

    /// Atomically reserves and returns the next id.
    pub fn next(&self) -> TxId {
        self.next.fetch_add(1, Ordering::SeqCst)
    }

    /// The next id that would be handed out, without reserving it.
    pub fn peek(&self) -> TxId {
        self.next.load(Ordering::SeqCst)
    }
}

impl Default for TxIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}
