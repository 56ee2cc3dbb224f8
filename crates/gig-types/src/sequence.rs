use std::sync::atomic::{AtomicU64, Ordering};

/// Monotone id allocator for jobs, disputes and credential tokens.
///
/// Ids start at 1 and are never reused. Each ledger component owns its own
/// allocator rather than sharing ambient global state.
#[derive(Debug)]
pub struct SequenceAllocator {
    next: AtomicU64,
}

impl SequenceAllocator {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Resume from persisted state: the next id handed out will be `next`.
    pub fn starting_at(next: u64) -> Self {
        Self {
            next: AtomicU64::new(next),
        }
    }

    pub fn next_id(&self) -> u64 {
        self.next.fetch_add(1, Ordering::SeqCst)
    }

    /// Highest id allocated so far (0 when none).
    pub fn last_id(&self) -> u64 {
        self.next.load(Ordering::SeqCst) - 1
    }
}

impl Default for SequenceAllocator {
    fn default() -> Self {
        Self::new()
    }
}
