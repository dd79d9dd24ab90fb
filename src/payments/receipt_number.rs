use std::sync::atomic::{AtomicU64, Ordering};

/// process-wide monotonic receipt counter
#[derive(Debug)]
pub struct ReceiptSequence {
    next: AtomicU64,
}

impl ReceiptSequence {
    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }

    /// hand out the next value; never repeats
    pub fn next(&self) -> u64 {
        self.next.fetch_add(1, Ordering::SeqCst)
    }

    /// value the next call will return
    pub fn peek(&self) -> u64 {
        self.next.load(Ordering::SeqCst)
    }
}
