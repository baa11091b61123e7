//! Run-scoped ordinal counter.

use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Hands out record ordinals for one import run.
///
/// Cloning shares the counter. Ranges handed out never overlap, so
/// producers can fill reserved ranges without coordinating.
#[derive(Debug, Clone, Default)]
pub struct OrdinalCursor {
    next: Arc<AtomicU64>,
}

impl OrdinalCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(first: u64) -> Self {
        Self {
            next: Arc::new(AtomicU64::new(first)),
        }
    }

    /// Reserve `count` consecutive ordinals.
    pub fn reserve(&self, count: u64) -> Range<u64> {
        let start = self.next.fetch_add(count, Ordering::Relaxed);
        start..start + count
    }

    /// Next ordinal to be handed out.
    pub fn position(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }
}
