//! Growable long arrays with pluggable backends.
//!
//! Provides:
//! - `LongArray` -- the capability set {len, get, set, swap, grow}
//! - `heap` -- single contiguous `Vec<i64>`
//! - `chunked` -- fixed-size anonymous mmap chunks, off the allocator heap
//! - `store` -- `LongArrayStore`, the backend picked by `StoragePolicy`
//!
//! Arrays are single-writer. They are `Send + Sync` so a frozen array can
//! be read from any number of threads without locking.

pub mod chunked;
pub mod heap;
pub mod store;

pub use chunked::ChunkedLongArray;
pub use heap::HeapLongArray;
pub use store::{LongArrayFactory, LongArrayStore, StoragePolicy};

use crate::error::Result;

/// Randomly indexable, growable sequence of i64.
///
/// Indexing past `len()` is a caller bug and panics, like slice indexing.
pub trait LongArray: Send + Sync {
    /// Number of logical slots.
    fn len(&self) -> u64;

    /// Read slot `index`. Slots never written read as the default value.
    fn get(&self, index: u64) -> i64;

    /// Write slot `index`.
    fn set(&mut self, index: u64, value: i64);

    /// Exchange two slots.
    fn swap(&mut self, a: u64, b: u64) {
        let va = self.get(a);
        let vb = self.get(b);
        self.set(a, vb);
        self.set(b, va);
    }

    /// Grow to at least `new_len` slots. Never shrinks; existing values
    /// are preserved.
    fn grow(&mut self, new_len: u64) -> Result<()>;

    /// Bytes held by the backing storage.
    fn memory_usage(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
