//! Backend selection for long arrays.
//!
//! `LongArrayFactory` turns a `StoragePolicy` plus an expected element
//! count into a `LongArrayStore`:
//! - `Heap`    -> always `HeapLongArray`
//! - `Chunked` -> always `ChunkedLongArray`
//! - `Auto`    -> heap below `heap_threshold` elements, chunked above.
//!   An auto store that starts on the heap and later grows past the
//!   threshold migrates its contents into chunks.

use serde::{Deserialize, Serialize};

use crate::array::chunked::DEFAULT_CHUNK_LEN;
use crate::array::{ChunkedLongArray, HeapLongArray, LongArray};
use crate::error::Result;

/// Default auto threshold: 32M slots (256 MB) stay on the heap.
pub const DEFAULT_HEAP_THRESHOLD: u64 = 32 * 1024 * 1024;

/// Which backend a long array uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoragePolicy {
    Heap,
    Chunked,
    #[default]
    Auto,
}

/// Creates long arrays according to a storage policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LongArrayFactory {
    pub policy: StoragePolicy,
    /// Element count at which `Auto` switches from heap to chunks.
    pub heap_threshold: u64,
    /// Slots per chunk for chunked arrays.
    pub chunk_len: usize,
}

impl LongArrayFactory {
    pub fn new(policy: StoragePolicy) -> Self {
        Self {
            policy,
            heap_threshold: DEFAULT_HEAP_THRESHOLD,
            chunk_len: DEFAULT_CHUNK_LEN,
        }
    }

    pub fn with_heap_threshold(mut self, heap_threshold: u64) -> Self {
        self.heap_threshold = heap_threshold;
        self
    }

    pub fn with_chunk_len(mut self, chunk_len: usize) -> Self {
        self.chunk_len = chunk_len;
        self
    }

    /// Create an array of `expected` slots, all reading `default_value`.
    pub fn create(&self, expected: u64, default_value: i64) -> Result<LongArrayStore> {
        let backend = if self.prefers_chunks(expected) {
            Backend::Chunked(ChunkedLongArray::with_chunk_len(
                expected,
                default_value,
                self.chunk_len,
            )?)
        } else {
            Backend::Heap(HeapLongArray::new(expected, default_value)?)
        };
        Ok(LongArrayStore {
            backend,
            factory: *self,
        })
    }

    fn prefers_chunks(&self, len: u64) -> bool {
        match self.policy {
            StoragePolicy::Heap => false,
            StoragePolicy::Chunked => true,
            StoragePolicy::Auto => len > self.heap_threshold,
        }
    }
}

impl Default for LongArrayFactory {
    fn default() -> Self {
        Self::new(StoragePolicy::Auto)
    }
}

enum Backend {
    Heap(HeapLongArray),
    Chunked(ChunkedLongArray),
}

/// Long array whose backend was chosen by a `LongArrayFactory`.
pub struct LongArrayStore {
    backend: Backend,
    factory: LongArrayFactory,
}

impl LongArrayStore {
    /// True when the current backend is chunked.
    pub fn is_chunked(&self) -> bool {
        matches!(self.backend, Backend::Chunked(_))
    }

    /// Copy heap contents into chunks once an auto store outgrows the heap.
    fn migrate_to_chunks(&mut self, new_len: u64) -> Result<()> {
        let Backend::Heap(heap) = &self.backend else {
            return Ok(());
        };
        let mut chunked = ChunkedLongArray::with_chunk_len(
            new_len,
            heap.default_value(),
            self.factory.chunk_len,
        )?;
        for (i, &value) in heap.as_slice().iter().enumerate() {
            if value != heap.default_value() {
                chunked.set(i as u64, value);
            }
        }
        tracing::debug!(
            from = heap.len(),
            to = new_len,
            threshold = self.factory.heap_threshold,
            "Long array outgrew heap threshold, migrated to chunked storage"
        );
        self.backend = Backend::Chunked(chunked);
        Ok(())
    }
}

impl LongArray for LongArrayStore {
    fn len(&self) -> u64 {
        match &self.backend {
            Backend::Heap(a) => a.len(),
            Backend::Chunked(a) => a.len(),
        }
    }

    #[inline]
    fn get(&self, index: u64) -> i64 {
        match &self.backend {
            Backend::Heap(a) => a.get(index),
            Backend::Chunked(a) => a.get(index),
        }
    }

    #[inline]
    fn set(&mut self, index: u64, value: i64) {
        match &mut self.backend {
            Backend::Heap(a) => a.set(index, value),
            Backend::Chunked(a) => a.set(index, value),
        }
    }

    fn swap(&mut self, a: u64, b: u64) {
        match &mut self.backend {
            Backend::Heap(arr) => arr.swap(a, b),
            Backend::Chunked(arr) => arr.swap(a, b),
        }
    }

    fn grow(&mut self, new_len: u64) -> Result<()> {
        if self.factory.policy == StoragePolicy::Auto
            && !self.is_chunked()
            && self.factory.prefers_chunks(new_len)
        {
            return self.migrate_to_chunks(new_len);
        }
        match &mut self.backend {
            Backend::Heap(a) => a.grow(new_len),
            Backend::Chunked(a) => a.grow(new_len),
        }
    }

    fn memory_usage(&self) -> usize {
        match &self.backend {
            Backend::Heap(a) => a.memory_usage(),
            Backend::Chunked(a) => a.memory_usage(),
        }
    }
}

impl std::fmt::Debug for LongArrayStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LongArrayStore")
            .field("len", &self.len())
            .field("chunked", &self.is_chunked())
            .field("policy", &self.factory.policy)
            .finish()
    }
}
