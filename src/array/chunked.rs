//! Chunked long array: fixed-size anonymous memory mappings.
//!
//! Each chunk is an anonymous `MmapMut` of `chunk_len * 8` bytes, so the
//! array lives outside the allocator heap and is bounded only by what the
//! OS will map. The kernel commits pages on first touch, so a chunk costs
//! nothing until it is written.
//!
//! Slots are stored XOR-ed with the default value: an untouched (zeroed)
//! page reads back as the default without an initial fill pass.

use memmap2::MmapMut;

use crate::array::LongArray;
use crate::error::{IdMapError, Result};

/// Default slots per chunk (8 MB per chunk).
pub const DEFAULT_CHUNK_LEN: usize = 1 << 20;

/// Read i64 from byte slice at offset (little-endian).
#[inline]
fn read_i64_at(data: &[u8], offset: usize) -> i64 {
    i64::from_le_bytes(data[offset..offset + 8].try_into().unwrap())
}

/// Write i64 into byte slice at offset (little-endian).
#[inline]
fn write_i64_at(data: &mut [u8], offset: usize, value: i64) {
    data[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
}

/// Long array split across fixed-size mmap chunks.
pub struct ChunkedLongArray {
    chunks: Vec<MmapMut>,
    chunk_len: usize,
    len: u64,
    default_value: i64,
}

impl ChunkedLongArray {
    pub fn new(len: u64, default_value: i64) -> Result<Self> {
        Self::with_chunk_len(len, default_value, DEFAULT_CHUNK_LEN)
    }

    /// Create with an explicit chunk size in slots.
    ///
    /// # Panics
    ///
    /// Panics if `chunk_len` is 0.
    pub fn with_chunk_len(len: u64, default_value: i64, chunk_len: usize) -> Result<Self> {
        assert!(chunk_len > 0, "chunk_len must be > 0");
        let mut array = Self {
            chunks: Vec::new(),
            chunk_len,
            len: 0,
            default_value,
        };
        array.grow(len)?;
        Ok(array)
    }

    pub fn chunk_len(&self) -> usize {
        self.chunk_len
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn default_value(&self) -> i64 {
        self.default_value
    }

    #[inline]
    fn locate(&self, index: u64) -> (usize, usize) {
        assert!(
            index < self.len,
            "index {} out of bounds for chunked long array of length {}",
            index,
            self.len
        );
        let chunk = (index / self.chunk_len as u64) as usize;
        let offset = (index % self.chunk_len as u64) as usize * 8;
        (chunk, offset)
    }
}

impl LongArray for ChunkedLongArray {
    fn len(&self) -> u64 {
        self.len
    }

    #[inline]
    fn get(&self, index: u64) -> i64 {
        let (chunk, offset) = self.locate(index);
        read_i64_at(&self.chunks[chunk], offset) ^ self.default_value
    }

    #[inline]
    fn set(&mut self, index: u64, value: i64) {
        let (chunk, offset) = self.locate(index);
        write_i64_at(&mut self.chunks[chunk], offset, value ^ self.default_value);
    }

    fn grow(&mut self, new_len: u64) -> Result<()> {
        if new_len <= self.len {
            return Ok(());
        }
        let chunk_bytes = self
            .chunk_len
            .checked_mul(8)
            .ok_or_else(|| IdMapError::Allocation("chunk size overflows".into()))?;
        let needed = usize::try_from(new_len.div_ceil(self.chunk_len as u64)).map_err(|_| {
            IdMapError::Allocation(format!("{} slots exceed the address space", new_len))
        })?;
        self.chunks
            .try_reserve(needed - self.chunks.len())
            .map_err(|e| IdMapError::Allocation(format!("chunk table of {} chunks: {}", needed, e)))?;
        while self.chunks.len() < needed {
            let chunk = MmapMut::map_anon(chunk_bytes).map_err(|e| {
                IdMapError::Allocation(format!(
                    "chunk {} of {} bytes: {}",
                    self.chunks.len(),
                    chunk_bytes,
                    e
                ))
            })?;
            self.chunks.push(chunk);
        }
        self.len = new_len;
        Ok(())
    }

    fn memory_usage(&self) -> usize {
        self.chunks.len() * self.chunk_len * 8
    }
}

impl std::fmt::Debug for ChunkedLongArray {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkedLongArray")
            .field("len", &self.len)
            .field("chunk_len", &self.chunk_len)
            .field("chunks", &self.chunks.len())
            .field("default_value", &self.default_value)
            .finish()
    }
}
