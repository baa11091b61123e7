//! Side store of original text keys, addressed by ordinal.
//!
//! Hash encodings lose the key, so the collision scan and lookups that
//! land in an occupied bucket read the original back from here.
//!
//! Layout:
//! ```text
//! offsets: LongArray, ordinal -> byte offset into data (-1 = no key)
//! data:    [len: u32 LE][utf8 bytes] per stored key, in arrival order
//! ```
//!
//! Keys arrive in batch order, not ordinal order, so the offset table is
//! what restores ordinal addressing.

use crate::array::{LongArray, LongArrayFactory, LongArrayStore};
use crate::error::{IdMapError, Result};

const NO_KEY: i64 = -1;

/// Original text keys by ordinal.
#[derive(Debug)]
pub struct KeyStore {
    offsets: LongArrayStore,
    data: Vec<u8>,
}

impl KeyStore {
    pub fn new(factory: &LongArrayFactory, expected: u64) -> Result<Self> {
        Ok(Self {
            offsets: factory.create(expected, NO_KEY)?,
            data: Vec::new(),
        })
    }

    /// Store `key` for `ordinal`. The offset table grows as needed.
    pub fn put(&mut self, ordinal: u64, key: &str) -> Result<()> {
        let length = stored_len(key)?;
        self.reserve(ordinal, 4 + key.len())?;

        let offset = self.data.len() as i64;
        self.data.extend_from_slice(&length.to_le_bytes());
        self.data.extend_from_slice(key.as_bytes());
        self.offsets.set(ordinal, offset);
        Ok(())
    }

    /// Make room for keys up to `last_ordinal` and `bytes` more key data,
    /// so the following puts cannot fail on allocation.
    pub fn reserve(&mut self, last_ordinal: u64, bytes: usize) -> Result<()> {
        if last_ordinal >= self.offsets.len() {
            self.offsets.grow(grown_len(self.offsets.len(), last_ordinal)?)?;
        }
        self.data
            .try_reserve(bytes)
            .map_err(|e| IdMapError::Allocation(format!("key store data: {}", e)))
    }

    /// Key stored for `ordinal`, if any.
    pub fn get(&self, ordinal: u64) -> Option<&str> {
        if ordinal >= self.offsets.len() {
            return None;
        }
        let offset = self.offsets.get(ordinal);
        if offset == NO_KEY {
            return None;
        }
        let start = offset as usize;
        let length = u32::from_le_bytes(self.data[start..start + 4].try_into().unwrap()) as usize;
        // Bytes came from a valid &str in `put`.
        std::str::from_utf8(&self.data[start + 4..start + 4 + length]).ok()
    }

    /// Release spare capacity once collection is over.
    pub fn shrink_to_fit(&mut self) {
        self.data.shrink_to_fit();
    }

    pub fn memory_usage(&self) -> usize {
        self.offsets.memory_usage() + self.data.capacity()
    }
}

/// Length prefix for `key`; keys longer than `u32::MAX` bytes are refused.
pub(crate) fn stored_len(key: &str) -> Result<u32> {
    u32::try_from(key.len())
        .map_err(|_| IdMapError::Allocation(format!("key of {} bytes too long", key.len())))
}

/// Next length for an array that must hold `index`: at least double.
pub(crate) fn grown_len(current: u64, index: u64) -> Result<u64> {
    let needed = index
        .checked_add(1)
        .ok_or(IdMapError::OrdinalOverflow(index))?;
    Ok(needed.max(current.saturating_mul(2)).max(64))
}
