//! Heap long array: one contiguous allocation.

use crate::array::LongArray;
use crate::error::{IdMapError, Result};

/// Long array backed by a single `Vec<i64>`.
///
/// Fastest access, bounded by what the allocator can hand out in one
/// piece. Growth reserves fallibly so a too-large import reports
/// `Allocation` instead of aborting the process.
#[derive(Debug)]
pub struct HeapLongArray {
    values: Vec<i64>,
    default_value: i64,
}

impl HeapLongArray {
    pub fn new(len: u64, default_value: i64) -> Result<Self> {
        let mut array = Self {
            values: Vec::new(),
            default_value,
        };
        array.grow(len)?;
        Ok(array)
    }

    pub fn default_value(&self) -> i64 {
        self.default_value
    }

    /// Contiguous view of all slots.
    pub fn as_slice(&self) -> &[i64] {
        &self.values
    }
}

impl LongArray for HeapLongArray {
    fn len(&self) -> u64 {
        self.values.len() as u64
    }

    #[inline]
    fn get(&self, index: u64) -> i64 {
        self.values[index as usize]
    }

    #[inline]
    fn set(&mut self, index: u64, value: i64) {
        self.values[index as usize] = value;
    }

    fn swap(&mut self, a: u64, b: u64) {
        self.values.swap(a as usize, b as usize);
    }

    fn grow(&mut self, new_len: u64) -> Result<()> {
        let new_len = usize::try_from(new_len).map_err(|_| {
            IdMapError::Allocation(format!("{} slots exceed the address space", new_len))
        })?;
        if new_len <= self.values.len() {
            return Ok(());
        }
        self.values
            .try_reserve_exact(new_len - self.values.len())
            .map_err(|e| IdMapError::Allocation(format!("heap long array of {} slots: {}", new_len, e)))?;
        self.values.resize(new_len, self.default_value);
        Ok(())
    }

    fn memory_usage(&self) -> usize {
        self.values.capacity() * std::mem::size_of::<i64>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heap_defaults_and_set() {
        let mut array = HeapLongArray::new(4, -1).unwrap();
        assert_eq!(array.len(), 4);
        assert_eq!(array.get(3), -1);

        array.set(2, 99);
        assert_eq!(array.get(2), 99);
        assert_eq!(array.as_slice(), &[-1, -1, 99, -1]);
    }

    #[test]
    fn test_heap_grow_preserves_values() {
        let mut array = HeapLongArray::new(2, 0).unwrap();
        array.set(0, 10);
        array.set(1, 11);

        array.grow(1000).unwrap();
        assert_eq!(array.len(), 1000);
        assert_eq!(array.get(0), 10);
        assert_eq!(array.get(1), 11);
        assert_eq!(array.get(999), 0);

        // Shrinking requests are ignored.
        array.grow(5).unwrap();
        assert_eq!(array.len(), 1000);
    }

    #[test]
    fn test_heap_swap() {
        let mut array = HeapLongArray::new(3, 0).unwrap();
        array.set(0, 1);
        array.set(2, 3);
        array.swap(0, 2);
        assert_eq!(array.get(0), 3);
        assert_eq!(array.get(2), 1);
    }

    #[test]
    fn test_heap_absurd_growth_fails() {
        let mut array = HeapLongArray::new(0, 0).unwrap();
        let err = array.grow(u64::MAX / 4).unwrap_err();
        assert_eq!(err.code(), "INTERNAL_ERROR");
        assert!(err.to_string().contains("Allocation failed"), "unexpected error: {}", err);
        assert_eq!(array.len(), 0);
    }

    #[test]
    #[should_panic]
    fn test_heap_out_of_bounds_panics() {
        let array = HeapLongArray::new(1, 0).unwrap();
        array.get(1);
    }
}
