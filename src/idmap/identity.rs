//! Identity mapping for pre-numbered inputs.
//!
//! The caller guarantees external ids are already dense, non-negative and
//! unique. No mapping is stored and nothing is checked beyond the key
//! kind: the dense id of `n` is `n`. Only a count of puts is kept, for
//! the build stats.

use crate::error::{IdMapError, Result};
use crate::extract::{KeyKind, TypedKey};
use crate::idmap::{BuildStats, DenseId, IdMapper, MapperState};

/// Mapper holding only a put counter; serving from construction.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityMapper {
    entries: u64,
}

impl IdentityMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dense id for `key`: the integer value itself.
    ///
    /// Negative values wrap; inputs that need validation belong in the
    /// general mapper.
    pub fn assign(&self, key: &TypedKey) -> Result<DenseId> {
        match key {
            TypedKey::Integer(value) => Ok(*value as u64),
            TypedKey::Text(_) => Err(IdMapError::KeyKindMismatch {
                expected: KeyKind::Integer,
                found: KeyKind::Text,
            }),
        }
    }
}

impl IdMapper for IdentityMapper {
    fn key_kind(&self) -> KeyKind {
        KeyKind::Integer
    }

    fn state(&self) -> MapperState {
        MapperState::Serving
    }

    fn put(&mut self, _ordinal: u64, key: &TypedKey) -> Result<()> {
        self.assign(key)?;
        self.entries += 1;
        Ok(())
    }

    fn finalize(&mut self) -> Result<BuildStats> {
        Ok(BuildStats {
            entries: self.entries,
            unique: self.entries,
            ..BuildStats::default()
        })
    }

    fn lookup(&self, key: &TypedKey) -> Result<DenseId> {
        self.assign(key)
    }

    fn memory_usage(&self) -> usize {
        0
    }
}

// ── Tests ──────────────────────────────────────────────────────────
