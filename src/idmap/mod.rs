//! Id mapping: external node identifiers to dense node ids.
//!
//! Two strategies implement [`IdMapper`]:
//! - `identity` -- trusts caller integers as already-dense ids
//! - `general` -- collects keys, sorts their encodings, resolves
//!   duplicates and hash collisions, then serves concurrent lookups
//!
//! Supporting pieces:
//! - `encoder` -- key -> i64 encodings
//! - `sort` -- parallel sort of collected entries
//! - `collision` -- duplicate / collision scan over the sorted entries
//! - `key_store` -- original text keys by ordinal
//! - `ordinal_set` -- presence and anchor bit sets with rank

pub mod collision;
pub mod encoder;
pub mod general;
pub mod identity;
pub mod key_store;
pub mod ordinal_set;
pub mod sort;

pub use collision::{CollisionIndex, DuplicatePolicy};
pub use encoder::{Encoder, LongEncoder, StringEncoder};
pub use general::GeneralMapper;
pub use identity::IdentityMapper;

use std::fmt;
use std::ops::Range;

use crate::error::{IdMapError, Result};
use crate::extract::{KeyKind, TypedKey};

/// Dense internal node id, contiguous from 0.
pub type DenseId = u64;

/// Lifecycle of a mapper within one import run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MapperState {
    /// Accepting keys.
    Collecting,
    /// `finalize` is sorting and scanning.
    Building,
    /// Frozen; accepting lookups.
    Serving,
    /// A fatal build error occurred; the mapper is unusable.
    Aborted,
}

impl fmt::Display for MapperState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MapperState::Collecting => "collecting",
            MapperState::Building => "building",
            MapperState::Serving => "serving",
            MapperState::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Summary of a finished build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildStats {
    /// Keys collected.
    pub entries: u64,
    /// Distinct keys, i.e. dense ids handed out.
    pub unique: u64,
    /// Repeated declarations resolved to their first occurrence.
    pub duplicates: u64,
    /// Encodings shared by more than one distinct key.
    pub collision_groups: u64,
    /// Distinct keys living in collided encodings.
    pub colliding_keys: u64,
    /// Sort + scan wall time.
    pub duration_ms: u64,
    /// Bytes held by the frozen mapper.
    pub memory_bytes: usize,
}

/// Keys for a private, pre-assigned range of ordinals.
///
/// Filled by one producer in strictly increasing ordinal order, then
/// handed to [`IdMapper::put_batch`]. Ordinals the producer rejected are
/// simply never pushed.
#[derive(Debug, Clone)]
pub struct KeyBatch {
    range: Range<u64>,
    entries: Vec<(u64, TypedKey)>,
}

/// Upper bound on the slots a new batch reserves up front.
const BATCH_PREALLOC_MAX: u64 = 64 * 1024;

impl KeyBatch {
    /// Empty batch over `range`. A reversed range holds no ordinal.
    pub fn new(range: Range<u64>) -> Self {
        let capacity = range
            .end
            .saturating_sub(range.start)
            .min(BATCH_PREALLOC_MAX) as usize;
        Self {
            range,
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Append the key of `ordinal`.
    pub fn push(&mut self, ordinal: u64, key: TypedKey) -> Result<()> {
        if !self.range.contains(&ordinal) {
            return Err(IdMapError::OrdinalOutOfRange {
                ordinal,
                start: self.range.start,
                end: self.range.end,
            });
        }
        if let Some(&(previous, _)) = self.entries.last() {
            if ordinal <= previous {
                return Err(IdMapError::OrdinalOutOfOrder { ordinal, previous });
            }
        }
        self.entries.push((ordinal, key));
        Ok(())
    }

    pub fn range(&self) -> Range<u64> {
        self.range.clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[(u64, TypedKey)] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<(u64, TypedKey)> {
        self.entries
    }
}

/// Maps external node ids to dense ids for one import run.
///
/// `Send + Sync`: once serving, a mapper is shared by reference between
/// any number of lookup threads.
pub trait IdMapper: Send + Sync {
    /// Kind of key accepted by `put` and `lookup`.
    fn key_kind(&self) -> KeyKind;

    fn state(&self) -> MapperState;

    /// Record the key of the node at `ordinal`.
    fn put(&mut self, ordinal: u64, key: &TypedKey) -> Result<()>;

    /// Record a producer's batch.
    fn put_batch(&mut self, batch: KeyBatch) -> Result<()> {
        for (ordinal, key) in batch.into_entries() {
            self.put(ordinal, &key)?;
        }
        Ok(())
    }

    /// End collection and build the lookup structure.
    fn finalize(&mut self) -> Result<BuildStats>;

    /// Dense id of `key`.
    fn lookup(&self, key: &TypedKey) -> Result<DenseId>;

    /// Bytes currently held.
    fn memory_usage(&self) -> usize;
}

// ── Tests ──────────────────────────────────────────────────────────
