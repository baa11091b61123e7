//! Collision scan over the sorted tracker.
//!
//! One linear pass groups adjacent entries with equal encodings. For a
//! group of more than one entry the original keys are compared:
//! - same key again -> duplicate. `Abort` fails the build with both
//!   ordinals, `FirstWins` resolves the repeat to the first occurrence.
//! - different keys -> hash collision. Every distinct key becomes an
//!   anchor and the bucket is kept in `CollisionIndex` for lookups.
//!
//! Entries inside a group are in ordinal order (sort tie-break), so the
//! first entry seen for a key is its first occurrence in the input.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::array::LongArray;
use crate::error::{IdMapError, Result};
use crate::extract::TypedKey;
use crate::idmap::ordinal_set::OrdinalSet;

/// What to do when the same external id is declared more than once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Node declarations must be unique: fail the build.
    #[default]
    Abort,
    /// Repeats are references to the first declaration.
    FirstWins,
}

/// Disambiguation lists for encodings shared by different keys.
#[derive(Debug, Default)]
pub struct CollisionIndex {
    buckets: HashMap<i64, Vec<(TypedKey, u64)>>,
}

impl CollisionIndex {
    /// Keys and anchor ordinals sharing `encoded`, if it collided.
    pub fn bucket(&self, encoded: i64) -> Option<&[(TypedKey, u64)]> {
        self.buckets.get(&encoded).map(Vec::as_slice)
    }

    /// Number of collided encodings.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

/// Result of the collision scan.
#[derive(Debug, Default)]
pub struct ScanOutcome {
    /// First occurrence of every distinct key.
    pub anchors: OrdinalSet,
    pub collisions: CollisionIndex,
    /// Repeated declarations resolved to their first occurrence.
    pub duplicates: u64,
    /// Keys living in collided buckets.
    pub colliding_keys: u64,
}

/// Walk the tracker once, resolving duplicates and collisions.
///
/// `key_of(ordinal, encoded)` returns the original key of an entry; it is
/// only called for groups of two or more.
pub fn scan_collisions<F>(
    tracker: &dyn LongArray,
    data: &dyn LongArray,
    high_water: u64,
    policy: DuplicatePolicy,
    key_of: F,
) -> Result<ScanOutcome>
where
    F: Fn(u64, i64) -> Result<TypedKey>,
{
    let mut outcome = ScanOutcome {
        anchors: OrdinalSet::with_capacity(high_water),
        ..ScanOutcome::default()
    };

    let len = tracker.len();
    let mut start = 0u64;
    while start < len {
        let first = tracker.get(start) as u64;
        let encoded = data.get(first);
        let mut end = start + 1;
        while end < len && data.get(tracker.get(end) as u64) == encoded {
            end += 1;
        }

        if end - start == 1 {
            outcome.anchors.insert(first);
        } else {
            resolve_group(tracker, start..end, encoded, policy, &key_of, &mut outcome)?;
        }
        start = end;
    }

    outcome.anchors.freeze();
    Ok(outcome)
}

fn resolve_group<F>(
    tracker: &dyn LongArray,
    group: std::ops::Range<u64>,
    encoded: i64,
    policy: DuplicatePolicy,
    key_of: &F,
    outcome: &mut ScanOutcome,
) -> Result<()>
where
    F: Fn(u64, i64) -> Result<TypedKey>,
{
    let mut distinct: Vec<(TypedKey, u64)> = Vec::new();
    for pos in group {
        let ordinal = tracker.get(pos) as u64;
        let key = key_of(ordinal, encoded)?;
        match distinct.iter().find(|(k, _)| *k == key) {
            Some(&(_, first)) => match policy {
                DuplicatePolicy::Abort => {
                    return Err(IdMapError::DuplicateId {
                        key: key.to_string(),
                        first,
                        second: ordinal,
                    });
                }
                DuplicatePolicy::FirstWins => outcome.duplicates += 1,
            },
            None => {
                outcome.anchors.insert(ordinal);
                distinct.push((key, ordinal));
            }
        }
    }

    if distinct.len() > 1 {
        tracing::debug!(encoded, keys = distinct.len(), "Encoding collision");
        outcome.colliding_keys += distinct.len() as u64;
        outcome.collisions.buckets.insert(encoded, distinct);
    }
    Ok(())
}

// ── Tests ──────────────────────────────────────────────────────────
