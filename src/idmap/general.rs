//! General mapping for arbitrary external ids.
//!
//! Collection writes `data[ordinal] = encode(key)` (and, for lossy
//! encoders, the original key into a side `KeyStore`). `finalize` sorts
//! the present ordinals by `(encoded, ordinal)`, scans the sorted tracker
//! for duplicates and collisions, then freezes. Lookups binary search the
//! tracker; a frozen mapper is immutable and is read without locks.
//!
//! Dense ids are ranks of anchors (first occurrence of each distinct key)
//! in ordinal order, so they are contiguous even when records were
//! rejected or repeated.

use std::fmt;
use std::time::Instant;

use rayon::prelude::*;

use crate::array::{LongArray, LongArrayFactory, LongArrayStore};
use crate::error::{IdMapError, Result};
use crate::extract::{KeyKind, TypedKey};
use crate::idmap::collision::{scan_collisions, CollisionIndex, DuplicatePolicy};
use crate::idmap::encoder::{encoder_for, Encoder};
use crate::idmap::key_store::{grown_len, stored_len, KeyStore};
use crate::idmap::ordinal_set::OrdinalSet;
use crate::idmap::sort::sort_entries;
use crate::idmap::{BuildStats, DenseId, IdMapper, KeyBatch, MapperState};

/// Batches below this size are encoded on the calling thread.
const PARALLEL_ENCODE_MIN: usize = 1024;

/// Sort-based mapper with duplicate and collision detection.
pub struct GeneralMapper {
    kind: KeyKind,
    encoder: Box<dyn Encoder>,
    factory: LongArrayFactory,
    policy: DuplicatePolicy,
    sort_threads: usize,
    state: MapperState,

    // Collection
    data: LongArrayStore,
    present: OrdinalSet,
    keys: Option<KeyStore>,
    high_water: u64,

    // Frozen
    tracker: LongArrayStore,
    anchors: OrdinalSet,
    collisions: CollisionIndex,
    stats: BuildStats,
}

impl GeneralMapper {
    /// Mapper for `kind` with its default encoder.
    pub fn new(kind: KeyKind, factory: LongArrayFactory, expected: u64) -> Result<Self> {
        Self::with_encoder(encoder_for(kind), factory, expected)
    }

    /// Mapper with a custom encoder. Lossy encoders get a side key store.
    pub fn with_encoder(
        encoder: Box<dyn Encoder>,
        factory: LongArrayFactory,
        expected: u64,
    ) -> Result<Self> {
        let keys = if encoder.is_lossless() {
            None
        } else {
            Some(KeyStore::new(&factory, expected)?)
        };
        Ok(Self {
            kind: encoder.kind(),
            data: factory.create(expected, 0)?,
            tracker: factory.create(0, -1)?,
            encoder,
            factory,
            policy: DuplicatePolicy::default(),
            sort_threads: 1,
            state: MapperState::Collecting,
            present: OrdinalSet::with_capacity(expected),
            keys,
            high_water: 0,
            anchors: OrdinalSet::new(),
            collisions: CollisionIndex::default(),
            stats: BuildStats::default(),
        })
    }

    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_sort_threads(mut self, threads: usize) -> Self {
        self.sort_threads = threads.max(1);
        self
    }

    pub fn duplicate_policy(&self) -> DuplicatePolicy {
        self.policy
    }

    /// Stats of the last successful build.
    pub fn stats(&self) -> &BuildStats {
        &self.stats
    }

    /// Number of distinct keys once serving.
    pub fn unique_count(&self) -> u64 {
        self.anchors.count()
    }

    /// Keys collected so far (or frozen).
    pub fn len(&self) -> u64 {
        match self.state {
            MapperState::Collecting | MapperState::Building => self.present.count(),
            _ => self.tracker.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn collisions(&self) -> &CollisionIndex {
        &self.collisions
    }

    fn expect_state(&self, expected: MapperState, operation: &'static str) -> Result<()> {
        if self.state != expected {
            return Err(IdMapError::InvalidState {
                operation,
                state: self.state,
            });
        }
        Ok(())
    }

    fn check_kind(&self, key: &TypedKey) -> Result<()> {
        if key.kind() != self.kind {
            return Err(IdMapError::KeyKindMismatch {
                expected: self.kind,
                found: key.kind(),
            });
        }
        Ok(())
    }

    fn ensure_capacity(&mut self, ordinal: u64) -> Result<()> {
        if ordinal >= self.data.len() {
            self.data.grow(grown_len(self.data.len(), ordinal)?)?;
        }
        Ok(())
    }

    /// Checks `put` runs before touching any state.
    fn check_put(&self, ordinal: u64, key: &TypedKey) -> Result<()> {
        self.check_kind(key)?;
        if ordinal == u64::MAX {
            return Err(IdMapError::OrdinalOverflow(ordinal));
        }
        if self.present.contains(ordinal) {
            return Err(IdMapError::OrdinalReused(ordinal));
        }
        Ok(())
    }

    fn write(&mut self, ordinal: u64, encoded: i64, key: &TypedKey) -> Result<()> {
        self.ensure_capacity(ordinal)?;
        if let Some(keys) = self.keys.as_mut() {
            match key {
                TypedKey::Text(text) => keys.put(ordinal, text)?,
                TypedKey::Integer(value) => keys.put(ordinal, &value.to_string())?,
            }
        }
        self.data.set(ordinal, encoded);
        self.present.insert(ordinal);
        self.high_water = self.high_water.max(ordinal + 1);
        Ok(())
    }

    /// Original key of a collected entry.
    fn true_key(&self, ordinal: u64, encoded: i64) -> Result<TypedKey> {
        if let Some(key) = self.encoder.decode(encoded) {
            return Ok(key);
        }
        let stored = self
            .keys
            .as_ref()
            .and_then(|keys| keys.get(ordinal))
            .ok_or_else(|| IdMapError::Internal(format!("no stored key for ordinal {}", ordinal)))?;
        match self.kind {
            KeyKind::Text => Ok(TypedKey::Text(stored.to_string())),
            KeyKind::Integer => stored
                .parse::<i64>()
                .map(TypedKey::Integer)
                .map_err(|_| IdMapError::Internal(format!("corrupt stored key at ordinal {}", ordinal))),
        }
    }

    /// Whether the entry at `ordinal` holds `key`, given equal encodings.
    fn key_matches(&self, ordinal: u64, key: &TypedKey) -> bool {
        let Some(keys) = self.keys.as_ref() else {
            return true;
        };
        match (keys.get(ordinal), key) {
            (Some(stored), TypedKey::Text(text)) => stored == text,
            (Some(stored), TypedKey::Integer(value)) => stored.parse::<i64>().ok() == Some(*value),
            (None, _) => false,
        }
    }

    /// First tracker position whose encoding is >= `encoded`.
    fn lower_bound(&self, encoded: i64) -> u64 {
        let mut lo = 0u64;
        let mut hi = self.tracker.len();
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.data.get(self.tracker.get(mid) as u64) < encoded {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        lo
    }

    fn build(&mut self) -> Result<()> {
        let tracker = sort_entries(
            &self.data,
            &self.present,
            self.high_water,
            &self.factory,
            self.sort_threads,
        )?;
        let outcome = scan_collisions(
            &tracker,
            &self.data,
            self.high_water,
            self.policy,
            |ordinal, encoded| self.true_key(ordinal, encoded),
        )?;

        self.stats = BuildStats {
            entries: tracker.len(),
            unique: outcome.anchors.count(),
            duplicates: outcome.duplicates,
            collision_groups: outcome.collisions.len() as u64,
            colliding_keys: outcome.colliding_keys,
            ..BuildStats::default()
        };
        self.tracker = tracker;
        self.anchors = outcome.anchors;
        self.collisions = outcome.collisions;
        self.present = OrdinalSet::new();
        if let Some(keys) = self.keys.as_mut() {
            keys.shrink_to_fit();
        }
        Ok(())
    }
}

impl IdMapper for GeneralMapper {
    fn key_kind(&self) -> KeyKind {
        self.kind
    }

    fn state(&self) -> MapperState {
        self.state
    }

    fn put(&mut self, ordinal: u64, key: &TypedKey) -> Result<()> {
        self.expect_state(MapperState::Collecting, "put")?;
        self.check_put(ordinal, key)?;
        let encoded = self.encoder.encode(key);
        self.write(ordinal, encoded, key)
    }

    /// All or nothing: a batch that fails leaves no entry behind.
    fn put_batch(&mut self, batch: KeyBatch) -> Result<()> {
        self.expect_state(MapperState::Collecting, "put")?;
        let entries = batch.into_entries();
        let Some(&(last, _)) = entries.last() else {
            return Ok(());
        };
        for (ordinal, key) in &entries {
            self.check_put(*ordinal, key)?;
        }

        // Ordinals are increasing within a batch: one grow covers all.
        self.ensure_capacity(last)?;
        if let Some(keys) = self.keys.as_mut() {
            let mut bytes = 0usize;
            for (_, key) in &entries {
                let len = match key {
                    TypedKey::Text(text) => stored_len(text)? as usize,
                    TypedKey::Integer(value) => value.to_string().len(),
                };
                bytes = bytes.saturating_add(4 + len);
            }
            keys.reserve(last, bytes)?;
        }

        let encoder = &self.encoder;
        let encoded: Vec<i64> = if entries.len() < PARALLEL_ENCODE_MIN {
            entries.iter().map(|(_, key)| encoder.encode(key)).collect()
        } else {
            entries
                .par_iter()
                .with_min_len(PARALLEL_ENCODE_MIN)
                .map(|(_, key)| encoder.encode(key))
                .collect()
        };

        for ((ordinal, key), encoded) in entries.iter().zip(encoded) {
            self.write(*ordinal, encoded, key)?;
        }
        Ok(())
    }

    fn finalize(&mut self) -> Result<BuildStats> {
        self.expect_state(MapperState::Collecting, "finalize")?;
        self.state = MapperState::Building;
        let start = Instant::now();

        if let Err(e) = self.build() {
            self.state = MapperState::Aborted;
            tracing::error!(error = %e, code = e.code(), "Id mapping build aborted");
            return Err(e);
        }

        self.stats.duration_ms = start.elapsed().as_millis() as u64;
        self.stats.memory_bytes = self.memory_usage();
        self.state = MapperState::Serving;

        if self.stats.duplicates > 0 {
            tracing::warn!(
                duplicates = self.stats.duplicates,
                "Duplicate ids resolved to their first occurrence"
            );
        }
        tracing::info!(
            entries = self.stats.entries,
            unique = self.stats.unique,
            collision_groups = self.stats.collision_groups,
            duration_ms = self.stats.duration_ms,
            memory_bytes = self.stats.memory_bytes,
            "Id mapping built"
        );
        Ok(self.stats.clone())
    }

    fn lookup(&self, key: &TypedKey) -> Result<DenseId> {
        self.expect_state(MapperState::Serving, "lookup")?;
        self.check_kind(key)?;
        let not_found = || IdMapError::NotFound {
            key: key.to_string(),
        };

        let encoded = self.encoder.encode(key);
        let pos = self.lower_bound(encoded);
        if pos >= self.tracker.len() {
            return Err(not_found());
        }
        let first = self.tracker.get(pos) as u64;
        if self.data.get(first) != encoded {
            return Err(not_found());
        }

        let anchor = match self.collisions.bucket(encoded) {
            Some(bucket) => bucket
                .iter()
                .find(|(candidate, _)| candidate == key)
                .map(|&(_, anchor)| anchor)
                .ok_or_else(not_found)?,
            None if self.key_matches(first, key) => first,
            None => return Err(not_found()),
        };
        Ok(self.anchors.rank(anchor))
    }

    fn memory_usage(&self) -> usize {
        self.data.memory_usage()
            + self.tracker.memory_usage()
            + self.present.memory_usage()
            + self.anchors.memory_usage()
            + self.keys.as_ref().map_or(0, KeyStore::memory_usage)
    }
}

impl fmt::Debug for GeneralMapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneralMapper")
            .field("kind", &self.kind)
            .field("state", &self.state)
            .field("policy", &self.policy)
            .field("len", &self.len())
            .field("collisions", &self.collisions.len())
            .finish()
    }
}

// ── Tests ──────────────────────────────────────────────────────────
