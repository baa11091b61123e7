//! Bit set over ordinals with rank queries.
//!
//! Used twice by the general mapper:
//! - **presence**: which ordinals received a key during collection
//!   (rejected records leave holes)
//! - **anchors**: which ordinals are the first occurrence of a distinct
//!   key; `rank(ordinal)` is that key's dense id
//!
//! Layout is a plain `Vec<u64>` of words. `freeze()` builds one prefix
//! popcount per word, after which `rank` is O(1) and the set is read-only.

/// Growable bit set indexed by ordinal.
#[derive(Debug, Default)]
pub struct OrdinalSet {
    words: Vec<u64>,
    /// Bits set in all words before index `i`. Empty until `freeze()`.
    ranks: Vec<u64>,
    count: u64,
}

impl OrdinalSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a set able to hold ordinals `0..capacity` without growing.
    pub fn with_capacity(capacity: u64) -> Self {
        Self {
            words: vec![0u64; capacity.div_ceil(64) as usize],
            ranks: Vec::new(),
            count: 0,
        }
    }

    /// Insert `ordinal`. Returns `false` if it was already present.
    pub fn insert(&mut self, ordinal: u64) -> bool {
        debug_assert!(self.ranks.is_empty(), "insert into frozen ordinal set");
        let word = (ordinal / 64) as usize;
        let bit = 1u64 << (ordinal % 64);
        if word >= self.words.len() {
            let new_len = (word + 1).max(self.words.len() * 2);
            self.words.resize(new_len, 0);
        }
        if self.words[word] & bit != 0 {
            return false;
        }
        self.words[word] |= bit;
        self.count += 1;
        true
    }

    pub fn contains(&self, ordinal: u64) -> bool {
        let word = (ordinal / 64) as usize;
        match self.words.get(word) {
            Some(w) => w & (1u64 << (ordinal % 64)) != 0,
            None => false,
        }
    }

    /// Number of ordinals in the set.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// One past the largest ordinal the word array can currently hold.
    pub fn capacity(&self) -> u64 {
        self.words.len() as u64 * 64
    }

    /// Iterate set ordinals in `range`, ascending.
    pub fn iter_range(&self, range: std::ops::Range<u64>) -> impl Iterator<Item = u64> + '_ {
        let end = range.end.min(self.capacity());
        (range.start..end).filter(move |&o| self.contains(o))
    }

    /// Build rank support. After this the set must not be modified.
    pub fn freeze(&mut self) {
        self.words.shrink_to_fit();
        let mut ranks = Vec::with_capacity(self.words.len());
        let mut total = 0u64;
        for &word in &self.words {
            ranks.push(total);
            total += word.count_ones() as u64;
        }
        self.ranks = ranks;
    }

    /// Number of set ordinals strictly below `ordinal`.
    ///
    /// Requires `freeze()`.
    pub fn rank(&self, ordinal: u64) -> u64 {
        debug_assert!(
            self.ranks.len() == self.words.len(),
            "rank on unfrozen ordinal set"
        );
        let word = (ordinal / 64) as usize;
        if word >= self.words.len() {
            return self.count;
        }
        let below = self.words[word] & ((1u64 << (ordinal % 64)) - 1);
        self.ranks[word] + below.count_ones() as u64
    }

    /// Bytes held by words and rank table.
    pub fn memory_usage(&self) -> usize {
        (self.words.capacity() + self.ranks.capacity()) * 8
    }
}
