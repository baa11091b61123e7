//! Parallel sort of collected entries into the tracker.
//!
//! Entries are `(data[ordinal], ordinal)` for every present ordinal. The
//! ordinal space is cut into runs; each run is sorted by
//! `(encoded, ordinal)` on the rayon pool, then the runs are k-way merged
//! into a long array (the tracker) holding ordinals in sorted order.
//!
//! The ordinal tie-break makes the result deterministic for any thread
//! count: within a group of equal encodings, input order is preserved.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::ops::Range;

use rayon::prelude::*;

use crate::array::{LongArray, LongArrayFactory, LongArrayStore};
use crate::error::{IdMapError, Result};
use crate::idmap::ordinal_set::OrdinalSet;

/// Smallest run worth handing to a separate task.
const MIN_RUN_LEN: u64 = 64 * 1024;

/// Runs per sort thread; more runs than threads keeps the pool busy when
/// holes make run sizes uneven.
const RUNS_PER_THREAD: u64 = 4;

/// Sort all present ordinals by `(data[ordinal], ordinal)`.
///
/// `high_water` is one past the largest collected ordinal. Returns the
/// tracker: a long array of `present.count()` ordinals in sorted order.
///
/// Runs are heap vectors whatever the storage policy, so a build needs
/// eight heap bytes per present entry on top of the tracker. They are
/// reserved fallibly; a failed reservation is an `Allocation` error.
pub fn sort_entries(
    data: &dyn LongArray,
    present: &OrdinalSet,
    high_water: u64,
    factory: &LongArrayFactory,
    threads: usize,
) -> Result<LongArrayStore> {
    let count = present.count();
    let mut tracker = factory.create(count, -1)?;
    if count == 0 {
        return Ok(tracker);
    }

    let ranges = plan_runs(high_water, threads);
    let sort_run = |range: &Range<u64>| -> Result<Vec<u64>> {
        let len = present.iter_range(range.clone()).count();
        let mut run = Vec::new();
        run.try_reserve_exact(len).map_err(|e| {
            IdMapError::Allocation(format!("sort run of {} entries: {}", len, e))
        })?;
        run.extend(present.iter_range(range.clone()));
        run.sort_unstable_by_key(|&ordinal| (data.get(ordinal), ordinal));
        Ok(run)
    };

    let runs: Vec<Vec<u64>> = if threads <= 1 || ranges.len() <= 1 {
        ranges.iter().map(sort_run).collect::<Result<Vec<_>>>()?
    } else {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|e| IdMapError::ThreadPool(format!("sort pool: {e}")))?;
        pool.install(|| ranges.par_iter().map(sort_run).collect::<Result<Vec<_>>>())?
    };

    merge_runs(data, runs, &mut tracker);
    Ok(tracker)
}

/// Split `0..high_water` into contiguous ordinal ranges.
fn plan_runs(high_water: u64, threads: usize) -> Vec<Range<u64>> {
    let wanted = threads.max(1) as u64 * RUNS_PER_THREAD;
    let run_count = wanted.min(high_water.div_ceil(MIN_RUN_LEN)).max(1);
    let run_len = high_water.div_ceil(run_count).max(1);
    (0..run_count)
        .map(|i| (i * run_len).min(high_water)..((i + 1) * run_len).min(high_water))
        .filter(|r| !r.is_empty())
        .collect()
}

/// K-way merge of sorted runs into `tracker`.
fn merge_runs(data: &dyn LongArray, runs: Vec<Vec<u64>>, tracker: &mut LongArrayStore) {
    if runs.len() == 1 {
        for (i, &ordinal) in runs[0].iter().enumerate() {
            tracker.set(i as u64, ordinal as i64);
        }
        return;
    }

    let mut heads = vec![0usize; runs.len()];
    let mut heap: BinaryHeap<Reverse<(i64, u64, usize)>> = runs
        .iter()
        .enumerate()
        .filter_map(|(run, ordinals)| {
            ordinals
                .first()
                .map(|&ordinal| Reverse((data.get(ordinal), ordinal, run)))
        })
        .collect();

    let mut out = 0u64;
    while let Some(Reverse((_, ordinal, run))) = heap.pop() {
        tracker.set(out, ordinal as i64);
        out += 1;
        heads[run] += 1;
        if let Some(&next) = runs[run].get(heads[run]) {
            heap.push(Reverse((data.get(next), next, run)));
        }
    }
    debug_assert_eq!(out, tracker.len());
}
