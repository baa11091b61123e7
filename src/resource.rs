//! System resource detection and adaptive tuning for id mapping.
//!
//! Detects available RAM and CPU cores, then computes the `Auto` heap
//! threshold, chunk size and thread counts an import run should use.
//! Stateless: each call to `ResourceManager::auto_tune()` re-probes the
//! system.

use sysinfo::{MemoryRefreshKind, RefreshKind, System};

use crate::array::chunked::DEFAULT_CHUNK_LEN;
use crate::array::store::DEFAULT_HEAP_THRESHOLD;

// ── Constants ───────────────────────────────────────────────────────

const GB: u64 = 1024 * 1024 * 1024;

/// Bytes per long-array slot.
const SLOT_BYTES: u64 = 8;

/// Fraction of available memory a single heap array may take.
const HEAP_FRACTION: f64 = 0.05;

/// Heap threshold floor (1M slots, 8 MB).
const HEAP_THRESHOLD_MIN: u64 = 1024 * 1024;

/// Heap threshold ceiling (128M slots, 1 GB).
const HEAP_THRESHOLD_MAX: u64 = 128 * 1024 * 1024;

/// Chunk length on small hosts (256K slots, 2 MB per chunk).
const SMALL_CHUNK_LEN: usize = 256 * 1024;

/// Records per producer batch.
const BATCH_SIZE_SMALL: usize = 4 * 1024;
const BATCH_SIZE_LARGE: usize = 16 * 1024;

// ── SystemResources ─────────────────────────────────────────────────

/// Snapshot of detected hardware resources.
#[derive(Debug, Clone)]
pub struct SystemResources {
    /// Total physical RAM in bytes.
    pub total_memory_bytes: u64,
    /// Available (re-usable) RAM in bytes.
    pub available_memory_bytes: u64,
    /// Logical CPU count.
    pub cpu_count: usize,
}

impl SystemResources {
    /// Probe the current system for RAM and CPU information.
    pub fn detect() -> Self {
        let mut sys = System::new_with_specifics(
            RefreshKind::new().with_memory(MemoryRefreshKind::everything()),
        );
        sys.refresh_memory();

        let cpu_count = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);

        Self {
            total_memory_bytes: sys.total_memory(),
            available_memory_bytes: sys.available_memory(),
            cpu_count,
        }
    }

    /// Memory pressure indicator (0.0 = no pressure, 1.0 = critical).
    pub fn memory_pressure(&self) -> f64 {
        if self.total_memory_bytes == 0 {
            return 1.0;
        }
        let ratio = self.available_memory_bytes as f64 / self.total_memory_bytes as f64;
        (1.0 - ratio).clamp(0.0, 1.0)
    }
}

// ── TuningProfile ───────────────────────────────────────────────────

/// Adaptive parameters computed from system resources.
#[derive(Debug, Clone)]
pub struct TuningProfile {
    /// Slot count at which `Auto` storage leaves the heap.
    pub heap_threshold: u64,
    /// Slots per chunk for chunked arrays.
    pub chunk_len: usize,
    /// Producer threads for node-id collection.
    pub collect_threads: usize,
    /// Threads for the build sort.
    pub sort_threads: usize,
    /// Records per producer batch.
    pub batch_size: usize,
    /// Memory pressure at detection time.
    pub memory_pressure: f64,
}

impl TuningProfile {
    /// Compute a tuning profile from detected resources.
    ///
    /// Heuristics:
    /// - `heap_threshold`: `clamp(available * 0.05 / 8, 1M, 128M)` slots.
    /// - `chunk_len`: RAM < 4 GB -> 256K, else 1M.
    /// - `collect_threads`: RAM < 4 GB -> `min(cpu, 2)`, else `clamp(cpu, 1, 16)`.
    /// - `sort_threads`: RAM < 4 GB -> 1, else `clamp(cpu, 1, 8)`.
    /// - `batch_size`: RAM < 4 GB -> 4K, else 16K.
    pub fn from_resources(res: &SystemResources) -> Self {
        let total_gb = res.total_memory_bytes as f64 / GB as f64;
        let small = total_gb < 4.0;
        let cpus = res.cpu_count.max(1);

        let raw_slots =
            (res.available_memory_bytes as f64 * HEAP_FRACTION) as u64 / SLOT_BYTES;
        let heap_threshold = raw_slots.clamp(HEAP_THRESHOLD_MIN, HEAP_THRESHOLD_MAX);

        let (chunk_len, collect_threads, sort_threads, batch_size) = if small {
            (SMALL_CHUNK_LEN, cpus.min(2), 1, BATCH_SIZE_SMALL)
        } else {
            (
                DEFAULT_CHUNK_LEN,
                cpus.clamp(1, 16),
                cpus.clamp(1, 8),
                BATCH_SIZE_LARGE,
            )
        };

        Self {
            heap_threshold,
            chunk_len,
            collect_threads,
            sort_threads,
            batch_size,
            memory_pressure: res.memory_pressure(),
        }
    }
}

impl Default for TuningProfile {
    /// Conservative defaults suitable for tests and unknown environments.
    fn default() -> Self {
        Self {
            heap_threshold: DEFAULT_HEAP_THRESHOLD,
            chunk_len: DEFAULT_CHUNK_LEN,
            collect_threads: 1,
            sort_threads: 1,
            batch_size: 10_000,
            memory_pressure: 0.0,
        }
    }
}

// ── ResourceManager ─────────────────────────────────────────────────

/// Stateless utility: detect system resources and compute tuning profile.
pub struct ResourceManager;

impl ResourceManager {
    /// Probe the system and return an adaptive tuning profile.
    pub fn auto_tune() -> TuningProfile {
        let resources = SystemResources::detect();
        let profile = TuningProfile::from_resources(&resources);
        tracing::debug!(
            total_memory = resources.total_memory_bytes,
            cpus = resources.cpu_count,
            memory_pressure = profile.memory_pressure,
            heap_threshold = profile.heap_threshold,
            sort_threads = profile.sort_threads,
            "Auto-tuned id mapping"
        );
        profile
    }
}

// ── Tests ───────────────────────────────────────────────────────────
