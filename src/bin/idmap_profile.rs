//! Id mapping profile: build time and RSS at various input sizes.
//!
//! Runs a synthetic string-id import (nodes plus 3x relationships) at
//! 10K, 100K and 1M nodes for each storage policy and prints a table.
//! An optional argument names an `import_config.json` to start from.
//!
//! Run: cargo run --release --bin idmap_profile [config.json]

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use rfdb_idmap::{CollectedIds, DuplicatePolicy, IdImporter, ImportConfig, StoragePolicy};
use sysinfo::{ProcessRefreshKind, RefreshKind, System};

// ── Input generators ───────────────────────────────────────────────────

fn make_nodes(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| format!("FUNCTION:func_{}@src/file_{}.js", i, i % 100))
        .collect()
}

fn make_relationships(nodes: &[String]) -> Vec<(String, String)> {
    let n = nodes.len();
    (0..n * 3)
        .map(|i| (nodes[i % n].clone(), nodes[(i * 7 + 1) % n].clone()))
        .collect()
}

// ── RSS measurement ────────────────────────────────────────────────────

fn get_process_rss() -> Result<u64> {
    let mut sys = System::new_with_specifics(
        RefreshKind::new().with_processes(ProcessRefreshKind::everything()),
    );
    sys.refresh_all();
    let pid = sysinfo::get_current_pid()
        .map_err(|e| anyhow::anyhow!("failed to get PID: {}", e))?;
    Ok(sys.process(pid).map(|p| p.memory()).unwrap_or(0))
}

struct Sample {
    build_ms: u64,
    total_ms: u64,
    mapper_bytes: usize,
    rss_delta: u64,
}

fn measure(base: &ImportConfig, storage: StoragePolicy, node_count: usize) -> Result<Sample> {
    let nodes = make_nodes(node_count);
    let relationships = make_relationships(&nodes);

    // Let OS settle RSS from prior allocations
    std::thread::sleep(std::time::Duration::from_millis(100));
    let baseline = get_process_rss()?;

    let config = ImportConfig {
        storage,
        expected_nodes: node_count as u64,
        duplicates: DuplicatePolicy::Abort,
        ..base.clone()
    };
    let importer = IdImporter::new(config).context("invalid import config")?;
    let mut ids = CollectedIds::new();
    let start = Instant::now();
    let summary = importer
        .run(&nodes, &relationships, &mut ids)
        .context("import run failed")?;
    let total_ms = start.elapsed().as_millis() as u64;

    let after = get_process_rss()?;
    anyhow::ensure!(
        summary.relationships.failed == 0,
        "{} relationships unresolved",
        summary.relationships.failed
    );

    Ok(Sample {
        build_ms: summary.build.duration_ms,
        total_ms,
        mapper_bytes: summary.build.memory_bytes,
        rss_delta: after.saturating_sub(baseline),
    })
}

// ── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let base = match std::env::args().nth(1) {
        Some(path) => ImportConfig::load(Path::new(&path))
            .with_context(|| format!("failed to load {}", path))?,
        None => ImportConfig::auto_tuned(),
    };

    println!("RFDB Id Mapping Profile");
    println!("=======================");
    println!(
        "threads={} sort_threads={} batch_size={} heap_threshold={}",
        base.threads, base.sort_threads, base.batch_size, base.heap_threshold
    );
    println!();
    println!(
        "{:<10} {:<9} {:>10} {:>10} {:>14} {:>14}",
        "Nodes", "Storage", "Build ms", "Total ms", "Mapper (MB)", "RSS (MB)"
    );
    println!("{:-<72}", "");

    for size in [10_000, 100_000, 1_000_000] {
        for storage in [StoragePolicy::Heap, StoragePolicy::Chunked, StoragePolicy::Auto] {
            let sample = measure(&base, storage, size)?;
            let mapper_mb = sample.mapper_bytes as f64 / (1024.0 * 1024.0);
            let rss_mb = sample.rss_delta as f64 / (1024.0 * 1024.0);
            println!(
                "{:<10} {:<9} {:>10} {:>10} {:>14.1} {:>14.1}",
                size,
                format!("{:?}", storage).to_lowercase(),
                sample.build_ms,
                sample.total_ms,
                mapper_mb,
                rss_mb
            );
        }
    }

    println!();
    println!("Note: RSS includes the synthetic inputs and collected ids.");
    Ok(())
}
