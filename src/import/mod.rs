//! Import pipeline around the id mapper.
//!
//! One run goes through three phases:
//! 1. `collect_nodes` -- producer threads extract node-id tokens into
//!    `KeyBatch`es over pre-reserved ordinal ranges; a single collector
//!    (the calling thread) feeds them to the mapper.
//! 2. `IdMapper::finalize` -- the build barrier.
//! 3. `emit_node_ids` / `resolve_relationships` -- parallel lookups over
//!    the frozen mapper, delivered in ordinal order to a `DenseIdConsumer`.
//!
//! Malformed tokens are recoverable: they are reported per record and the
//! run goes on. Mapper errors (duplicates, state violations) stop it.

pub mod consumer;
pub mod cursor;

pub use consumer::{CollectedIds, DenseIdConsumer, RejectedRecord};
pub use cursor::OrdinalCursor;

use std::ops::Range;
use std::time::Instant;

use rayon::prelude::*;

use crate::config::ImportConfig;
use crate::error::{IdMapError, Result};
use crate::extract::KeyKind;
use crate::idmap::{BuildStats, DenseId, IdMapper, KeyBatch};

/// Outcome of node-id collection.
#[derive(Debug)]
pub struct CollectReport {
    /// Ordinals reserved for the node records.
    pub ordinals: Range<u64>,
    /// Keys handed to the mapper.
    pub collected: u64,
    /// Records whose token could not be extracted.
    pub rejected: Vec<RejectedRecord>,
}

/// Outcome of an emission or resolution pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveReport {
    pub records: u64,
    pub resolved: u64,
    pub failed: u64,
}

/// Everything a full run produced.
#[derive(Debug)]
pub struct ImportSummary {
    pub collect: CollectReport,
    pub build: BuildStats,
    pub nodes: ResolveReport,
    pub relationships: ResolveReport,
}

/// Drives a mapper through one import run.
pub struct IdImporter {
    config: ImportConfig,
    cursor: OrdinalCursor,
    pool: Option<rayon::ThreadPool>,
}

impl IdImporter {
    pub fn new(config: ImportConfig) -> Result<Self> {
        Self::with_cursor(config, OrdinalCursor::new())
    }

    /// Importer sharing an existing ordinal cursor.
    pub fn with_cursor(config: ImportConfig, cursor: OrdinalCursor) -> Result<Self> {
        config.validate()?;
        let pool = if config.threads > 1 {
            Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(config.threads)
                    .build()
                    .map_err(|e| IdMapError::ThreadPool(format!("lookup pool: {e}")))?,
            )
        } else {
            None
        };
        Ok(Self {
            config,
            cursor,
            pool,
        })
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    pub fn cursor(&self) -> &OrdinalCursor {
        &self.cursor
    }

    /// Full run: collect node ids, build, emit node ids, resolve
    /// relationships.
    pub fn run<N, R>(
        &self,
        nodes: &[N],
        relationships: &[(R, R)],
        consumer: &mut dyn DenseIdConsumer,
    ) -> Result<ImportSummary>
    where
        N: AsRef<str> + Sync,
        R: AsRef<str> + Sync,
    {
        let mut mapper = self.config.create_mapper()?;
        let collect = self.collect_nodes(mapper.as_mut(), nodes)?;
        let build = mapper.finalize()?;
        let nodes = self.emit_node_ids(mapper.as_ref(), nodes, collect.ordinals.start, consumer)?;
        let relationships = self.resolve_relationships(mapper.as_ref(), relationships, consumer)?;
        Ok(ImportSummary {
            collect,
            build,
            nodes,
            relationships,
        })
    }

    /// Extract every node-id token and hand the keys to `mapper`.
    pub fn collect_nodes<S>(&self, mapper: &mut dyn IdMapper, tokens: &[S]) -> Result<CollectReport>
    where
        S: AsRef<str> + Sync,
    {
        let start = Instant::now();
        let kind = mapper.key_kind();
        let ordinals = self.cursor.reserve(tokens.len() as u64);
        let base = ordinals.start;
        let batch_size = self.config.batch_size;

        let mut collected = 0u64;
        let mut rejected = Vec::new();
        let mut accept = |(batch, bad): Extracted| -> Result<()> {
            collected += batch.len() as u64;
            rejected.extend(bad);
            mapper.put_batch(batch)
        };

        if self.config.threads <= 1 {
            for chunk_start in (0..tokens.len()).step_by(batch_size) {
                let chunk = chunk_start..(chunk_start + batch_size).min(tokens.len());
                accept(extract_batch(kind, tokens, chunk, base)?)?;
            }
        } else {
            let threads = self.config.threads;
            std::thread::scope(|s| -> Result<()> {
                let (job_tx, job_rx) = crossbeam_channel::bounded::<Range<usize>>(threads * 2);
                let (out_tx, out_rx) = crossbeam_channel::bounded::<Result<Extracted>>(threads * 2);

                s.spawn(move || {
                    for chunk_start in (0..tokens.len()).step_by(batch_size) {
                        let chunk = chunk_start..(chunk_start + batch_size).min(tokens.len());
                        if job_tx.send(chunk).is_err() {
                            break;
                        }
                    }
                });
                for _ in 0..threads {
                    let job_rx = job_rx.clone();
                    let out_tx = out_tx.clone();
                    s.spawn(move || {
                        for chunk in job_rx.iter() {
                            if out_tx.send(extract_batch(kind, tokens, chunk, base)).is_err() {
                                break;
                            }
                        }
                    });
                }
                drop(job_rx);
                drop(out_tx);

                // Returning early drops `out_rx`, which stops the producers.
                for extracted in out_rx.iter() {
                    accept(extracted?)?;
                }
                Ok(())
            })?;
        }

        rejected.sort_by_key(|r: &RejectedRecord| r.ordinal);
        if let Some(first) = rejected.first() {
            tracing::warn!(
                rejected = rejected.len(),
                first_ordinal = first.ordinal,
                first_error = %first.error,
                "Rejected node records"
            );
        }
        tracing::info!(
            records = tokens.len(),
            collected,
            rejected = rejected.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Node ids collected"
        );
        Ok(CollectReport {
            ordinals,
            collected,
            rejected,
        })
    }

    /// Dense id of every node record, in ordinal order.
    ///
    /// `first_ordinal` is the start of the range `collect_nodes` reserved
    /// for the same tokens.
    pub fn emit_node_ids<S>(
        &self,
        mapper: &dyn IdMapper,
        tokens: &[S],
        first_ordinal: u64,
        consumer: &mut dyn DenseIdConsumer,
    ) -> Result<ResolveReport>
    where
        S: AsRef<str> + Sync,
    {
        let kind = mapper.key_kind();
        let mut report = ResolveReport::default();
        for (chunk_index, chunk) in tokens.chunks(self.config.batch_size).enumerate() {
            let chunk_base = first_ordinal + (chunk_index * self.config.batch_size) as u64;
            let results = self.map_chunk(chunk, |i, token| {
                let ordinal = chunk_base + i as u64;
                let key = kind.extract(token.as_ref(), ordinal)?;
                mapper.lookup(&key)
            });
            for (i, result) in results.into_iter().enumerate() {
                report.record(result.is_ok());
                consumer.node(chunk_base + i as u64, result);
            }
        }
        Ok(report)
    }

    /// Dense ids of both endpoints of every relationship, in order.
    ///
    /// Relationship ordinals are positions in `pairs`.
    pub fn resolve_relationships<S>(
        &self,
        mapper: &dyn IdMapper,
        pairs: &[(S, S)],
        consumer: &mut dyn DenseIdConsumer,
    ) -> Result<ResolveReport>
    where
        S: AsRef<str> + Sync,
    {
        let start = Instant::now();
        let kind = mapper.key_kind();
        let mut report = ResolveReport::default();
        for (chunk_index, chunk) in pairs.chunks(self.config.batch_size).enumerate() {
            let chunk_base = (chunk_index * self.config.batch_size) as u64;
            let results = self.map_chunk(chunk, |i, (from, to)| {
                let ordinal = chunk_base + i as u64;
                let from = resolve_endpoint(mapper, kind, from.as_ref(), ordinal)?;
                let to = resolve_endpoint(mapper, kind, to.as_ref(), ordinal)?;
                Ok((from, to))
            });
            for (i, result) in results.into_iter().enumerate() {
                report.record(result.is_ok());
                consumer.relationship(chunk_base + i as u64, result);
            }
        }

        if report.failed > 0 {
            tracing::warn!(failed = report.failed, "Unresolved relationship records");
        }
        tracing::info!(
            records = report.records,
            resolved = report.resolved,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Relationships resolved"
        );
        Ok(report)
    }

    /// Map `f(index, item)` over a chunk, on the pool when there is one.
    fn map_chunk<T, U, F>(&self, chunk: &[T], f: F) -> Vec<U>
    where
        T: Sync,
        U: Send,
        F: Fn(usize, &T) -> U + Sync + Send,
    {
        match &self.pool {
            Some(pool) => pool.install(|| {
                chunk
                    .par_iter()
                    .enumerate()
                    .map(|(i, item)| f(i, item))
                    .collect()
            }),
            None => chunk.iter().enumerate().map(|(i, item)| f(i, item)).collect(),
        }
    }
}

impl ResolveReport {
    fn record(&mut self, ok: bool) {
        self.records += 1;
        if ok {
            self.resolved += 1;
        } else {
            self.failed += 1;
        }
    }
}

type Extracted = (KeyBatch, Vec<RejectedRecord>);

/// Extract `tokens[chunk]` into a batch at ordinals `base + index`.
fn extract_batch<S: AsRef<str>>(
    kind: KeyKind,
    tokens: &[S],
    chunk: Range<usize>,
    base: u64,
) -> Result<Extracted> {
    let ordinals = base + chunk.start as u64..base + chunk.end as u64;
    let mut batch = KeyBatch::new(ordinals.clone());
    let mut rejected = Vec::new();
    for (token, ordinal) in tokens[chunk].iter().zip(ordinals) {
        match kind.extract(token.as_ref(), ordinal) {
            Ok(key) => batch.push(ordinal, key)?,
            Err(error) => rejected.push(RejectedRecord { ordinal, error }),
        }
    }
    Ok((batch, rejected))
}

fn resolve_endpoint(
    mapper: &dyn IdMapper,
    kind: KeyKind,
    token: &str,
    ordinal: u64,
) -> Result<DenseId> {
    let key = kind.extract(token, ordinal)?;
    mapper.lookup(&key)
}

// ── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IdType;
    use crate::extract::TypedKey;
    use crate::idmap::{DuplicatePolicy, MapperState};

    fn config(id_type: IdType, threads: usize) -> ImportConfig {
        ImportConfig {
            id_type,
            threads,
            batch_size: 3,
            duplicates: DuplicatePolicy::FirstWins,
            ..ImportConfig::default()
        }
    }

    #[test]
    fn test_run_string_ids() {
        let importer = IdImporter::new(config(IdType::String, 1)).unwrap();
        let nodes = ["alice", "bob", "alice", "carol"];
        let rels = [("alice", "carol"), ("bob", "dave")];
        let mut ids = CollectedIds::new();

        let summary = importer.run(&nodes, &rels, &mut ids).unwrap();

        assert_eq!(summary.build.unique, 3);
        assert_eq!(ids.nodes, vec![(0, 0), (1, 1), (2, 0), (3, 2)]);
        assert_eq!(ids.relationships, vec![(0, 0, 2)]);
        assert_eq!(ids.rejected_relationships.len(), 1);
        assert_eq!(ids.rejected_relationships[0].ordinal, 1);
        assert_eq!(ids.rejected_relationships[0].error.code(), "NOT_FOUND");
        assert_eq!(summary.relationships.failed, 1);
    }

    #[test]
    fn test_malformed_tokens_rejected_not_fatal() {
        let importer = IdImporter::new(config(IdType::Integer, 3)).unwrap();
        let nodes = ["10", "x", "30", " 40", "50", "60", "70"];
        let mut mapper = importer.config().create_mapper().unwrap();

        let report = importer.collect_nodes(mapper.as_mut(), &nodes).unwrap();
        assert_eq!(report.collected, 5);
        let rejected: Vec<u64> = report.rejected.iter().map(|r| r.ordinal).collect();
        assert_eq!(rejected, vec![1, 3]);
        assert_eq!(report.rejected[0].error.code(), "MALFORMED_VALUE");

        mapper.finalize().unwrap();
        assert_eq!(mapper.lookup(&TypedKey::Integer(30)).unwrap(), 1);
        assert_eq!(mapper.lookup(&TypedKey::Integer(70)).unwrap(), 4);
    }

    #[test]
    fn test_parallel_collection_matches_sequential() {
        let nodes: Vec<String> = (0..10_000).map(|i| format!("n{}", i % 7_000)).collect();
        let rels: Vec<(String, String)> = (0..500)
            .map(|i| (format!("n{}", i), format!("n{}", 6_999 - i)))
            .collect();

        let mut sequential = CollectedIds::new();
        IdImporter::new(config(IdType::String, 1))
            .unwrap()
            .run(&nodes, &rels, &mut sequential)
            .unwrap();
        let mut parallel = CollectedIds::new();
        IdImporter::new(config(IdType::String, 4))
            .unwrap()
            .run(&nodes, &rels, &mut parallel)
            .unwrap();

        assert_eq!(sequential.nodes, parallel.nodes);
        assert_eq!(sequential.relationships, parallel.relationships);
        assert_eq!(parallel.node_id(7_000), Some(0));
    }

    #[test]
    fn test_duplicate_abort_stops_run() {
        let cfg = ImportConfig {
            duplicates: DuplicatePolicy::Abort,
            ..config(IdType::String, 2)
        };
        let importer = IdImporter::new(cfg).unwrap();
        let mut ids = CollectedIds::new();
        let err = importer
            .run(&["a", "b", "a"], &[("a", "b")], &mut ids)
            .unwrap_err();
        assert_eq!(err.code(), "DUPLICATE_ID");
        assert!(ids.nodes.is_empty());
    }

    #[test]
    fn test_actual_ids_pass_through() {
        let importer = IdImporter::new(config(IdType::Actual, 2)).unwrap();
        let mut ids = CollectedIds::new();
        importer
            .run(&["0", "1", "5", "5"], &[("5", "0")], &mut ids)
            .unwrap();
        assert_eq!(ids.nodes, vec![(0, 0), (1, 1), (2, 5), (3, 5)]);
        assert_eq!(ids.relationships, vec![(0, 5, 0)]);
    }

    #[test]
    fn test_shared_cursor_offsets_ordinals() {
        let cursor = OrdinalCursor::starting_at(100);
        let importer = IdImporter::with_cursor(config(IdType::String, 1), cursor).unwrap();
        let mut mapper = importer.config().create_mapper().unwrap();

        let report = importer.collect_nodes(mapper.as_mut(), &["p", "q"]).unwrap();
        assert_eq!(report.ordinals, 100..102);
        assert_eq!(importer.cursor().position(), 102);

        mapper.finalize().unwrap();
        assert_eq!(mapper.state(), MapperState::Serving);
        let mut ids = CollectedIds::new();
        importer
            .emit_node_ids(mapper.as_ref(), &["p", "q"], report.ordinals.start, &mut ids)
            .unwrap();
        assert_eq!(ids.nodes, vec![(100, 0), (101, 1)]);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let cfg = ImportConfig {
            threads: 0,
            ..ImportConfig::default()
        };
        assert!(matches!(IdImporter::new(cfg), Err(IdMapError::Config(_))));
    }
}
