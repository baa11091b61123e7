//! Integration test: id mapping scenarios through the public API.
//!
//! Exercises both strategies as an importer would see them: created from
//! an `ImportConfig`, fed keys, frozen, then queried.

use std::collections::HashSet;

use rfdb_idmap::idmap::Encoder;
use rfdb_idmap::{
    CollectedIds, DuplicatePolicy, GeneralMapper, IdImporter, IdMapError, IdMapper, IdType,
    IdentityMapper, ImportConfig, KeyKind, LongArrayFactory, MapperState, StoragePolicy, TypedKey,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn string_mapper(duplicates: DuplicatePolicy) -> Box<dyn IdMapper> {
    ImportConfig::default()
        .with_id_type(IdType::String)
        .with_duplicates(duplicates)
        .create_mapper()
        .unwrap()
}

fn put_all(mapper: &mut dyn IdMapper, keys: &[&str]) {
    for (ordinal, key) in keys.iter().enumerate() {
        mapper.put(ordinal as u64, &TypedKey::from(*key)).unwrap();
    }
}

/// Every text key encodes to the same value.
struct ConstantEncoder;

impl Encoder for ConstantEncoder {
    fn kind(&self) -> KeyKind {
        KeyKind::Text
    }

    fn encode(&self, _key: &TypedKey) -> i64 {
        42
    }
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

#[test]
fn identity_round_trip() {
    let mut mapper = IdentityMapper::new();
    for value in [0i64, 1, 2, 1_000, 123_456_789] {
        mapper.put(value as u64, &TypedKey::Integer(value)).unwrap();
    }
    mapper.finalize().unwrap();
    for value in [0i64, 1, 2, 1_000, 123_456_789] {
        assert_eq!(mapper.lookup(&TypedKey::Integer(value)).unwrap(), value as u64);
    }
}

#[test]
fn identity_repeated_value_is_not_an_error() {
    let mut ids = CollectedIds::new();
    let config = ImportConfig::default().with_id_type(IdType::Actual);
    IdImporter::new(config)
        .unwrap()
        .run(&["5", "5"], &[("5", "5")], &mut ids)
        .unwrap();

    assert_eq!(ids.nodes, vec![(0, 5), (1, 5)]);
    assert_eq!(ids.relationships, vec![(0, 5, 5)]);
    assert!(ids.rejected_nodes.is_empty());
}

// ---------------------------------------------------------------------------
// General
// ---------------------------------------------------------------------------

#[test]
fn distinct_keys_map_to_first_occurrence() {
    let keys = ["src/a.js", "src/b.js", "lib/x", "", "\u{00e9}t\u{00e9}", "42"];
    let mut mapper = string_mapper(DuplicatePolicy::Abort);
    put_all(mapper.as_mut(), &keys);
    let stats = mapper.finalize().unwrap();

    assert_eq!(stats.unique, keys.len() as u64);
    for (ordinal, key) in keys.iter().enumerate() {
        assert_eq!(mapper.lookup(&TypedKey::from(*key)).unwrap(), ordinal as u64);
    }
}

#[test]
fn repeated_key_first_wins() {
    let mut mapper = string_mapper(DuplicatePolicy::FirstWins);
    put_all(mapper.as_mut(), &["alice", "bob", "alice", "carol"]);
    let stats = mapper.finalize().unwrap();

    assert_eq!(stats.duplicates, 1);
    assert_eq!(mapper.lookup(&TypedKey::from("alice")).unwrap(), 0);
    assert_eq!(mapper.lookup(&TypedKey::from("bob")).unwrap(), 1);
    assert_eq!(mapper.lookup(&TypedKey::from("carol")).unwrap(), 2);
}

#[test]
fn repeated_key_abort() {
    let mut mapper = string_mapper(DuplicatePolicy::Abort);
    put_all(mapper.as_mut(), &["alice", "bob", "alice", "carol"]);
    let err = mapper.finalize().unwrap_err();

    assert!(matches!(
        err,
        IdMapError::DuplicateId { ref key, first: 0, second: 2 } if key == "alice"
    ));
    assert_eq!(mapper.state(), MapperState::Aborted);
}

#[test]
fn crafted_collision_keeps_keys_apart() {
    let mut mapper = GeneralMapper::with_encoder(
        Box::new(ConstantEncoder),
        LongArrayFactory::new(StoragePolicy::Heap),
        0,
    )
    .unwrap();
    put_all(&mut mapper, &["left", "right"]);
    let stats = mapper.finalize().unwrap();

    assert_eq!(stats.collision_groups, 1);
    assert_eq!(mapper.lookup(&TypedKey::from("left")).unwrap(), 0);
    assert_eq!(mapper.lookup(&TypedKey::from("right")).unwrap(), 1);
    assert!(matches!(
        mapper.lookup(&TypedKey::from("middle")),
        Err(IdMapError::NotFound { .. })
    ));
}

#[test]
fn absent_keys_not_found() {
    let mut mapper = string_mapper(DuplicatePolicy::Abort);
    put_all(mapper.as_mut(), &["a", "b", "c"]);
    mapper.finalize().unwrap();

    for absent in ["d", "A", "a ", ""] {
        let err = mapper.lookup(&TypedKey::from(absent)).unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND", "key {:?}", absent);
    }
}

#[test]
fn dense_ids_are_contiguous() {
    let keys: Vec<String> = (0..5_000).map(|i| format!("k{}", (i * 31) % 3_001)).collect();
    let config = ImportConfig {
        id_type: IdType::String,
        duplicates: DuplicatePolicy::FirstWins,
        storage: StoragePolicy::Chunked,
        chunk_len: 512,
        threads: 3,
        sort_threads: 3,
        batch_size: 100,
        ..ImportConfig::default()
    };
    let mut ids = CollectedIds::new();
    let summary = IdImporter::new(config)
        .unwrap()
        .run(&keys, &Vec::<(String, String)>::new(), &mut ids)
        .unwrap();

    let distinct: HashSet<u64> = ids.nodes.iter().map(|&(_, id)| id).collect();
    assert_eq!(summary.build.unique, 3_001);
    assert_eq!(distinct.len(), 3_001);
    assert_eq!(distinct.iter().max().copied(), Some(3_000));
}

#[test]
fn sparse_integer_ids() {
    let nodes = ["-7", "9000000000", "3", "oops", "12"];
    let rels = [("3", "-7"), ("12", "9000000000"), ("4", "3")];
    let config = ImportConfig::default().with_id_type(IdType::Integer);
    let mut ids = CollectedIds::new();
    let summary = IdImporter::new(config)
        .unwrap()
        .run(&nodes, &rels, &mut ids)
        .unwrap();

    assert_eq!(summary.collect.rejected.len(), 1);
    assert_eq!(summary.collect.rejected[0].ordinal, 3);
    assert_eq!(ids.nodes, vec![(0, 0), (1, 1), (2, 2), (4, 3)]);
    assert_eq!(ids.relationships, vec![(0, 2, 0), (1, 3, 1)]);
    assert_eq!(ids.rejected_relationships[0].ordinal, 2);
}

#[test]
fn lookups_from_many_threads() {
    let keys: Vec<String> = (0..20_000).map(|i| format!("node:{}", i)).collect();
    let mut mapper = string_mapper(DuplicatePolicy::Abort);
    for (ordinal, key) in keys.iter().enumerate() {
        mapper.put(ordinal as u64, &TypedKey::from(key.as_str())).unwrap();
    }
    mapper.finalize().unwrap();

    let mapper: &dyn IdMapper = mapper.as_ref();
    std::thread::scope(|s| {
        for t in 0..4 {
            let keys = &keys;
            s.spawn(move || {
                for (ordinal, key) in keys.iter().enumerate().skip(t).step_by(4) {
                    assert_eq!(
                        mapper.lookup(&TypedKey::from(key.as_str())).unwrap(),
                        ordinal as u64
                    );
                }
            });
        }
    });
}
