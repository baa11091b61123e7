//! rfdb-idmap: bulk external-id to dense-node-id mapping for graph import.
//!
//! Every imported node carries an external identifier (a pre-assigned
//! integer or an arbitrary string); relationships reference nodes by that
//! identifier. The mapper translates them into dense, contiguous node ids
//! `0..N`, detecting duplicate declarations and hash collisions on the way.
//!
//! Modules:
//! - `extract` -- raw token to `TypedKey`
//! - `array` -- growable long arrays (heap or chunked anonymous mmap)
//! - `idmap` -- identity and general mapping strategies
//! - `import` -- worker pool driving a mapper through an import run
//! - `config` / `resource` -- import settings and host-derived tuning

pub mod array;
pub mod config;
pub mod error;
pub mod extract;
pub mod idmap;
pub mod import;
pub mod resource;

pub use array::{LongArray, LongArrayFactory, LongArrayStore, StoragePolicy};
pub use config::{IdType, ImportConfig};
pub use error::{IdMapError, Result};
pub use extract::{KeyKind, TypedKey};
pub use idmap::{
    BuildStats, DenseId, DuplicatePolicy, GeneralMapper, IdMapper, IdentityMapper, KeyBatch,
    MapperState,
};
pub use import::{CollectedIds, DenseIdConsumer, IdImporter, OrdinalCursor, RejectedRecord};
