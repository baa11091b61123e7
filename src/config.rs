//! Import configuration.
//!
//! Persisted as `import_config.json` next to the import inputs. Missing
//! fields take the conservative defaults of `TuningProfile::default()`;
//! `ImportConfig::auto_tuned()` derives them from the host instead.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::array::{LongArrayFactory, StoragePolicy};
use crate::error::{IdMapError, Result};
use crate::extract::KeyKind;
use crate::idmap::{DuplicatePolicy, GeneralMapper, IdMapper, IdentityMapper};
use crate::resource::{ResourceManager, TuningProfile};

pub const CONFIG_FILE_NAME: &str = "import_config.json";

/// How external node ids are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum IdType {
    /// Integers that already are dense node ids. No mapping state.
    Actual,
    /// Arbitrary text tokens.
    #[default]
    String,
    /// Arbitrary (sparse, possibly negative) integers.
    Integer,
}

impl IdType {
    /// Kind of key the extractor produces for this id type.
    pub fn key_kind(self) -> KeyKind {
        match self {
            IdType::Actual | IdType::Integer => KeyKind::Integer,
            IdType::String => KeyKind::Text,
        }
    }

    pub fn needs_mapping(self) -> bool {
        !matches!(self, IdType::Actual)
    }
}

/// Settings of one import run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    pub id_type: IdType,
    pub storage: StoragePolicy,
    /// Slot count at which `auto` storage leaves the heap.
    pub heap_threshold: u64,
    /// Slots per chunk for chunked storage.
    pub chunk_len: usize,
    pub duplicates: DuplicatePolicy,
    /// Node count hint for presizing; 0 if unknown.
    pub expected_nodes: u64,
    /// Producer threads for node-id collection.
    pub threads: usize,
    pub sort_threads: usize,
    /// Records per producer batch.
    pub batch_size: usize,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self::from_profile(&TuningProfile::default())
    }
}

impl ImportConfig {
    /// Defaults derived from a tuning profile.
    pub fn from_profile(profile: &TuningProfile) -> Self {
        Self {
            id_type: IdType::default(),
            storage: StoragePolicy::default(),
            heap_threshold: profile.heap_threshold,
            chunk_len: profile.chunk_len,
            duplicates: DuplicatePolicy::default(),
            expected_nodes: 0,
            threads: profile.collect_threads,
            sort_threads: profile.sort_threads,
            batch_size: profile.batch_size,
        }
    }

    /// Defaults tuned to the current host.
    pub fn auto_tuned() -> Self {
        Self::from_profile(&ResourceManager::auto_tune())
    }

    pub fn with_id_type(mut self, id_type: IdType) -> Self {
        self.id_type = id_type;
        self
    }

    pub fn with_duplicates(mut self, duplicates: DuplicatePolicy) -> Self {
        self.duplicates = duplicates;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.threads == 0 {
            return Err(IdMapError::Config("threads must be at least 1".into()));
        }
        if self.sort_threads == 0 {
            return Err(IdMapError::Config("sort_threads must be at least 1".into()));
        }
        if self.batch_size == 0 {
            return Err(IdMapError::Config("batch_size must be at least 1".into()));
        }
        if self.chunk_len == 0 {
            return Err(IdMapError::Config("chunk_len must be at least 1".into()));
        }
        Ok(())
    }

    /// Long-array factory for this configuration.
    pub fn factory(&self) -> LongArrayFactory {
        LongArrayFactory::new(self.storage)
            .with_heap_threshold(self.heap_threshold)
            .with_chunk_len(self.chunk_len)
    }

    /// Fresh mapper for one import run.
    pub fn create_mapper(&self) -> Result<Box<dyn IdMapper>> {
        self.validate()?;
        if !self.id_type.needs_mapping() {
            return Ok(Box::new(IdentityMapper::new()));
        }
        let mapper = GeneralMapper::new(self.id_type.key_kind(), self.factory(), self.expected_nodes)?
            .with_duplicate_policy(self.duplicates)
            .with_sort_threads(self.sort_threads);
        Ok(Box::new(mapper))
    }

    /// Read config from a directory. Returns None if the file doesn't exist.
    pub fn read_from(dir: &Path) -> Result<Option<Self>> {
        let path = dir.join(CONFIG_FILE_NAME);
        if !path.exists() {
            return Ok(None);
        }
        Self::load(&path).map(Some)
    }

    /// Load and validate a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Write config to a directory.
    pub fn write_to(&self, dir: &Path) -> Result<()> {
        let path = dir.join(CONFIG_FILE_NAME);
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json)?;
        Ok(())
    }
}

// ── Tests ──────────────────────────────────────────────────────────
