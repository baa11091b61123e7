//! Key encoders: typed external ids to sortable 64-bit values.
//!
//! - `LongEncoder` -- integer keys map to themselves. Lossless, so equal
//!   encodings always mean equal keys.
//! - `StringEncoder` -- text keys map to the first 8 bytes of their BLAKE3
//!   hash. Lossy: equal encodings are resolved against the original keys
//!   by the collision scan.
//!
//! Encodings only need to be deterministic and totally ordered; the
//! order of encodings is unrelated to the order of the original keys.

use crate::extract::{KeyKind, TypedKey};

/// Deterministic mapping of a key to an i64 used for sorting and search.
pub trait Encoder: Send + Sync {
    /// Kind of key this encoder is meant for.
    fn kind(&self) -> KeyKind;

    fn encode(&self, key: &TypedKey) -> i64;

    /// Recover the key from its encoding, for lossless encoders only.
    ///
    /// Mappers keep no side copy of the keys when this returns `Some`.
    fn decode(&self, _encoded: i64) -> Option<TypedKey> {
        None
    }

    fn is_lossless(&self) -> bool {
        false
    }
}

/// Hash arbitrary bytes to an i64 (first 8 bytes of BLAKE3, LE).
pub fn hash_bytes(bytes: &[u8]) -> i64 {
    let hash = blake3::hash(bytes);
    i64::from_le_bytes(hash.as_bytes()[0..8].try_into().unwrap())
}

/// Identity encoding for integer keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct LongEncoder;

impl Encoder for LongEncoder {
    fn kind(&self) -> KeyKind {
        KeyKind::Integer
    }

    fn encode(&self, key: &TypedKey) -> i64 {
        match key {
            TypedKey::Integer(v) => *v,
            // Mappers reject text keys before encoding; hash like StringEncoder.
            TypedKey::Text(s) => hash_bytes(s.as_bytes()),
        }
    }

    fn decode(&self, encoded: i64) -> Option<TypedKey> {
        Some(TypedKey::Integer(encoded))
    }

    fn is_lossless(&self) -> bool {
        true
    }
}

/// BLAKE3-based encoding for text keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringEncoder;

impl Encoder for StringEncoder {
    fn kind(&self) -> KeyKind {
        KeyKind::Text
    }

    fn encode(&self, key: &TypedKey) -> i64 {
        match key {
            TypedKey::Text(s) => hash_bytes(s.as_bytes()),
            TypedKey::Integer(v) => hash_bytes(&v.to_le_bytes()),
        }
    }
}

/// Default encoder for a key kind.
pub fn encoder_for(kind: KeyKind) -> Box<dyn Encoder> {
    match kind {
        KeyKind::Integer => Box::new(LongEncoder),
        KeyKind::Text => Box::new(StringEncoder),
    }
}
