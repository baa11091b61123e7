//! Key extraction: raw input tokens to typed external identifiers.
//!
//! Two extractors exist, one per [`KeyKind`]:
//! - **Integer**: token parsed as a signed 64-bit integer, no normalisation
//!   (surrounding whitespace is malformed, the input reader already trims).
//! - **Text**: token used verbatim, unicode included. The empty token is a
//!   valid text key.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{IdMapError, Result};

/// Kind of external identifier a mapper or extractor accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyKind {
    Integer,
    Text,
}

impl KeyKind {
    /// Convert a raw token into a typed key.
    ///
    /// `ordinal` is the position of the record the token came from; it is
    /// only used to attribute the error.
    pub fn extract(self, token: &str, ordinal: u64) -> Result<TypedKey> {
        match self {
            KeyKind::Integer => token
                .parse::<i64>()
                .map(TypedKey::Integer)
                .map_err(|_| IdMapError::MalformedValue {
                    kind: self,
                    token: token.to_string(),
                    ordinal,
                }),
            KeyKind::Text => Ok(TypedKey::Text(token.to_string())),
        }
    }
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyKind::Integer => f.write_str("integer"),
            KeyKind::Text => f.write_str("text"),
        }
    }
}

/// External identifier of a node as extracted from the input.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypedKey {
    Integer(i64),
    Text(String),
}

impl TypedKey {
    pub fn kind(&self) -> KeyKind {
        match self {
            TypedKey::Integer(_) => KeyKind::Integer,
            TypedKey::Text(_) => KeyKind::Text,
        }
    }
}

impl fmt::Display for TypedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypedKey::Integer(v) => write!(f, "{}", v),
            TypedKey::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for TypedKey {
    fn from(value: i64) -> Self {
        TypedKey::Integer(value)
    }
}

impl From<&str> for TypedKey {
    fn from(value: &str) -> Self {
        TypedKey::Text(value.to_string())
    }
}

impl From<String> for TypedKey {
    fn from(value: String) -> Self {
        TypedKey::Text(value)
    }
}
