//! Error types for mapping, decoding and sibling resolution.

use convkv_wire::{CrdtKind, TransportError};
use thiserror::Error;

/// Result type for convkv operations.
pub type Result<T> = std::result::Result<T, MapperError>;

/// Errors that can occur while mapping values to and from the store.
///
/// Mapping and encode errors are schema mismatches and are never worth
/// retrying. `path` fields name the offending field, dotted through nested
/// records (`"Address.City"`).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MapperError {
    #[error("{path}: UnsupportedType ({type_name})")]
    UnsupportedType { path: String, type_name: String },

    #[error("{path}: MalformedMapping {tag:?} ({reason})")]
    MalformedMapping {
        path: String,
        tag: String,
        reason: String,
    },

    #[error("{path}: DecodeError: {kind}")]
    Decode { path: String, kind: DecodeErrorKind },

    #[error("Had conflict, but no conflict resolver")]
    NoConflictResolver,

    #[error("Invalid value from conflict resolver: empty causal context")]
    InvalidResolution,

    #[error("Write-back of resolved conflict failed: {0}")]
    WriteBack(TransportError),

    #[error("Not found: {key}")]
    NotFound { key: String },

    #[error("JSON error: {0}")]
    Json(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Structural decode failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeErrorKind {
    #[error("TypeMismatch (expected {expected}, found {found})")]
    TypeMismatch { expected: CrdtKind, found: CrdtKind },

    #[error("LengthMismatch (expected {expected} bytes, found {found})")]
    LengthMismatch { expected: usize, found: usize },

    #[error("InvalidText (register is not valid UTF-8)")]
    InvalidText,

    #[error("InvalidInteger (register is not a decimal integer)")]
    InvalidInteger,

    #[error("OutOfRange ({0} does not fit the destination)")]
    OutOfRange(i64),

    #[error("CellMismatch (expected {expected}, found {found})")]
    CellMismatch {
        expected: &'static str,
        found: &'static str,
    },
}

impl From<serde_json::Error> for MapperError {
    fn from(err: serde_json::Error) -> Self {
        MapperError::Json(err.to_string())
    }
}

impl MapperError {
    pub(crate) fn unsupported(type_name: impl Into<String>) -> Self {
        MapperError::UnsupportedType {
            path: String::new(),
            type_name: type_name.into(),
        }
    }

    pub(crate) fn malformed(tag: impl Into<String>, reason: impl Into<String>) -> Self {
        MapperError::MalformedMapping {
            path: String::new(),
            tag: tag.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn decode(kind: DecodeErrorKind) -> Self {
        MapperError::Decode {
            path: String::new(),
            kind,
        }
    }

    pub(crate) fn type_mismatch(expected: CrdtKind, found: CrdtKind) -> Self {
        Self::decode(DecodeErrorKind::TypeMismatch { expected, found })
    }

    /// Prefix the error's field path with `segment`.
    ///
    /// Errors without a field path are returned unchanged.
    #[must_use]
    pub fn at(mut self, segment: &str) -> Self {
        match &mut self {
            MapperError::UnsupportedType { path, .. }
            | MapperError::MalformedMapping { path, .. }
            | MapperError::Decode { path, .. } => {
                *path = if path.is_empty() {
                    segment.to_string()
                } else {
                    format!("{}.{}", segment, path)
                };
            }
            _ => {}
        }
        self
    }

    /// Dotted field path, when the error has one.
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        match self {
            MapperError::UnsupportedType { path, .. }
            | MapperError::MalformedMapping { path, .. }
            | MapperError::Decode { path, .. } => Some(path),
            _ => None,
        }
    }

    /// Check if this is a transport failure the caller may retry.
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            MapperError::Transport(err) | MapperError::WriteBack(err) => err.is_retryable(),
            _ => false,
        }
    }
}
