//! Sibling values and their resolution.

use crate::types::CausalContext;
use bytes::Bytes;
use chrono::{DateTime, Utc};

/// One stored value of a plain (non-map) key, as returned by a fetch.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RawObject {
    pub value: Bytes,
    pub content_type: String,
    pub vclock: CausalContext,
    pub last_modified: DateTime<Utc>,
}

impl RawObject {
    #[must_use]
    pub fn new(
        value: impl Into<Bytes>,
        vclock: CausalContext,
        last_modified: DateTime<Utc>,
    ) -> Self {
        RawObject {
            value: value.into(),
            content_type: "application/octet-stream".to_string(),
            vclock,
            last_modified,
        }
    }

    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }
}

/// A sibling the store could not causally order against the others.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConflictObject {
    pub value: Bytes,
    pub last_modified: DateTime<Utc>,
    pub vclock: CausalContext,
}

impl From<RawObject> for ConflictObject {
    fn from(raw: RawObject) -> Self {
        ConflictObject {
            value: raw.value,
            last_modified: raw.last_modified,
            vclock: raw.vclock,
        }
    }
}

impl ConflictObject {
    /// Keep this sibling as the resolution.
    #[must_use]
    pub fn resolved(&self) -> ResolvedConflict {
        ResolvedConflict {
            value: self.value.clone(),
            vclock: self.vclock.clone(),
        }
    }
}

/// The outcome chosen for a set of siblings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedConflict {
    pub value: Bytes,
    pub vclock: CausalContext,
}

impl ResolvedConflict {
    #[must_use]
    pub fn new(value: impl Into<Bytes>, vclock: CausalContext) -> Self {
        ResolvedConflict {
            value: value.into(),
            vclock,
        }
    }

    /// A resolution must carry the causal context it supersedes.
    #[inline]
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.vclock.is_empty()
    }
}
