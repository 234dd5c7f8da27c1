//! Addressing and raw results exchanged with the transport.

use crate::types::{CausalContext, MapValue, RawObject, TsRow};
use bytes::Bytes;
use std::fmt;

/// Bucket type, bucket and (optionally) key of a stored object.
///
/// A location without a key asks the store to generate one on insert.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Location {
    pub bucket: String,
    pub bucket_type: String,
    pub key: Option<String>,
}

impl Location {
    #[must_use]
    pub fn new(bucket: impl Into<String>, bucket_type: impl Into<String>) -> Self {
        Location {
            bucket: bucket.into(),
            bucket_type: bucket_type.into(),
            key: None,
        }
    }

    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.bucket_type,
            self.bucket,
            self.key.as_deref().unwrap_or("<generated>")
        )
    }
}

/// A plain value write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValueWrite {
    pub value: Bytes,
    pub content_type: String,
    /// Context from a prior read; absent for blind writes.
    pub vclock: Option<CausalContext>,
    /// Secondary index entries as `(index, value)` pairs.
    pub indexes: Vec<(String, String)>,
}

impl ValueWrite {
    #[must_use]
    pub fn new(value: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        ValueWrite {
            value: value.into(),
            content_type: content_type.into(),
            vclock: None,
            indexes: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_vclock(mut self, vclock: CausalContext) -> Self {
        self.vclock = vclock.non_empty();
        self
    }

    #[must_use]
    pub fn with_index(mut self, index: impl Into<String>, value: impl Into<String>) -> Self {
        self.indexes.push((index.into(), value.into()));
        self
    }
}

/// Everything a single store command can report back.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawCommandResult {
    pub success: bool,
    pub not_found: bool,
    /// Response tree of a map fetch.
    pub map: Option<MapValue>,
    /// Context of a map fetch or update.
    pub context: Option<CausalContext>,
    /// Stored values of a plain fetch; more than one means siblings.
    pub values: Vec<RawObject>,
    /// Key assigned by the store to a keyless insert.
    pub generated_key: Option<String>,
    /// Keys from a listing or index query.
    pub keys: Vec<String>,
    /// Rows from a time-series query.
    pub rows: Vec<TsRow>,
}

impl RawCommandResult {
    #[must_use]
    pub fn ok() -> Self {
        RawCommandResult {
            success: true,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn failed() -> Self {
        RawCommandResult::default()
    }

    #[must_use]
    pub fn not_found() -> Self {
        RawCommandResult {
            success: true,
            not_found: true,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_map(mut self, map: MapValue, context: Option<CausalContext>) -> Self {
        self.map = Some(map);
        self.context = context;
        self
    }

    #[must_use]
    pub fn with_context(mut self, context: CausalContext) -> Self {
        self.context = context.non_empty();
        self
    }

    #[must_use]
    pub fn with_values(mut self, values: Vec<RawObject>) -> Self {
        self.values = values;
        self
    }

    #[must_use]
    pub fn with_generated_key(mut self, key: impl Into<String>) -> Self {
        self.generated_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn with_keys(mut self, keys: Vec<String>) -> Self {
        self.keys = keys;
        self
    }

    #[must_use]
    pub fn with_rows(mut self, rows: Vec<TsRow>) -> Self {
        self.rows = rows;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_display() {
        let loc = Location::new("users", "maps");
        assert_eq!(loc.to_string(), "maps/users/<generated>");
        assert_eq!(loc.with_key("alice").to_string(), "maps/users/alice");
    }

    #[test]
    fn test_value_write_drops_empty_vclock() {
        let write = ValueWrite::new("x", "text/plain").with_vclock(CausalContext::empty());
        assert_eq!(write.vclock, None);
    }

    #[test]
    fn test_result_constructors() {
        assert!(RawCommandResult::ok().success);
        assert!(!RawCommandResult::failed().success);
        let nf = RawCommandResult::not_found();
        assert!(nf.success && nf.not_found);
        let generated = RawCommandResult::ok().with_generated_key("k1");
        assert_eq!(generated.generated_key.as_deref(), Some("k1"));
    }
}
