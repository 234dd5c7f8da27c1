use crate::clock::Clock;
use crate::map::apply_map;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use convkv_wire::{
    CausalContext, Location, MapOperation, MapValue, RawCommandResult, RawObject, Result, Transport,
    TransportError, TsRow, ValueWrite,
};
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// `(bucket type, bucket, key)`
type ObjectKey = (String, String, String);

#[derive(Clone, Debug)]
struct Sibling {
    dot: u64,
    value: Bytes,
    content_type: String,
    last_modified: DateTime<Utc>,
    indexes: Vec<(String, String)>,
}

#[derive(Clone, Debug)]
struct MapObject {
    value: MapValue,
    dot: u64,
}

#[derive(Debug, Default)]
struct State {
    next_dot: u64,
    maps: HashMap<ObjectKey, MapObject>,
    values: HashMap<ObjectKey, Vec<Sibling>>,
    tables: HashMap<String, Vec<TsRow>>,
    value_writes: usize,
    failing_value_writes: usize,
}

impl State {
    fn dot(&mut self) -> u64 {
        self.next_dot += 1;
        self.next_dot
    }
}

/// An in-memory convergent store.
///
/// Maps are merged operation by operation. Plain values keep every write
/// that was not causally superseded as a sibling: a write without a context,
/// or with a context that misses some current sibling, leaves those siblings
/// in place next to the new value.
#[derive(Clone, Debug, Default)]
pub struct MemStore {
    state: Arc<Mutex<State>>,
}

impl MemStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sibling directly, as if written concurrently by another client.
    pub fn put_sibling(
        &self,
        location: &Location,
        value: impl Into<Bytes>,
        last_modified: DateTime<Utc>,
    ) {
        let Some(key) = object_key(location) else {
            return;
        };
        let mut state = self.state.lock();
        let dot = state.dot();
        state.values.entry(key).or_default().push(Sibling {
            dot,
            value: value.into(),
            content_type: "application/octet-stream".to_string(),
            last_modified,
            indexes: Vec::new(),
        });
    }

    /// Number of siblings currently stored under `location`.
    #[must_use]
    pub fn sibling_count(&self, location: &Location) -> usize {
        object_key(location)
            .and_then(|key| self.state.lock().values.get(&key).map(Vec::len))
            .unwrap_or(0)
    }

    /// Number of successful plain-value writes so far.
    #[must_use]
    pub fn value_writes(&self) -> usize {
        self.state.lock().value_writes
    }

    /// Make the next `count` plain-value writes fail with a backend error.
    pub fn fail_next_value_writes(&self, count: usize) {
        self.state.lock().failing_value_writes = count;
    }

    /// Rows stored in `table`.
    #[must_use]
    pub fn table_rows(&self, table: &str) -> Vec<TsRow> {
        self.state.lock().tables.get(table).cloned().unwrap_or_default()
    }
}

fn object_key(location: &Location) -> Option<ObjectKey> {
    location
        .key()
        .map(|key| (location.bucket_type.clone(), location.bucket.clone(), key.to_string()))
}

fn require_key(location: &Location) -> Result<ObjectKey> {
    object_key(location).ok_or_else(|| TransportError::MissingKey(location.to_string()))
}

fn in_bucket(key: &ObjectKey, location: &Location) -> bool {
    key.0 == location.bucket_type && key.1 == location.bucket
}

/// Use the location's key or generate one.
fn key_or_generate(location: &Location) -> (ObjectKey, Option<String>) {
    match object_key(location) {
        Some(key) => (key, None),
        None => {
            let generated = uuid::Uuid::new_v4().simple().to_string();
            let key = (
                location.bucket_type.clone(),
                location.bucket.clone(),
                generated.clone(),
            );
            (key, Some(generated))
        }
    }
}

fn siblings_clock(siblings: &[Sibling]) -> Clock {
    Clock::from_dots(siblings.iter().map(|s| s.dot))
}

fn table_name(query: &str, keyword: &str) -> Option<String> {
    let upper = query.to_ascii_uppercase();
    let start = upper.find(keyword)? + keyword.len();
    query[start..]
        .split(|c: char| c.is_whitespace() || c == '(' || c == ';')
        .find(|word| !word.is_empty())
        .map(str::to_string)
}

#[async_trait]
impl Transport for MemStore {
    async fn update_map(
        &self,
        location: &Location,
        op: MapOperation,
        context: Option<CausalContext>,
    ) -> Result<RawCommandResult> {
        if let Some(context) = &context {
            Clock::from_context(context, location)?;
        }

        let (key, generated) = key_or_generate(location);
        let mut state = self.state.lock();
        let dot = state.dot();
        let object = state.maps.entry(key).or_insert_with(|| MapObject {
            value: MapValue::new(),
            dot,
        });
        tracing::trace!(location = %location, entries = op.len(), "applying map update");
        apply_map(&mut object.value, op);
        object.dot = dot;

        let mut result = RawCommandResult::ok().with_context(Clock::from_dots([dot]).to_context());
        if let Some(generated) = generated {
            result = result.with_generated_key(generated);
        }
        Ok(result)
    }

    async fn fetch_map(&self, location: &Location) -> Result<RawCommandResult> {
        let key = require_key(location)?;
        let state = self.state.lock();
        Ok(match state.maps.get(&key) {
            Some(object) => RawCommandResult::ok().with_map(
                object.value.clone(),
                Some(Clock::from_dots([object.dot]).to_context()),
            ),
            None => RawCommandResult::not_found(),
        })
    }

    async fn store_value(
        &self,
        location: &Location,
        write: ValueWrite,
    ) -> Result<RawCommandResult> {
        let covered = match &write.vclock {
            Some(vclock) => Clock::from_context(vclock, location)?,
            None => Clock::default(),
        };

        let (key, generated) = key_or_generate(location);
        let mut state = self.state.lock();
        if state.failing_value_writes > 0 {
            state.failing_value_writes -= 1;
            return Err(TransportError::Backend(format!("injected write failure for {}", location)));
        }

        let dot = state.dot();
        state.value_writes += 1;
        let siblings = state.values.entry(key).or_default();
        siblings.retain(|s| !covered.covers(s.dot));
        siblings.push(Sibling {
            dot,
            value: write.value,
            content_type: write.content_type,
            last_modified: Utc::now(),
            indexes: write.indexes,
        });
        tracing::trace!(location = %location, siblings = siblings.len(), "stored value");

        let mut result = RawCommandResult::ok().with_context(siblings_clock(siblings).to_context());
        if let Some(generated) = generated {
            result = result.with_generated_key(generated);
        }
        Ok(result)
    }

    async fn fetch_value(&self, location: &Location) -> Result<RawCommandResult> {
        let key = require_key(location)?;
        let state = self.state.lock();
        let Some(siblings) = state.values.get(&key).filter(|s| !s.is_empty()) else {
            return Ok(RawCommandResult::not_found());
        };

        let vclock = siblings_clock(siblings).to_context();
        let values = siblings
            .iter()
            .map(|s| {
                RawObject::new(s.value.clone(), vclock.clone(), s.last_modified)
                    .with_content_type(s.content_type.clone())
            })
            .collect();
        Ok(RawCommandResult::ok().with_values(values).with_context(vclock))
    }

    async fn delete_value(&self, location: &Location) -> Result<RawCommandResult> {
        let key = require_key(location)?;
        let mut state = self.state.lock();
        let removed_value = state.values.remove(&key).is_some();
        let removed_map = state.maps.remove(&key).is_some();
        if removed_value || removed_map {
            Ok(RawCommandResult::ok())
        } else {
            Ok(RawCommandResult::not_found())
        }
    }

    async fn list_keys(&self, location: &Location) -> Result<RawCommandResult> {
        let state = self.state.lock();
        let keys: BTreeSet<String> = state
            .values
            .keys()
            .chain(state.maps.keys())
            .filter(|k| in_bucket(k, location))
            .map(|k| k.2.clone())
            .collect();
        Ok(RawCommandResult::ok().with_keys(keys.into_iter().collect()))
    }

    async fn index_query(
        &self,
        location: &Location,
        index: &str,
        value: &str,
        limit: u32,
    ) -> Result<RawCommandResult> {
        let state = self.state.lock();
        let mut keys: Vec<String> = state
            .values
            .iter()
            .filter(|(k, _)| in_bucket(k, location))
            .filter(|(_, siblings)| {
                siblings
                    .iter()
                    .flat_map(|s| s.indexes.iter())
                    .any(|(i, v)| i == index && v == value)
            })
            .map(|(k, _)| k.2.clone())
            .collect();
        keys.sort();
        if limit > 0 {
            keys.truncate(limit as usize);
        }
        Ok(RawCommandResult::ok().with_keys(keys))
    }

    async fn ts_store_rows(&self, table: &str, rows: Vec<TsRow>) -> Result<RawCommandResult> {
        let mut state = self.state.lock();
        tracing::trace!(table, rows = rows.len(), "storing time-series rows");
        state.tables.entry(table.to_string()).or_default().extend(rows);
        Ok(RawCommandResult::ok())
    }

    /// Supports `CREATE TABLE <name> ...` and `SELECT ... FROM <name> ...`.
    /// Selections return every row of the table; `WHERE` clauses are not
    /// evaluated.
    async fn ts_query(&self, query: &str) -> Result<RawCommandResult> {
        let mut state = self.state.lock();
        if let Some(table) = table_name(query, "CREATE TABLE") {
            state.tables.entry(table).or_default();
            return Ok(RawCommandResult::ok());
        }

        let table = table_name(query, "FROM")
            .ok_or_else(|| TransportError::Backend(format!("unsupported query: {}", query)))?;
        match state.tables.get(&table) {
            Some(rows) => Ok(RawCommandResult::ok().with_rows(rows.clone())),
            None => Err(TransportError::Backend(format!("unknown table {}", table))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use convkv_wire::{Operation, ResponseValue, TsCell};

    fn loc(key: &str) -> Location {
        Location::new("bucket", "default").with_key(key)
    }

    #[tokio::test]
    async fn test_generated_keys() {
        let store = MemStore::new();
        let anonymous = Location::new("bucket", "default");
        let result = store
            .store_value(&anonymous, ValueWrite::new("v", "text/plain"))
            .await
            .unwrap();
        let key = result.generated_key.unwrap();
        assert_eq!(key.len(), 32);
        assert_eq!(store.sibling_count(&loc(&key)), 1);
    }

    #[tokio::test]
    async fn test_blind_writes_create_siblings() {
        let store = MemStore::new();
        store.store_value(&loc("k"), ValueWrite::new("a", "text/plain")).await.unwrap();
        store.store_value(&loc("k"), ValueWrite::new("b", "text/plain")).await.unwrap();

        let fetched = store.fetch_value(&loc("k")).await.unwrap();
        assert_eq!(fetched.values.len(), 2);
        assert_eq!(fetched.values[0].vclock, fetched.values[1].vclock);
    }

    #[tokio::test]
    async fn test_covering_write_collapses_siblings() {
        let store = MemStore::new();
        store.put_sibling(&loc("k"), "a", Utc::now());
        store.put_sibling(&loc("k"), "b", Utc::now());
        let vclock = store.fetch_value(&loc("k")).await.unwrap().context.unwrap();

        store
            .store_value(&loc("k"), ValueWrite::new("merged", "text/plain").with_vclock(vclock))
            .await
            .unwrap();
        let fetched = store.fetch_value(&loc("k")).await.unwrap();
        assert_eq!(fetched.values.len(), 1);
        assert_eq!(fetched.values[0].value, Bytes::from("merged"));
    }

    #[tokio::test]
    async fn test_stale_write_keeps_concurrent_sibling() {
        let store = MemStore::new();
        store.put_sibling(&loc("k"), "a", Utc::now());
        let stale = store.fetch_value(&loc("k")).await.unwrap().context.unwrap();
        store.put_sibling(&loc("k"), "concurrent", Utc::now());

        store
            .store_value(&loc("k"), ValueWrite::new("b", "text/plain").with_vclock(stale))
            .await
            .unwrap();
        assert_eq!(store.sibling_count(&loc("k")), 2);
    }

    #[tokio::test]
    async fn test_invalid_context_rejected() {
        let store = MemStore::new();
        let err = store
            .update_map(&loc("m"), MapOperation::new(), Some(CausalContext::from(&b"nope"[..])))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::InvalidContext(_)));
    }

    #[tokio::test]
    async fn test_map_update_and_fetch() {
        let store = MemStore::new();
        let op = MapOperation::new().with("visits", Operation::Counter(1));
        let first = store.update_map(&loc("m"), op.clone(), None).await.unwrap();
        store.update_map(&loc("m"), op, first.context).await.unwrap();

        let fetched = store.fetch_map(&loc("m")).await.unwrap();
        assert!(!fetched.not_found);
        assert_eq!(fetched.map.unwrap().get("visits"), Some(&ResponseValue::Counter(2)));
        assert!(fetched.context.is_some());

        assert!(store.fetch_map(&loc("missing")).await.unwrap().not_found);
    }

    #[tokio::test]
    async fn test_keys_and_indexes() {
        let store = MemStore::new();
        for (key, team) in [("a", "red"), ("b", "blue"), ("c", "red")] {
            let write = ValueWrite::new(key, "text/plain").with_index("team_bin", team);
            store.store_value(&loc(key), write).await.unwrap();
        }
        store
            .update_map(&loc("m"), MapOperation::new().with("x", Operation::Flag(true)), None)
            .await
            .unwrap();

        let all = Location::new("bucket", "default");
        assert_eq!(store.list_keys(&all).await.unwrap().keys, ["a", "b", "c", "m"]);
        let red = store.index_query(&all, "team_bin", "red", 0).await.unwrap();
        assert_eq!(red.keys, ["a", "c"]);
        let limited = store.index_query(&all, "team_bin", "red", 1).await.unwrap();
        assert_eq!(limited.keys, ["a"]);
    }

    #[tokio::test]
    async fn test_delete() {
        let store = MemStore::new();
        store.store_value(&loc("k"), ValueWrite::new("a", "text/plain")).await.unwrap();
        assert!(!store.delete_value(&loc("k")).await.unwrap().not_found);
        assert!(store.delete_value(&loc("k")).await.unwrap().not_found);
        assert!(store.fetch_value(&loc("k")).await.unwrap().not_found);
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let store = MemStore::new();
        store.fail_next_value_writes(1);
        let err = store
            .store_value(&loc("k"), ValueWrite::new("a", "text/plain"))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Backend(_)));
        assert_eq!(store.value_writes(), 0);
        store.store_value(&loc("k"), ValueWrite::new("a", "text/plain")).await.unwrap();
        assert_eq!(store.value_writes(), 1);
    }

    #[tokio::test]
    async fn test_time_series_tables() {
        let store = MemStore::new();
        store
            .ts_query("CREATE TABLE UserLog (id SINT64 NOT NULL)")
            .await
            .unwrap();
        store
            .ts_store_rows("UserLog", vec![vec![TsCell::Sint64(1)]])
            .await
            .unwrap();
        let rows = store
            .ts_query("SELECT * FROM UserLog WHERE id = 1")
            .await
            .unwrap()
            .rows;
        assert_eq!(rows, vec![vec![TsCell::Sint64(1)]]);
        assert!(store.ts_query("SELECT * FROM Missing").await.is_err());
    }

    #[tokio::test]
    async fn test_key_required_for_fetch() {
        let store = MemStore::new();
        let err = store
            .fetch_value(&Location::new("bucket", "default"))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::MissingKey(_)));
    }
}
