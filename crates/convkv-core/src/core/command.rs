//! Command builders for buckets.
//!
//! Every command is built from a [`Bucket`], optionally refined, and then run
//! against a [`Session`]:
//!
//! ```no_run
//! # async fn demo(session: &convkv_core::Session) -> convkv_core::Result<()> {
//! use convkv_core::{crdt_record, Bucket};
//!
//! crdt_record! {
//!     #[derive(Clone, Debug, Default)]
//!     pub struct User {
//!         pub name: String,
//!         pub logins: i64,
//!     }
//! }
//!
//! let users = Bucket::new("users", "maps");
//! let user = User { name: "ada".into(), logins: 1 };
//! let written = users.insert(&user).key("ada").run(session).await?;
//!
//! let mut back = User::default();
//! users.get(&written.key).run(session, &mut back).await?;
//! # Ok(())
//! # }
//! ```

use crate::core::codec::{decode_with_context, encode, CrdtRecord, MapUpdate};
use crate::core::error::{MapperError, Result};
use crate::core::session::{ensure_success, Session};
use crate::core::siblings::{ResolveFn, SiblingResolver};
use bytes::Bytes;
use convkv_wire::{CausalContext, ConflictObject, Location, ResolvedConflict, ValueWrite};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Outcome of a command.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandResult {
    /// Key the command addressed, or the key the store generated.
    pub key: String,
    pub not_found: bool,
    /// Causal context returned by the store, if any.
    pub vclock: Option<CausalContext>,
}

/// A bucket within a bucket type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Bucket {
    name: String,
    bucket_type: String,
}

impl Bucket {
    #[must_use]
    pub fn new(name: impl Into<String>, bucket_type: impl Into<String>) -> Self {
        Bucket {
            name: name.into(),
            bucket_type: bucket_type.into(),
        }
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn bucket_type(&self) -> &str {
        &self.bucket_type
    }

    fn location(&self, key: Option<String>) -> Location {
        let location = Location::new(self.name.clone(), self.bucket_type.clone());
        match key {
            Some(key) => location.with_key(key),
            None => location,
        }
    }

    /// Fetch a map and decode it into a record.
    #[must_use]
    pub fn get(&self, key: impl Into<String>) -> GetMap {
        GetMap {
            location: self.location(Some(key.into())),
        }
    }

    /// Encode a record and apply it as a map update.
    ///
    /// Encoding happens here; an encode error is returned by `run`.
    #[must_use]
    pub fn insert<T: CrdtRecord>(&self, value: &T) -> InsertMap {
        InsertMap {
            bucket: self.clone(),
            key: None,
            update: encode(value, None),
        }
    }

    /// Store a value serialized as JSON.
    #[must_use]
    pub fn set_json<T: Serialize>(&self, value: &T) -> SetValue {
        let body = serde_json::to_vec(value).map(Bytes::from).map_err(MapperError::from);
        SetValue::new(self.clone(), body, "application/json")
    }

    /// Store raw bytes.
    #[must_use]
    pub fn set_raw(&self, value: impl Into<Bytes>) -> SetValue {
        SetValue::new(self.clone(), Ok(value.into()), "application/octet-stream")
    }

    /// Fetch a plain value, resolving siblings when needed.
    #[must_use]
    pub fn get_value(&self, key: impl Into<String>) -> GetValue {
        GetValue {
            location: self.location(Some(key.into())),
            resolver: None,
        }
    }

    /// Fetch a JSON value. Shorthand for `get_value(key)` followed by
    /// [`GetValue::run_json`].
    #[must_use]
    pub fn get_json(&self, key: impl Into<String>) -> GetValue {
        self.get_value(key)
    }

    /// Fetch raw bytes. Shorthand for `get_value(key)` followed by
    /// [`GetValue::run_raw`].
    #[must_use]
    pub fn get_raw(&self, key: impl Into<String>) -> GetValue {
        self.get_value(key)
    }

    #[must_use]
    pub fn delete(&self, key: impl Into<String>) -> DeleteValue {
        DeleteValue {
            location: self.location(Some(key.into())),
        }
    }

    #[must_use]
    pub fn list_keys(&self) -> ListKeys {
        ListKeys {
            location: self.location(None),
        }
    }

    /// Keys whose secondary index `index` holds `value`.
    #[must_use]
    pub fn keys_in_index(&self, index: impl Into<String>, value: impl Into<String>) -> KeysInIndex {
        KeysInIndex {
            location: self.location(None),
            index: index.into(),
            value: value.into(),
            limit: None,
        }
    }
}

fn log_command(session: &Session, command: &str, location: &Location) {
    if session.config().enable_logging {
        debug!(command, location = %location, "running command");
    }
}

/// Map fetch.
#[derive(Clone, Debug)]
pub struct GetMap {
    location: Location,
}

impl GetMap {
    /// Fetch and decode into `out`. A missing key is `MapperError::NotFound`.
    pub async fn run<T: CrdtRecord + Clone>(
        self,
        session: &Session,
        out: &mut T,
    ) -> Result<CommandResult> {
        let result = self.run_optional(session, out).await?;
        if result.not_found {
            return Err(MapperError::NotFound { key: result.key });
        }
        Ok(result)
    }

    /// Like [`run`](Self::run), but reports a missing key through
    /// `CommandResult::not_found` and leaves `out` untouched.
    pub async fn run_optional<T: CrdtRecord + Clone>(
        self,
        session: &Session,
        out: &mut T,
    ) -> Result<CommandResult> {
        log_command(session, "get", &self.location);
        let fetched = session.transport().fetch_map(&self.location).await?;
        let result = ensure_success(fetched, "fetch map")?;
        let key = self.location.key.unwrap_or_default();

        let map = match result.map {
            Some(map) if !result.not_found => map,
            _ => {
                return Ok(CommandResult {
                    key,
                    not_found: true,
                    vclock: None,
                })
            }
        };

        decode_with_context(&map, result.context.clone(), out)?;
        Ok(CommandResult {
            key,
            not_found: false,
            vclock: result.context,
        })
    }
}

/// Map update built from an encoded record.
#[derive(Clone, Debug)]
pub struct InsertMap {
    bucket: Bucket,
    key: Option<String>,
    update: Result<MapUpdate>,
}

impl InsertMap {
    /// Store under `key` instead of a store-generated key.
    #[must_use]
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Merge the update against `context`, overriding any embedded context.
    #[must_use]
    pub fn context(mut self, context: CausalContext) -> Self {
        if let Ok(update) = &mut self.update {
            if let Some(context) = context.non_empty() {
                update.context = Some(context);
            }
        }
        self
    }

    pub async fn run(self, session: &Session) -> Result<CommandResult> {
        let update = self.update?;
        let location = self.bucket.location(self.key.clone());
        log_command(session, "insert", &location);

        let result = ensure_success(
            session
                .transport()
                .update_map(&location, update.operation, update.context)
                .await?,
            "update map",
        )?;
        Ok(CommandResult {
            key: self.key.or(result.generated_key).unwrap_or_default(),
            not_found: false,
            vclock: result.context,
        })
    }
}

/// Plain value store.
#[derive(Clone, Debug)]
pub struct SetValue {
    bucket: Bucket,
    key: Option<String>,
    body: Result<Bytes>,
    content_type: String,
    vclock: Option<CausalContext>,
    indexes: Vec<(String, String)>,
}

impl SetValue {
    fn new(bucket: Bucket, body: Result<Bytes>, content_type: &str) -> Self {
        SetValue {
            bucket,
            key: None,
            body,
            content_type: content_type.to_string(),
            vclock: None,
            indexes: Vec::new(),
        }
    }

    #[must_use]
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Overwrite the values covered by `vclock`.
    #[must_use]
    pub fn vclock(mut self, vclock: CausalContext) -> Self {
        self.vclock = vclock.non_empty();
        self
    }

    /// Add a secondary index entry.
    #[must_use]
    pub fn add_to_index(mut self, index: impl Into<String>, value: impl Into<String>) -> Self {
        self.indexes.push((index.into(), value.into()));
        self
    }

    #[must_use]
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    pub async fn run(self, session: &Session) -> Result<CommandResult> {
        let body = self.body?;
        let location = self.bucket.location(self.key.clone());
        log_command(session, "set", &location);

        let mut write = ValueWrite::new(body, self.content_type);
        write.vclock = self.vclock;
        write.indexes = self.indexes;

        let stored = session.transport().store_value(&location, write).await?;
        let result = ensure_success(stored, "store value")?;
        Ok(CommandResult {
            key: self.key.or(result.generated_key).unwrap_or_default(),
            not_found: false,
            vclock: result.context,
        })
    }
}

/// Plain value fetch with sibling resolution.
#[derive(Clone)]
pub struct GetValue {
    location: Location,
    resolver: Option<ResolveFn>,
}

impl std::fmt::Debug for GetValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GetValue")
            .field("location", &self.location)
            .field("resolver", &self.resolver.is_some())
            .finish()
    }
}

impl GetValue {
    /// Resolve siblings with `f` for this call, ahead of any registered
    /// capability.
    #[must_use]
    pub fn conflict_resolver<F>(mut self, f: F) -> Self
    where
        F: Fn(&[ConflictObject]) -> ResolvedConflict + Send + Sync + 'static,
    {
        self.resolver = Some(Arc::new(f));
        self
    }

    /// Fetch and deserialize JSON.
    ///
    /// Without an explicit resolver, siblings are resolved with the function
    /// registered for `T` on the session.
    pub async fn run_json<T: DeserializeOwned + 'static>(
        self,
        session: &Session,
    ) -> Result<(T, CommandResult)> {
        let fallback = session.resolvers().get::<T>();
        let (value, result) = self.fetch(session, fallback).await?;
        Ok((serde_json::from_slice(&value)?, result))
    }

    /// Fetch the stored bytes.
    pub async fn run_raw(self, session: &Session) -> Result<(Bytes, CommandResult)> {
        let fallback = session.resolvers().get::<Bytes>();
        self.fetch(session, fallback).await
    }

    async fn fetch(
        self,
        session: &Session,
        fallback: Option<ResolveFn>,
    ) -> Result<(Bytes, CommandResult)> {
        log_command(session, "get_value", &self.location);
        let fetched = session.transport().fetch_value(&self.location).await?;
        let result = ensure_success(fetched, "fetch value")?;
        let key = self.location.key().unwrap_or_default().to_string();
        if result.not_found || result.values.is_empty() {
            return Err(MapperError::NotFound { key });
        }

        let resolver = self.resolver.or(fallback);
        let resolution = SiblingResolver::new(session.transport(), session.config())
            .resolve(&self.location, result.values, resolver.as_ref())
            .await?;
        Ok((
            resolution.value,
            CommandResult {
                key,
                not_found: false,
                vclock: Some(resolution.vclock),
            },
        ))
    }
}

#[derive(Clone, Debug)]
pub struct DeleteValue {
    location: Location,
}

impl DeleteValue {
    pub async fn run(self, session: &Session) -> Result<CommandResult> {
        log_command(session, "delete", &self.location);
        let deleted = session.transport().delete_value(&self.location).await?;
        let result = ensure_success(deleted, "delete value")?;
        Ok(CommandResult {
            key: self.location.key.unwrap_or_default(),
            not_found: result.not_found,
            vclock: None,
        })
    }
}

#[derive(Clone, Debug)]
pub struct ListKeys {
    location: Location,
}

impl ListKeys {
    pub async fn run(self, session: &Session) -> Result<Vec<String>> {
        log_command(session, "list_keys", &self.location);
        let listed = session.transport().list_keys(&self.location).await?;
        let result = ensure_success(listed, "list keys")?;
        Ok(result.keys)
    }
}

#[derive(Clone, Debug)]
pub struct KeysInIndex {
    location: Location,
    index: String,
    value: String,
    limit: Option<u32>,
}

impl KeysInIndex {
    /// Return at most `limit` keys. A limit of 0 means unlimited.
    #[must_use]
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub async fn run(self, session: &Session) -> Result<Vec<String>> {
        log_command(session, "keys_in_index", &self.location);
        let limit = self.limit.unwrap_or(session.config().max_index_results);
        let result = ensure_success(
            session
                .transport()
                .index_query(&self.location, &self.index, &self.value, limit)
                .await?,
            "index query",
        )?;
        Ok(result.keys)
    }
}
