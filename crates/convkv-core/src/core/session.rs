//! Session: a transport paired with its configuration.

use crate::core::command::Bucket;
use crate::core::config::ClientConfig;
use crate::core::error::Result;
use crate::core::siblings::{ConflictResolvable, ResolverRegistry};
use convkv_wire::{RawCommandResult, Transport, TransportError};
use std::fmt;
use std::sync::Arc;

/// A handle commands run against.
///
/// Cheap to clone; clones share the transport and the resolver registry.
#[derive(Clone)]
pub struct Session {
    transport: Arc<dyn Transport>,
    config: Arc<ClientConfig>,
    resolvers: ResolverRegistry,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("resolvers", &self.resolvers)
            .finish_non_exhaustive()
    }
}

impl Session {
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, config: ClientConfig) -> Self {
        Session {
            transport,
            config: Arc::new(config),
            resolvers: ResolverRegistry::new(),
        }
    }

    #[must_use]
    pub fn with_defaults(transport: Arc<dyn Transport>) -> Self {
        Self::new(transport, ClientConfig::default())
    }

    #[inline]
    #[must_use]
    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    #[inline]
    #[must_use]
    pub fn resolvers(&self) -> &ResolverRegistry {
        &self.resolvers
    }

    /// Make `T`'s own sibling resolution available to `get_json::<T>`.
    pub fn register_conflict_resolver<T: ConflictResolvable>(&self) {
        self.resolvers.register::<T>();
    }

    /// Open a bucket with the configured default bucket type.
    #[must_use]
    pub fn bucket(&self, name: impl Into<String>) -> Bucket {
        Bucket::new(name, self.config.default_bucket_type.clone())
    }
}

/// Turn an unsuccessful raw result into an error.
pub(crate) fn ensure_success(result: RawCommandResult, what: &str) -> Result<RawCommandResult> {
    if result.success {
        Ok(result)
    } else {
        Err(TransportError::Unsuccessful(what.to_string()).into())
    }
}
