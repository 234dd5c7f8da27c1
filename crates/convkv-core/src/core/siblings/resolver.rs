//! Sibling resolution with write-back.
//!
//! A plain-value fetch can return several siblings when the store could not
//! order concurrent writes. Resolution runs in two steps:
//!
//! 1. [`resolve_siblings`] picks one value. It is pure: a single sibling is
//!    returned as-is, several are handed to the resolution function, and a
//!    result with an empty causal context is rejected.
//! 2. [`SiblingResolver::resolve`] writes the chosen value back under its
//!    context so later readers see one value. How a failed write-back is
//!    reported follows the configured [`WritePolicy`].

use crate::core::config::{ClientConfig, WritePolicy};
use crate::core::error::{MapperError, Result};
use crate::core::siblings::ResolveFn;
use bytes::Bytes;
use convkv_wire::{
    CausalContext, ConflictObject, Location, RawObject, Transport, TransportError, ValueWrite,
};
use tracing::{debug, warn};

/// The value a fetch settled on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub value: Bytes,
    pub vclock: CausalContext,
    /// Number of siblings the fetch observed.
    pub siblings: usize,
}

impl Resolution {
    #[inline]
    #[must_use]
    pub fn had_conflict(&self) -> bool {
        self.siblings > 1
    }
}

/// Choose one value among `siblings`.
///
/// An empty list is reported as `NotFound` with an empty key.
pub fn resolve_siblings(
    siblings: Vec<ConflictObject>,
    resolver: Option<&ResolveFn>,
) -> Result<Resolution> {
    let count = siblings.len();
    match count {
        0 => Err(MapperError::NotFound { key: String::new() }),
        1 => {
            let only = siblings
                .into_iter()
                .next()
                .ok_or(MapperError::NotFound { key: String::new() })?;
            Ok(Resolution {
                value: only.value,
                vclock: only.vclock,
                siblings: 1,
            })
        }
        _ => {
            let resolve = resolver.ok_or(MapperError::NoConflictResolver)?;
            let resolved = resolve(siblings.as_slice());
            if !resolved.is_valid() {
                return Err(MapperError::InvalidResolution);
            }
            Ok(Resolution {
                value: resolved.value,
                vclock: resolved.vclock,
                siblings: count,
            })
        }
    }
}

/// Resolves fetched siblings and writes the result back through a transport.
pub struct SiblingResolver<'a> {
    transport: &'a dyn Transport,
    policy: WritePolicy,
    enabled: bool,
}

impl<'a> SiblingResolver<'a> {
    #[must_use]
    pub fn new(transport: &'a dyn Transport, config: &ClientConfig) -> Self {
        SiblingResolver {
            transport,
            policy: config.write_back_policy,
            enabled: config.resolve_siblings,
        }
    }

    /// Resolve the raw values fetched from `location`.
    ///
    /// Issues exactly one write-back when more than one sibling was fetched
    /// and a valid resolution was produced, and none otherwise.
    pub async fn resolve(
        &self,
        location: &Location,
        values: Vec<RawObject>,
        resolver: Option<&ResolveFn>,
    ) -> Result<Resolution> {
        let key = || location.key().unwrap_or_default().to_string();
        if values.is_empty() {
            return Err(MapperError::NotFound { key: key() });
        }

        let content_type = values[0].content_type.clone();
        if values.len() > 1 {
            warn!(location = %location, siblings = values.len(), "fetch returned siblings");
        }
        let resolver = if self.enabled { resolver } else { None };

        let siblings = values.into_iter().map(ConflictObject::from).collect();
        let resolution = resolve_siblings(siblings, resolver)?;
        if !resolution.had_conflict() {
            return Ok(resolution);
        }

        match self.write_back(location, &resolution, content_type).await {
            Ok(()) => {
                debug!(location = %location, siblings = resolution.siblings, "conflict resolved");
                Ok(resolution)
            }
            Err(e) => match self.policy {
                WritePolicy::Surface => Err(MapperError::WriteBack(e)),
                WritePolicy::LogOnly => {
                    warn!(location = %location, "write-back of resolved conflict failed: {}", e);
                    Ok(resolution)
                }
            },
        }
    }

    async fn write_back(
        &self,
        location: &Location,
        resolution: &Resolution,
        content_type: String,
    ) -> std::result::Result<(), TransportError> {
        let write = ValueWrite::new(resolution.value.clone(), content_type)
            .with_vclock(resolution.vclock.clone());
        let result = self.transport.store_value(location, write).await?;
        if result.success {
            Ok(())
        } else {
            Err(TransportError::Unsuccessful(format!("write-back to {}", location)))
        }
    }
}
