//! Causal context tokens issued by the memory store.
//!
//! A token lists the dots (write identifiers) the reader observed. A write
//! carrying a token replaces exactly the siblings whose dots it lists.

use bytes::Bytes;
use convkv_wire::{CausalContext, Location, TransportError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clock {
    pub dots: BTreeSet<u64>,
}

impl Clock {
    pub fn from_dots(dots: impl IntoIterator<Item = u64>) -> Self {
        Clock {
            dots: dots.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn covers(&self, dot: u64) -> bool {
        self.dots.contains(&dot)
    }

    /// Encode as an opaque context token.
    #[must_use]
    pub fn to_context(&self) -> CausalContext {
        // Serializing a set of integers cannot fail.
        let json = serde_json::to_vec(self).unwrap_or_default();
        CausalContext::new(Bytes::from(json))
    }

    /// Decode a token previously issued by [`to_context`](Self::to_context).
    pub fn from_context(
        context: &CausalContext,
        location: &Location,
    ) -> Result<Self, TransportError> {
        serde_json::from_slice(context.as_bytes())
            .map_err(|_| TransportError::InvalidContext(location.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_round_trip() {
        let clock = Clock::from_dots([3, 1, 2]);
        let loc = Location::new("b", "t").with_key("k");
        let back = Clock::from_context(&clock.to_context(), &loc).unwrap();
        assert_eq!(back, clock);
        assert!(back.covers(2));
        assert!(!back.covers(4));
    }

    #[test]
    fn test_foreign_token_rejected() {
        let loc = Location::new("b", "t").with_key("k");
        let err = Clock::from_context(&CausalContext::from(&b"\x00garbage"[..]), &loc).unwrap_err();
        assert_eq!(err, TransportError::InvalidContext("t/b/k".into()));
    }
}
