//! Causal context token threaded from a read into the following update.

use bytes::Bytes;
use std::fmt;

/// An opaque causal context issued by the store.
///
/// The token describes the replica's view of prior writes (a vector clock in
/// most stores). It is stored and forwarded, never interpreted or rewritten.
#[derive(Clone, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct CausalContext(Bytes);

impl CausalContext {
    /// Wrap raw token bytes as received from the store.
    #[inline]
    #[must_use]
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        CausalContext(bytes.into())
    }

    /// The absent token used for first-ever writes.
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        CausalContext(Bytes::new())
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[inline]
    #[must_use]
    pub fn into_bytes(self) -> Bytes {
        self.0
    }

    /// `None` for an empty token, so callers can treat "absent" and "empty"
    /// the same way.
    #[inline]
    #[must_use]
    pub fn non_empty(self) -> Option<Self> {
        if self.is_empty() {
            None
        } else {
            Some(self)
        }
    }
}

impl fmt::Debug for CausalContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CausalContext({} bytes)", self.0.len())
    }
}

impl From<Bytes> for CausalContext {
    #[inline]
    fn from(bytes: Bytes) -> Self {
        CausalContext(bytes)
    }
}

impl From<Vec<u8>> for CausalContext {
    #[inline]
    fn from(bytes: Vec<u8>) -> Self {
        CausalContext(Bytes::from(bytes))
    }
}

impl From<&'static [u8]> for CausalContext {
    #[inline]
    fn from(bytes: &'static [u8]) -> Self {
        CausalContext(Bytes::from_static(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_context() {
        let ctx = CausalContext::empty();
        assert!(ctx.is_empty());
        assert_eq!(ctx.non_empty(), None);
    }

    #[test]
    fn test_bytes_pass_through_unchanged() {
        let raw = vec![0u8, 255, 17, 42];
        let ctx = CausalContext::from(raw.clone());
        assert_eq!(ctx.as_bytes(), raw.as_slice());
        assert_eq!(ctx.clone().non_empty(), Some(ctx.clone()));
        assert_eq!(ctx.into_bytes().to_vec(), raw);
    }

    #[test]
    fn test_debug_hides_contents() {
        let ctx = CausalContext::from(&b"secret-clock"[..]);
        assert_eq!(format!("{:?}", ctx), "CausalContext(12 bytes)");
    }
}
