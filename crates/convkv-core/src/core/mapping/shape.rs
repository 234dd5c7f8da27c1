//! Static description of how a Rust type can be stored.

use convkv_wire::CrdtKind;

/// The structural shape of a mappable type.
///
/// Every [`CrdtValue`](crate::CrdtValue) reports its shape; the field mapping
/// resolver derives the CRDT kind from it without inspecting values.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Shape {
    /// `u8`: a counter on its own, a byte inside a sequence.
    Byte,
    Integer,
    Bool,
    Text,
    Bytes,
    FixedBytes(usize),
    /// A registered record type.
    Record(&'static str),
    /// String-keyed mapping with values of the inner shape.
    Mapping(Box<Shape>),
    /// Homogeneous sequence of the inner shape.
    Sequence(Box<Shape>),
    Optional(Box<Shape>),
    /// An embedded causal context slot; never stored as a map entry.
    Context,
    Unsupported,
}

impl Shape {
    /// Byte-comparable shapes that can be stored in a register or as a set
    /// member.
    #[must_use]
    pub fn is_register_like(&self) -> bool {
        matches!(self, Shape::Text | Shape::Bytes | Shape::FixedBytes(_))
    }

    fn is_set_member(&self) -> bool {
        self.is_register_like() || matches!(self, Shape::Integer)
    }

    /// The kind a field of this shape maps to, or `None` when the shape
    /// cannot be stored.
    #[must_use]
    pub fn natural_kind(&self) -> Option<CrdtKind> {
        match self {
            Shape::Byte | Shape::Integer => Some(CrdtKind::Counter),
            Shape::Bool => Some(CrdtKind::Flag),
            Shape::Text | Shape::Bytes | Shape::FixedBytes(_) => Some(CrdtKind::Register),
            Shape::Record(_) => Some(CrdtKind::Map),
            Shape::Mapping(inner) => inner.natural_kind().map(|_| CrdtKind::Map),
            Shape::Sequence(inner) if inner.is_set_member() => Some(CrdtKind::Set),
            Shape::Sequence(_) => None,
            Shape::Optional(inner) => inner.natural_kind(),
            Shape::Context | Shape::Unsupported => None,
        }
    }

    /// Check whether a field of this shape may be stored as `kind`.
    ///
    /// Integers may be stored as decimal registers in place of counters.
    #[must_use]
    pub fn admits(&self, kind: CrdtKind) -> bool {
        match self {
            Shape::Optional(inner) => inner.admits(kind),
            Shape::Byte | Shape::Integer => {
                matches!(kind, CrdtKind::Counter | CrdtKind::Register)
            }
            other => other.natural_kind() == Some(kind),
        }
    }

    /// Name of the nested record type, looking through `Option`.
    #[must_use]
    pub fn nested_record(&self) -> Option<&'static str> {
        match self {
            Shape::Record(name) => Some(name),
            Shape::Optional(inner) => inner.nested_record(),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_optional(&self) -> bool {
        matches!(self, Shape::Optional(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_kinds() {
        assert_eq!(Shape::Text.natural_kind(), Some(CrdtKind::Register));
        assert_eq!(Shape::FixedBytes(16).natural_kind(), Some(CrdtKind::Register));
        assert_eq!(Shape::Integer.natural_kind(), Some(CrdtKind::Counter));
        assert_eq!(Shape::Bool.natural_kind(), Some(CrdtKind::Flag));
    }

    #[test]
    fn test_sequences() {
        let strings = Shape::Sequence(Box::new(Shape::Text));
        assert_eq!(strings.natural_kind(), Some(CrdtKind::Set));
        let records = Shape::Sequence(Box::new(Shape::Record("Address")));
        assert_eq!(records.natural_kind(), None);
        let nested = Shape::Sequence(Box::new(Shape::Sequence(Box::new(Shape::Text))));
        assert_eq!(nested.natural_kind(), None);
        let flags = Shape::Sequence(Box::new(Shape::Bool));
        assert_eq!(flags.natural_kind(), None);
    }

    #[test]
    fn test_mapping_requires_storable_values() {
        assert_eq!(
            Shape::Mapping(Box::new(Shape::Integer)).natural_kind(),
            Some(CrdtKind::Map)
        );
        assert_eq!(Shape::Mapping(Box::new(Shape::Unsupported)).natural_kind(), None);
    }

    #[test]
    fn test_integer_register_override_admitted() {
        assert!(Shape::Integer.admits(CrdtKind::Register));
        assert!(Shape::Optional(Box::new(Shape::Integer)).admits(CrdtKind::Register));
        assert!(!Shape::Text.admits(CrdtKind::Set));
        assert!(!Shape::Bool.admits(CrdtKind::Register));
    }
}
