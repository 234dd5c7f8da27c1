//! Write-side CRDT operation tree.
//!
//! An operation tree is built fresh for each update and describes only the
//! keys the writer intends to change. Keys that are absent from a
//! [`MapOperation`] are left untouched by the store, so concurrent updates to
//! other keys of the same map are preserved.

use crate::types::{CrdtKind, MapValue, ResponseValue};
use bytes::Bytes;
use std::collections::{BTreeMap, BTreeSet};

/// A typed update against one CRDT value.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", content = "op", rename_all = "snake_case")]
pub enum Operation {
    /// Overwrite the register with these bytes.
    Register(Bytes),
    Set(SetOperation),
    /// Increment to apply, not the target value.
    Counter(i64),
    Flag(bool),
    Map(MapOperation),
}

impl Operation {
    #[must_use]
    pub fn kind(&self) -> CrdtKind {
        match self {
            Operation::Register(_) => CrdtKind::Register,
            Operation::Set(_) => CrdtKind::Set,
            Operation::Counter(_) => CrdtKind::Counter,
            Operation::Flag(_) => CrdtKind::Flag,
            Operation::Map(_) => CrdtKind::Map,
        }
    }

    /// The value a store would hold after applying this operation to an
    /// empty key.
    #[must_use]
    pub fn as_response(&self) -> ResponseValue {
        match self {
            Operation::Register(bytes) => ResponseValue::Register(bytes.clone()),
            Operation::Set(set) => ResponseValue::Set(
                set.adds
                    .iter()
                    .filter(|member| !set.removes.contains(*member))
                    .cloned()
                    .collect(),
            ),
            Operation::Counter(delta) => ResponseValue::Counter(*delta),
            Operation::Flag(flag) => ResponseValue::Flag(*flag),
            Operation::Map(map) => ResponseValue::Map(map.as_response_tree()),
        }
    }
}

/// Members to add to and remove from a set.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SetOperation {
    pub adds: BTreeSet<Bytes>,
    pub removes: BTreeSet<Bytes>,
}

impl SetOperation {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn adding<I, B>(members: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        SetOperation {
            adds: members.into_iter().map(Into::into).collect(),
            removes: BTreeSet::new(),
        }
    }

    pub fn add(&mut self, member: impl Into<Bytes>) {
        self.adds.insert(member.into());
    }

    pub fn remove(&mut self, member: impl Into<Bytes>) {
        self.removes.insert(member.into());
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.adds.is_empty() && self.removes.is_empty()
    }
}

/// Updates to apply to the entries of a CRDT map, keyed by storage key.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct MapOperation {
    entries: BTreeMap<String, Operation>,
}

impl MapOperation {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, op: Operation) -> Option<Operation> {
        self.entries.insert(key.into(), op)
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, op: Operation) -> Self {
        self.entries.insert(key.into(), op);
        self
    }

    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Operation> {
        self.entries.get(key)
    }

    #[inline]
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Operation)> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    /// Mirror this update as the response tree an empty map would return
    /// after applying it.
    #[must_use]
    pub fn as_response_tree(&self) -> MapValue {
        self.entries
            .iter()
            .map(|(key, op)| (key.clone(), op.as_response()))
            .collect()
    }
}

impl IntoIterator for MapOperation {
    type Item = (String, Operation);
    type IntoIter = std::collections::btree_map::IntoIter<String, Operation>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_operation_builders() {
        let mut set = SetOperation::adding(["a", "b"]);
        set.remove("c");
        assert_eq!(set.adds.len(), 2);
        assert!(set.removes.contains(&Bytes::from("c")));
        assert!(!set.is_empty());
        assert!(SetOperation::new().is_empty());
    }

    #[test]
    fn test_response_tree_mirrors_operations() {
        let address = MapOperation::new().with("City", Operation::Register(Bytes::from("Oslo")));
        let op = MapOperation::new()
            .with("Address", Operation::Map(address))
            .with("Logins", Operation::Counter(2))
            .with("Admin", Operation::Flag(false))
            .with("Tags", Operation::Set(SetOperation::adding(["x", "y"])));

        let tree = op.as_response_tree();
        assert_eq!(tree.len(), 4);
        assert_eq!(tree.get("Logins"), Some(&ResponseValue::Counter(2)));
        assert_eq!(tree.get("Admin"), Some(&ResponseValue::Flag(false)));
        match tree.get("Tags") {
            Some(ResponseValue::Set(members)) => assert_eq!(members.len(), 2),
            other => panic!("unexpected tags entry: {:?}", other),
        }
        let city = tree
            .get("Address")
            .and_then(ResponseValue::as_map)
            .and_then(|m| m.get("City"));
        assert_eq!(city, Some(&ResponseValue::Register(Bytes::from("Oslo"))));
    }

    #[test]
    fn test_removed_members_not_mirrored() {
        let mut set = SetOperation::adding(["keep", "drop"]);
        set.remove("drop");
        assert_eq!(
            Operation::Set(set).as_response(),
            ResponseValue::Set(vec![Bytes::from("keep")])
        );
    }
}
