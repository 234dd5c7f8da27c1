//! Read-side CRDT response tree.

use crate::types::CrdtKind;
use bytes::Bytes;
use std::collections::BTreeMap;

/// One stored CRDT value as returned by a map fetch.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ResponseValue {
    Register(Bytes),
    /// Set members. The store gives no ordering guarantee.
    Set(Vec<Bytes>),
    Counter(i64),
    Flag(bool),
    Map(MapValue),
}

impl ResponseValue {
    #[must_use]
    pub fn kind(&self) -> CrdtKind {
        match self {
            ResponseValue::Register(_) => CrdtKind::Register,
            ResponseValue::Set(_) => CrdtKind::Set,
            ResponseValue::Counter(_) => CrdtKind::Counter,
            ResponseValue::Flag(_) => CrdtKind::Flag,
            ResponseValue::Map(_) => CrdtKind::Map,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_map(&self) -> Option<&MapValue> {
        match self {
            ResponseValue::Map(m) => Some(m),
            _ => None,
        }
    }
}

/// A fetched CRDT map: storage key to stored value.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct MapValue {
    entries: BTreeMap<String, ResponseValue>,
}

impl MapValue {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_entry(mut self, key: impl Into<String>, value: ResponseValue) -> Self {
        self.entries.insert(key.into(), value);
        self
    }

    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: ResponseValue,
    ) -> Option<ResponseValue> {
        self.entries.insert(key.into(), value)
    }

    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ResponseValue> {
        self.entries.get(key)
    }

    #[inline]
    pub fn get_mut(&mut self, key: &str) -> Option<&mut ResponseValue> {
        self.entries.get_mut(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<ResponseValue> {
        self.entries.remove(key)
    }

    #[inline]
    pub fn entry(
        &mut self,
        key: String,
    ) -> std::collections::btree_map::Entry<'_, String, ResponseValue> {
        self.entries.entry(key)
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

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ResponseValue)> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }
}

impl FromIterator<(String, ResponseValue)> for MapValue {
    fn from_iter<I: IntoIterator<Item = (String, ResponseValue)>>(iter: I) -> Self {
        MapValue {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tags() {
        assert_eq!(ResponseValue::Register(Bytes::new()).kind(), CrdtKind::Register);
        assert_eq!(ResponseValue::Set(vec![]).kind(), CrdtKind::Set);
        assert_eq!(ResponseValue::Counter(3).kind(), CrdtKind::Counter);
        assert_eq!(ResponseValue::Flag(true).kind(), CrdtKind::Flag);
        assert_eq!(ResponseValue::Map(MapValue::new()).kind(), CrdtKind::Map);
    }

    #[test]
    fn test_nested_lookup() {
        let inner =
            MapValue::new().with_entry("City", ResponseValue::Register(Bytes::from("Oslo")));
        let outer = MapValue::new().with_entry("Address", ResponseValue::Map(inner));

        let city = outer
            .get("Address")
            .and_then(ResponseValue::as_map)
            .and_then(|m| m.get("City"));
        assert_eq!(city, Some(&ResponseValue::Register(Bytes::from("Oslo"))));
        assert!(outer.get("Missing").is_none());
    }

    #[test]
    fn test_json_shape() {
        let map = MapValue::new()
            .with_entry("Visits", ResponseValue::Counter(4))
            .with_entry("Active", ResponseValue::Flag(true));
        let json = serde_json::to_value(&map).unwrap();
        assert_eq!(json["Visits"]["type"], "counter");
        assert_eq!(json["Visits"]["value"], 4);
        let back: MapValue = serde_json::from_value(json).unwrap();
        assert_eq!(back, map);
    }
}
