use bytes::Bytes;
use convkv_core::mapping::resolve;
use convkv_core::{
    crdt_record, decode, decode_with_context, encode, CausalContext, CrdtKind, DecodeErrorKind,
    MapValue, MapperError, Operation, ResponseValue,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

crdt_record! {
    #[derive(Clone, Debug, Default, PartialEq)]
    pub struct Address {
        pub city: String,
        #[crdt("zip,register")]
        pub zip_code: u32,
    }
}

crdt_record! {
    #[derive(Clone, Debug, Default, PartialEq)]
    pub struct Person {
        #[crdt("Name,")]
        pub name: String,
        pub age: i64,
        pub admin: bool,
        pub avatar: Vec<u8>,
        pub id: [u8; 4],
        pub aliases: Vec<String>,
        pub groups: HashSet<String>,
        pub scores: BTreeMap<String, i64>,
        pub address: Address,
        pub previous: Option<Address>,
        pub context: CausalContext,
    }
}

crdt_record! {
    #[derive(Clone, Debug)]
    pub struct WithCallback {
        pub name: String,
        pub on_change: fn(i32) -> i32,
    }
}

crdt_record! {
    #[derive(Clone, Debug)]
    pub struct Outer {
        pub inner: WithCallback,
    }
}

crdt_record! {
    #[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
    pub struct Article {
        /// Shown in listings.
        #[crdt("title,")]
        #[serde(rename = "t")]
        pub name: String,
        #[serde(default)]
        /// Read count.
        pub views: i64,
    }
}

fn sample() -> Person {
    Person {
        name: "Ada".into(),
        age: 36,
        admin: true,
        avatar: vec![0xff, 0x00, 0x10],
        id: *b"u-01",
        aliases: vec!["countess".into()],
        groups: ["math".to_string(), "poetry".to_string()].into_iter().collect(),
        scores: [("chess".to_string(), 3)].into_iter().collect(),
        address: Address {
            city: "London".into(),
            zip_code: 10001,
        },
        previous: None,
        context: CausalContext::empty(),
    }
}

#[test]
fn test_round_trip_through_response_tree() {
    let person = sample();
    let update = encode(&person, None).expect("encode should succeed");

    // 1. The response tree a store would return for this update
    let response = update.operation.as_response_tree();

    // 2. Decoding into a zero record gives back the original
    let mut back = Person::default();
    decode(&response, &mut back).expect("decode should succeed");
    assert_eq!(back, person);
}

#[test]
fn test_empty_fields_are_omitted() {
    let person = Person {
        name: "Ada".into(),
        ..Person::default()
    };
    let update = encode(&person, None).unwrap();
    let keys: Vec<&String> = update.operation.keys().collect();

    // bool and fixed-size byte arrays are always written
    assert_eq!(keys, ["Name", "admin", "id"]);
    assert_eq!(update.operation.get("admin"), Some(&Operation::Flag(false)));
    assert!(!update.operation.contains_key("address"));
    assert!(!update.operation.contains_key("context"));
}

#[test]
fn test_tags_rename_and_override_kind() {
    let update = encode(&sample(), None).unwrap();
    assert!(update.operation.contains_key("Name"));
    assert!(!update.operation.contains_key("name"));

    match update.operation.get("address") {
        Some(Operation::Map(address)) => {
            assert_eq!(address.get("zip"), Some(&Operation::Register(Bytes::from("10001"))));
            assert_eq!(address.get("city"), Some(&Operation::Register(Bytes::from("London"))));
        }
        other => panic!("address should be a nested map, got {:?}", other),
    }
    assert_eq!(update.operation.get("age").map(Operation::kind), Some(CrdtKind::Counter));
    assert_eq!(update.operation.get("groups").map(Operation::kind), Some(CrdtKind::Set));
}

#[test]
fn test_unsupported_field_fails_encode_and_decode() {
    let value = WithCallback {
        name: "x".into(),
        on_change: |n| n + 1,
    };
    let err = encode(&value, None).unwrap_err();
    assert!(
        matches!(err, MapperError::UnsupportedType { ref path, .. } if path == "on_change"),
        "got {:?}",
        err
    );

    let mut dest = value.clone();
    let err = decode(&MapValue::new(), &mut dest).unwrap_err();
    assert!(matches!(err, MapperError::UnsupportedType { .. }));
    assert_eq!(dest.name, "x");
}

#[test]
fn test_unsupported_nested_field_reports_full_path() {
    let err = resolve::<Outer>().unwrap_err();
    assert_eq!(err.path(), Some("inner.on_change"));
}

#[test]
fn test_nested_decode_error_path() {
    let response = MapValue::new().with_entry(
        "address",
        ResponseValue::Map(MapValue::new().with_entry("city", ResponseValue::Counter(3))),
    );
    let mut dest = sample();
    let err = decode(&response, &mut dest).unwrap_err();

    assert_eq!(err.path(), Some("address.city"));
    assert!(matches!(
        err,
        MapperError::Decode {
            kind: DecodeErrorKind::TypeMismatch {
                expected: CrdtKind::Register,
                found: CrdtKind::Counter
            },
            ..
        }
    ));
    assert_eq!(dest, sample(), "a failed decode must not touch the destination");
    assert!(err.to_string().starts_with("address.city: DecodeError: TypeMismatch"));
}

#[test]
fn test_context_round_trips_through_record() {
    let mut person = Person::default();
    let response = encode(&sample(), None).unwrap().operation.as_response_tree();
    decode_with_context(&response, Some(CausalContext::from(&b"ctx-1"[..])), &mut person).unwrap();
    assert_eq!(person.context.as_bytes(), b"ctx-1");

    // The embedded context is picked up by the next encode
    let update = encode(&person, None).unwrap();
    assert_eq!(update.context, Some(CausalContext::from(&b"ctx-1"[..])));

    // An explicit context takes precedence
    let update = encode(&person, Some(CausalContext::from(&b"ctx-2"[..]))).unwrap();
    assert_eq!(update.context, Some(CausalContext::from(&b"ctx-2"[..])));
}

#[test]
fn test_descriptor_is_stable() {
    let first = resolve::<Person>().unwrap();
    let second = resolve::<Person>().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.context_field(), Some("context"));
    assert_eq!(first.by_storage_key("Name").map(|m| m.field), Some("name"));
    assert_eq!(first.by_storage_key("zip"), None);
}

#[test]
fn test_concurrent_resolution_shares_descriptor() {
    let handles: Vec<_> = (0..16)
        .map(|_| std::thread::spawn(|| resolve::<Address>().unwrap()))
        .collect();
    let all: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(all.iter().all(|d| Arc::ptr_eq(d, &all[0])));
}

#[test]
fn test_field_attributes_kept_beside_tags() {
    let article = Article {
        name: "Release notes".into(),
        views: 12,
    };

    // 1. The crdt tag still renames the storage key
    let update = encode(&article, None).unwrap();
    let keys: Vec<&String> = update.operation.keys().collect();
    assert_eq!(keys, ["title", "views"]);

    // 2. The other attributes stay on the field
    let json = serde_json::to_value(&article).unwrap();
    assert_eq!(json["t"], "Release notes");
    let back: Article = serde_json::from_str(r#"{"t":"x"}"#).unwrap();
    assert_eq!(back.views, 0);
}
