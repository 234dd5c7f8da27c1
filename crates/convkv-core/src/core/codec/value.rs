//! Per-type encoding rules.
//!
//! Every type that can appear as a record field implements [`CrdtValue`].
//! The implementation decides how the value becomes an [`Operation`] and how
//! it is read back from a [`ResponseValue`]; the field mapping descriptor only
//! decides which kind it is asked for.
//!
//! | Rust type | Kind |
//! |-----------|------|
//! | `String`, `Vec<u8>`, `Bytes`, `[u8; N]` | register |
//! | `Vec<T>`, `HashSet<T>`, `BTreeSet<T>` of byte-comparable `T` | set |
//! | integers | counter (or decimal register) |
//! | `bool` | flag |
//! | records, `HashMap<String, V>`, `BTreeMap<String, V>` | map |
//! | `Option<T>` | same as `T` |

use crate::core::error::{DecodeErrorKind, MapperError, Result};
use crate::core::mapping::Shape;
use bytes::Bytes;
use convkv_wire::{CausalContext, CrdtKind, MapOperation, Operation, ResponseValue, SetOperation};
use std::any::type_name;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::hash::Hash;
use std::sync::mpsc::{Receiver, Sender};

/// A value that can be stored as one CRDT.
///
/// The trait is object safe; associated functions that construct or
/// describe the type are restricted to `Self: Sized`.
pub trait CrdtValue: 'static {
    fn shape() -> Shape
    where
        Self: Sized;

    /// Validate nested record mappings reachable from this type.
    fn check() -> Result<()>
    where
        Self: Sized,
    {
        Ok(())
    }

    /// Encode as `kind`. `Ok(None)` means the value is empty and the entry
    /// must be left out of the update.
    fn encode_value(&self, kind: CrdtKind) -> Result<Option<Operation>>;

    /// Overwrite `self` with a response value stored as `kind`.
    fn decode_value(&mut self, kind: CrdtKind, value: &ResponseValue) -> Result<()>;

    /// Return to the zero value.
    fn reset(&mut self);

    /// Byte form used as a set member.
    fn to_member(&self) -> Option<Bytes> {
        None
    }

    fn from_member(_member: &[u8]) -> Result<Self>
    where
        Self: Sized,
    {
        Err(MapperError::unsupported(type_name::<Self>()))
    }

    fn to_byte(&self) -> Option<u8> {
        None
    }

    fn from_byte(_byte: u8) -> Option<Self>
    where
        Self: Sized,
    {
        None
    }

    fn as_context(&self) -> Option<&CausalContext> {
        None
    }

    fn set_context(&mut self, _context: CausalContext) {}
}

fn mismatch<T>(expected: CrdtKind, value: &ResponseValue) -> Result<T> {
    Err(MapperError::type_mismatch(expected, value.kind()))
}

fn register(kind: CrdtKind, value: &ResponseValue) -> Result<&Bytes> {
    match value {
        ResponseValue::Register(bytes) if kind == CrdtKind::Register => Ok(bytes),
        other => mismatch(kind, other),
    }
}

fn text(bytes: &[u8]) -> Result<String> {
    String::from_utf8(bytes.to_vec()).map_err(|_| MapperError::decode(DecodeErrorKind::InvalidText))
}

fn decimal(bytes: &[u8]) -> Result<i64> {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| MapperError::decode(DecodeErrorKind::InvalidInteger))
}

fn encode_integer(n: i64, kind: CrdtKind) -> Option<Operation> {
    if n == 0 {
        return None;
    }
    Some(match kind {
        CrdtKind::Register => Operation::Register(Bytes::from(n.to_string())),
        _ => Operation::Counter(n),
    })
}

fn decode_integer(kind: CrdtKind, value: &ResponseValue) -> Result<i64> {
    match value {
        ResponseValue::Counter(n) if kind == CrdtKind::Counter => Ok(*n),
        ResponseValue::Register(bytes) if kind == CrdtKind::Register => decimal(bytes),
        other => mismatch(kind, other),
    }
}

fn encode_members<'a, T: CrdtValue>(
    items: impl Iterator<Item = &'a T>,
) -> Result<Option<Operation>> {
    let mut set = SetOperation::new();
    for item in items {
        let member = item
            .to_member()
            .ok_or_else(|| MapperError::unsupported(type_name::<T>()))?;
        set.add(member);
    }
    Ok((!set.is_empty()).then_some(Operation::Set(set)))
}

fn decode_members<T: CrdtValue, C: FromIterator<T>>(
    kind: CrdtKind,
    value: &ResponseValue,
) -> Result<C> {
    match value {
        ResponseValue::Set(members) if kind == CrdtKind::Set => {
            members.iter().map(|m| T::from_member(m)).collect()
        }
        other => mismatch(kind, other),
    }
}

fn entry_kind<V: CrdtValue>() -> Result<CrdtKind> {
    V::shape()
        .natural_kind()
        .ok_or_else(|| MapperError::unsupported(type_name::<V>()))
}

fn encode_entries<'a, V: CrdtValue>(
    entries: impl Iterator<Item = (&'a String, &'a V)>,
) -> Result<Option<Operation>> {
    let kind = entry_kind::<V>()?;
    let mut op = MapOperation::new();
    for (key, value) in entries {
        if let Some(entry) = value.encode_value(kind).map_err(|e| e.at(key))? {
            op.insert(key.clone(), entry);
        }
    }
    Ok((!op.is_empty()).then_some(Operation::Map(op)))
}

fn decode_entries<V: CrdtValue + Default, C: FromIterator<(String, V)>>(
    kind: CrdtKind,
    value: &ResponseValue,
) -> Result<C> {
    let map = match value {
        ResponseValue::Map(map) if kind == CrdtKind::Map => map,
        other => return mismatch(kind, other),
    };
    let kind = entry_kind::<V>()?;
    map.iter()
        .map(|(key, raw)| {
            let mut entry = V::default();
            entry.decode_value(kind, raw).map_err(|e| e.at(key))?;
            Ok((key.clone(), entry))
        })
        .collect()
}

impl CrdtValue for String {
    fn shape() -> Shape {
        Shape::Text
    }

    fn encode_value(&self, _kind: CrdtKind) -> Result<Option<Operation>> {
        Ok((!self.is_empty()).then(|| Operation::Register(Bytes::from(self.clone()))))
    }

    fn decode_value(&mut self, kind: CrdtKind, value: &ResponseValue) -> Result<()> {
        *self = text(register(kind, value)?)?;
        Ok(())
    }

    fn reset(&mut self) {
        self.clear();
    }

    fn to_member(&self) -> Option<Bytes> {
        Some(Bytes::from(self.clone()))
    }

    fn from_member(member: &[u8]) -> Result<Self> {
        text(member)
    }
}

impl CrdtValue for Bytes {
    fn shape() -> Shape {
        Shape::Bytes
    }

    fn encode_value(&self, _kind: CrdtKind) -> Result<Option<Operation>> {
        Ok((!self.is_empty()).then(|| Operation::Register(self.clone())))
    }

    fn decode_value(&mut self, kind: CrdtKind, value: &ResponseValue) -> Result<()> {
        *self = register(kind, value)?.clone();
        Ok(())
    }

    fn reset(&mut self) {
        self.clear();
    }

    fn to_member(&self) -> Option<Bytes> {
        Some(self.clone())
    }

    fn from_member(member: &[u8]) -> Result<Self> {
        Ok(Bytes::copy_from_slice(member))
    }
}

impl<const N: usize> CrdtValue for [u8; N] {
    fn shape() -> Shape {
        Shape::FixedBytes(N)
    }

    fn encode_value(&self, _kind: CrdtKind) -> Result<Option<Operation>> {
        Ok(Some(Operation::Register(Bytes::copy_from_slice(self))))
    }

    fn decode_value(&mut self, kind: CrdtKind, value: &ResponseValue) -> Result<()> {
        *self = Self::from_member(register(kind, value)?)?;
        Ok(())
    }

    fn reset(&mut self) {
        *self = [0; N];
    }

    fn to_member(&self) -> Option<Bytes> {
        Some(Bytes::copy_from_slice(self))
    }

    fn from_member(member: &[u8]) -> Result<Self> {
        <[u8; N]>::try_from(member).map_err(|_| {
            MapperError::decode(DecodeErrorKind::LengthMismatch {
                expected: N,
                found: member.len(),
            })
        })
    }
}

impl<T: CrdtValue> CrdtValue for Vec<T> {
    /// `Vec<u8>` is a byte string; any other element type makes a set.
    fn shape() -> Shape {
        match T::shape() {
            Shape::Byte => Shape::Bytes,
            inner => Shape::Sequence(Box::new(inner)),
        }
    }

    fn check() -> Result<()> {
        T::check()
    }

    fn encode_value(&self, _kind: CrdtKind) -> Result<Option<Operation>> {
        if self.is_empty() {
            return Ok(None);
        }
        match T::shape() {
            Shape::Byte => Ok(self.to_member().map(Operation::Register)),
            _ => encode_members(self.iter()),
        }
    }

    fn decode_value(&mut self, kind: CrdtKind, value: &ResponseValue) -> Result<()> {
        *self = match T::shape() {
            Shape::Byte => Self::from_member(register(kind, value)?)?,
            _ => decode_members(kind, value)?,
        };
        Ok(())
    }

    fn reset(&mut self) {
        self.clear();
    }

    fn to_member(&self) -> Option<Bytes> {
        if T::shape() != Shape::Byte {
            return None;
        }
        self.iter()
            .map(|b| b.to_byte())
            .collect::<Option<Vec<u8>>>()
            .map(Bytes::from)
    }

    fn from_member(member: &[u8]) -> Result<Self> {
        if T::shape() != Shape::Byte {
            return Err(MapperError::unsupported(type_name::<Self>()));
        }
        member
            .iter()
            .map(|b| T::from_byte(*b).ok_or_else(|| MapperError::unsupported(type_name::<T>())))
            .collect()
    }
}

impl<T: CrdtValue + Eq + Hash> CrdtValue for HashSet<T> {
    fn shape() -> Shape {
        Shape::Sequence(Box::new(T::shape()))
    }

    fn check() -> Result<()> {
        T::check()
    }

    fn encode_value(&self, _kind: CrdtKind) -> Result<Option<Operation>> {
        encode_members(self.iter())
    }

    fn decode_value(&mut self, kind: CrdtKind, value: &ResponseValue) -> Result<()> {
        *self = decode_members(kind, value)?;
        Ok(())
    }

    fn reset(&mut self) {
        self.clear();
    }
}

impl<T: CrdtValue + Ord> CrdtValue for BTreeSet<T> {
    fn shape() -> Shape {
        Shape::Sequence(Box::new(T::shape()))
    }

    fn check() -> Result<()> {
        T::check()
    }

    fn encode_value(&self, _kind: CrdtKind) -> Result<Option<Operation>> {
        encode_members(self.iter())
    }

    fn decode_value(&mut self, kind: CrdtKind, value: &ResponseValue) -> Result<()> {
        *self = decode_members(kind, value)?;
        Ok(())
    }

    fn reset(&mut self) {
        self.clear();
    }
}

impl<V: CrdtValue + Default> CrdtValue for HashMap<String, V> {
    fn shape() -> Shape {
        Shape::Mapping(Box::new(V::shape()))
    }

    fn check() -> Result<()> {
        V::check()
    }

    fn encode_value(&self, _kind: CrdtKind) -> Result<Option<Operation>> {
        encode_entries(self.iter())
    }

    fn decode_value(&mut self, kind: CrdtKind, value: &ResponseValue) -> Result<()> {
        *self = decode_entries(kind, value)?;
        Ok(())
    }

    fn reset(&mut self) {
        self.clear();
    }
}

impl<V: CrdtValue + Default> CrdtValue for BTreeMap<String, V> {
    fn shape() -> Shape {
        Shape::Mapping(Box::new(V::shape()))
    }

    fn check() -> Result<()> {
        V::check()
    }

    fn encode_value(&self, _kind: CrdtKind) -> Result<Option<Operation>> {
        encode_entries(self.iter())
    }

    fn decode_value(&mut self, kind: CrdtKind, value: &ResponseValue) -> Result<()> {
        *self = decode_entries(kind, value)?;
        Ok(())
    }

    fn reset(&mut self) {
        self.clear();
    }
}

impl<T: CrdtValue + Default> CrdtValue for Option<T> {
    fn shape() -> Shape {
        Shape::Optional(Box::new(T::shape()))
    }

    fn check() -> Result<()> {
        T::check()
    }

    fn encode_value(&self, kind: CrdtKind) -> Result<Option<Operation>> {
        match self {
            Some(inner) => inner.encode_value(kind),
            None => Ok(None),
        }
    }

    fn decode_value(&mut self, kind: CrdtKind, value: &ResponseValue) -> Result<()> {
        self.get_or_insert_with(T::default).decode_value(kind, value)
    }

    fn reset(&mut self) {
        *self = None;
    }
}

impl CrdtValue for bool {
    fn shape() -> Shape {
        Shape::Bool
    }

    fn encode_value(&self, _kind: CrdtKind) -> Result<Option<Operation>> {
        Ok(Some(Operation::Flag(*self)))
    }

    fn decode_value(&mut self, kind: CrdtKind, value: &ResponseValue) -> Result<()> {
        match value {
            ResponseValue::Flag(flag) if kind == CrdtKind::Flag => {
                *self = *flag;
                Ok(())
            }
            other => mismatch(kind, other),
        }
    }

    fn reset(&mut self) {
        *self = false;
    }
}

impl CrdtValue for u8 {
    fn shape() -> Shape {
        Shape::Byte
    }

    fn encode_value(&self, kind: CrdtKind) -> Result<Option<Operation>> {
        Ok(encode_integer(i64::from(*self), kind))
    }

    fn decode_value(&mut self, kind: CrdtKind, value: &ResponseValue) -> Result<()> {
        let n = decode_integer(kind, value)?;
        *self = u8::try_from(n).map_err(|_| MapperError::decode(DecodeErrorKind::OutOfRange(n)))?;
        Ok(())
    }

    fn reset(&mut self) {
        *self = 0;
    }

    fn to_byte(&self) -> Option<u8> {
        Some(*self)
    }

    fn from_byte(byte: u8) -> Option<Self> {
        Some(byte)
    }
}

macro_rules! integer_value {
    ($($ty:ty),*) => {$(
        impl CrdtValue for $ty {
            fn shape() -> Shape {
                Shape::Integer
            }

            fn encode_value(&self, kind: CrdtKind) -> Result<Option<Operation>> {
                Ok(encode_integer(i64::from(*self), kind))
            }

            fn decode_value(&mut self, kind: CrdtKind, value: &ResponseValue) -> Result<()> {
                let n = decode_integer(kind, value)?;
                *self = <$ty>::try_from(n)
                    .map_err(|_| MapperError::decode(DecodeErrorKind::OutOfRange(n)))?;
                Ok(())
            }

            fn reset(&mut self) {
                *self = 0;
            }

            fn to_member(&self) -> Option<Bytes> {
                Some(Bytes::from(self.to_string()))
            }

            fn from_member(member: &[u8]) -> Result<Self> {
                let n = decimal(member)?;
                <$ty>::try_from(n).map_err(|_| MapperError::decode(DecodeErrorKind::OutOfRange(n)))
            }
        }
    )*};
}

integer_value!(i8, i16, i32, i64, u16, u32);

impl CrdtValue for CausalContext {
    fn shape() -> Shape {
        Shape::Context
    }

    fn encode_value(&self, _kind: CrdtKind) -> Result<Option<Operation>> {
        Ok(None)
    }

    fn decode_value(&mut self, _kind: CrdtKind, _value: &ResponseValue) -> Result<()> {
        Ok(())
    }

    fn reset(&mut self) {
        *self = CausalContext::empty();
    }

    fn as_context(&self) -> Option<&CausalContext> {
        Some(self)
    }

    fn set_context(&mut self, context: CausalContext) {
        *self = context;
    }
}

// Types with no CRDT representation. They compile as record fields so that
// the mapping resolver can name them in an `UnsupportedType` error.
macro_rules! unsupported_value {
    ($(<$($gen:ident),*> $ty:ty;)*) => {$(
        impl<$($gen: 'static),*> CrdtValue for $ty {
            fn shape() -> Shape {
                Shape::Unsupported
            }

            fn encode_value(&self, _kind: CrdtKind) -> Result<Option<Operation>> {
                Err(MapperError::unsupported(type_name::<Self>()))
            }

            fn decode_value(&mut self, _kind: CrdtKind, _value: &ResponseValue) -> Result<()> {
                Err(MapperError::unsupported(type_name::<Self>()))
            }

            fn reset(&mut self) {}
        }
    )*};
}

unsupported_value! {
    <R> fn() -> R;
    <A, R> fn(A) -> R;
    <T> Sender<T>;
    <T> Receiver<T>;
}
