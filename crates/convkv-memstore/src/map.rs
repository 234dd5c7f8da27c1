//! Applying Operation Trees to stored maps.

use convkv_wire::{CrdtKind, MapOperation, MapValue, Operation, ResponseValue};

/// Merge `op` into `target`.
///
/// Registers are overwritten, counters incremented, flags set, set members
/// removed and then added, and nested maps merged recursively. An entry whose
/// stored kind differs from the operation's kind is replaced.
pub fn apply_map(target: &mut MapValue, op: MapOperation) {
    for (key, entry) in op {
        match target.get_mut(&key) {
            Some(current) if current.kind() == entry.kind() => apply(current, entry),
            _ => {
                let mut fresh = empty(entry.kind());
                apply(&mut fresh, entry);
                target.insert(key, fresh);
            }
        }
    }
}

fn empty(kind: CrdtKind) -> ResponseValue {
    match kind {
        CrdtKind::Register => ResponseValue::Register(Default::default()),
        CrdtKind::Set => ResponseValue::Set(Vec::new()),
        CrdtKind::Counter => ResponseValue::Counter(0),
        CrdtKind::Flag => ResponseValue::Flag(false),
        CrdtKind::Map => ResponseValue::Map(MapValue::new()),
    }
}

fn apply(current: &mut ResponseValue, op: Operation) {
    match (current, op) {
        (ResponseValue::Register(value), Operation::Register(bytes)) => *value = bytes,
        (ResponseValue::Set(members), Operation::Set(set)) => {
            members.retain(|m| !set.removes.contains(m));
            for member in set.adds {
                if !members.contains(&member) {
                    members.push(member);
                }
            }
            members.sort();
        }
        (ResponseValue::Counter(n), Operation::Counter(delta)) => *n = n.saturating_add(delta),
        (ResponseValue::Flag(flag), Operation::Flag(value)) => *flag = value,
        (ResponseValue::Map(map), Operation::Map(op)) => apply_map(map, op),
        (slot, op) => *slot = op.as_response(),
    }
}
