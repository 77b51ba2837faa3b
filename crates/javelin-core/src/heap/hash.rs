//! Hash codes
//!
//! `hash_code` is shallow: every slot of the full layout is folded in layout order with
//! `h = 31 * h + hash(slot)` from a seed of 1, and a reference slot contributes the
//! identity hash of its target rather than the target's own hash. Hashing therefore takes
//! O(slots) on any object graph, cyclic or not, and two objects with equal primitive slots
//! and identical reference targets hash equally.

use super::object::HeapObject;
use crate::value::{ObjectRef, Value};
use rustc_hash::FxHasher;
use std::hash::{Hash, Hasher};

const SEED: i32 = 1;
const MULTIPLIER: i32 = 31;

/// Identity hash of an object, derived only from its identity
pub fn identity_hash(object: ObjectRef) -> i32 {
    let mut hasher = FxHasher::default();
    object.hash(&mut hasher);
    let bits = hasher.finish();
    ((bits >> 32) ^ bits) as i32
}

/// Hash contribution of a single slot
pub fn value_hash(value: &Value) -> i32 {
    match *value {
        Value::Null => 0,
        Value::Boolean(true) => 1231,
        Value::Boolean(false) => 1237,
        Value::Byte(b) => b as i32,
        Value::Char(c) => c as i32,
        Value::Short(s) => s as i32,
        Value::Int(i) => i,
        Value::Long(l) => (l ^ ((l as u64) >> 32) as i64) as i32,
        Value::Float(f) => f.to_bits() as i32,
        Value::Double(d) => {
            let bits = d.to_bits();
            (bits ^ (bits >> 32)) as i32
        }
        Value::Ref(target) => identity_hash(target),
    }
}

/// Fold slot hashes in order
pub fn fold_slots(slots: &[Value]) -> i32 {
    slots.iter().fold(SEED, |h, slot| {
        h.wrapping_mul(MULTIPLIER).wrapping_add(value_hash(slot))
    })
}

/// Structural hash of an object
///
/// Instances hash their slots; arrays hash by identity.
pub fn structural_hash(object: &HeapObject) -> i32 {
    match object {
        HeapObject::Instance(instance) => fold_slots(&instance.snapshot()),
        HeapObject::Array(array) => identity_hash(array.identity()),
    }
}
