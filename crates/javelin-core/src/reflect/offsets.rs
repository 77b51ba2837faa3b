//! Offset-based slot access
//!
//! An offset is the slot index of an instance field (or the element index of an array).
//! Offsets are fixed at registration, so a value obtained once stays valid for the life of
//! the runtime. These operations skip visibility and `final` checks entirely and are gated
//! on holding an [`AccessBypass`](super::AccessBypass) instead.

use super::AccessError;
use crate::heap::HeapObject;
use crate::value::Value;
use javelin_types::TypeTag;

fn invalid(object: &HeapObject, offset: usize) -> AccessError {
    AccessError::InvalidOffset {
        class: object.class_id().clone(),
        offset,
    }
}

/// Declared type of the slot at `offset`
pub(crate) fn slot_type(object: &HeapObject, offset: usize) -> Result<TypeTag, AccessError> {
    match object {
        HeapObject::Instance(instance) => instance
            .class()
            .layout()
            .get(offset)
            .map(|field| field.type_tag.clone())
            .ok_or_else(|| invalid(object, offset)),
        HeapObject::Array(array) => {
            if offset < array.len() {
                Ok(array.component_type().clone())
            } else {
                Err(invalid(object, offset))
            }
        }
    }
}

fn check_fits(object: &HeapObject, offset: usize, value: &Value) -> Result<(), AccessError> {
    let tag = slot_type(object, offset)?;
    if !value.fits(&tag) {
        return Err(AccessError::TypeMismatch(format!(
            "cannot store {} at offset {} of {} ({})",
            value.type_name(),
            offset,
            object.class_id(),
            tag
        )));
    }
    Ok(())
}

/// Read the slot at `offset`
pub(crate) fn read_slot(object: &HeapObject, offset: usize) -> Result<Value, AccessError> {
    let value = match object {
        HeapObject::Instance(instance) => instance.read(offset),
        HeapObject::Array(array) => array.load(offset),
    };
    value.ok_or_else(|| invalid(object, offset))
}

/// Write the slot at `offset`
pub(crate) fn write_slot(object: &HeapObject, offset: usize, value: Value) -> Result<(), AccessError> {
    check_fits(object, offset, &value)?;
    let written = match object {
        HeapObject::Instance(instance) => instance.write(offset, value),
        HeapObject::Array(array) => array.store(offset, value),
    };
    if written {
        Ok(())
    } else {
        Err(invalid(object, offset))
    }
}

/// Atomically replace the slot at `offset` if it holds `expected`
pub(crate) fn compare_and_swap_slot(
    object: &HeapObject,
    offset: usize,
    expected: Value,
    new: Value,
) -> Result<bool, AccessError> {
    check_fits(object, offset, &new)?;
    let swapped = match object {
        HeapObject::Instance(instance) => instance.compare_and_swap(offset, expected, new),
        HeapObject::Array(array) => array.compare_and_swap(offset, expected, new),
    };
    swapped.ok_or_else(|| invalid(object, offset))
}
