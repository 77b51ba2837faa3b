//! Heap objects
//!
//! Slot vectors sit behind a `RwLock` that is held only for a single slot operation, so
//! distinct objects never contend and readers of one object run in parallel.

use crate::class::ClassRecord;
use crate::value::{ObjectRef, Value};
use javelin_types::{ClassId, TypeTag};
use parking_lot::RwLock;
use std::sync::Arc;

/// An instance of an ordinary class
#[derive(Debug)]
pub struct Instance {
    class: Arc<ClassRecord>,
    identity: ObjectRef,
    slots: RwLock<Vec<Value>>,
}

impl Instance {
    /// Create an instance with every slot at its type's default value
    pub(crate) fn new(class: Arc<ClassRecord>, identity: ObjectRef) -> Self {
        let slots = class
            .layout()
            .iter()
            .map(|field| Value::default_for(&field.type_tag))
            .collect();
        Self {
            class,
            identity,
            slots: RwLock::new(slots),
        }
    }

    /// Class record
    pub fn class(&self) -> &Arc<ClassRecord> {
        &self.class
    }

    /// Object identity
    pub fn identity(&self) -> ObjectRef {
        self.identity
    }

    /// Number of slots (the class's full layout)
    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    /// Check for an instance without fields
    pub fn is_empty(&self) -> bool {
        self.slots.read().is_empty()
    }

    /// Read a slot
    pub fn read(&self, slot: usize) -> Option<Value> {
        self.slots.read().get(slot).copied()
    }

    /// Write a slot, returning false if the slot does not exist
    pub fn write(&self, slot: usize, value: Value) -> bool {
        match self.slots.write().get_mut(slot) {
            Some(target) => {
                *target = value;
                true
            }
            None => false,
        }
    }

    /// Atomically replace a slot if it currently holds `expected`
    ///
    /// Returns None for a missing slot, otherwise whether the swap happened. Floats compare
    /// by bit pattern.
    pub fn compare_and_swap(&self, slot: usize, expected: Value, new: Value) -> Option<bool> {
        let mut slots = self.slots.write();
        let target = slots.get_mut(slot)?;
        if target.identical(&expected) {
            *target = new;
            Some(true)
        } else {
            Some(false)
        }
    }

    /// Copy of every slot, in layout order
    pub fn snapshot(&self) -> Vec<Value> {
        self.slots.read().clone()
    }
}

/// An array
#[derive(Debug)]
pub struct ArrayObject {
    class: Arc<ClassRecord>,
    component: TypeTag,
    identity: ObjectRef,
    elements: RwLock<Vec<Value>>,
}

impl ArrayObject {
    /// Create an array of `length` default elements
    pub(crate) fn new(
        class: Arc<ClassRecord>,
        component: TypeTag,
        identity: ObjectRef,
        length: usize,
    ) -> Self {
        let elements = vec![Value::default_for(&component); length];
        Self {
            class,
            component,
            identity,
            elements: RwLock::new(elements),
        }
    }

    /// Array class record
    pub fn class(&self) -> &Arc<ClassRecord> {
        &self.class
    }

    /// Component type
    pub fn component_type(&self) -> &TypeTag {
        &self.component
    }

    /// Object identity
    pub fn identity(&self) -> ObjectRef {
        self.identity
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.elements.read().len()
    }

    /// Check for an empty array
    pub fn is_empty(&self) -> bool {
        self.elements.read().is_empty()
    }

    /// Load an element
    pub fn load(&self, index: usize) -> Option<Value> {
        self.elements.read().get(index).copied()
    }

    /// Store an element, returning false if the index is out of bounds
    pub fn store(&self, index: usize, value: Value) -> bool {
        match self.elements.write().get_mut(index) {
            Some(target) => {
                *target = value;
                true
            }
            None => false,
        }
    }

    /// Atomically replace an element if it currently holds `expected`
    pub fn compare_and_swap(&self, index: usize, expected: Value, new: Value) -> Option<bool> {
        let mut elements = self.elements.write();
        let target = elements.get_mut(index)?;
        if target.identical(&expected) {
            *target = new;
            Some(true)
        } else {
            Some(false)
        }
    }
}

/// Any object in the store
#[derive(Debug)]
pub enum HeapObject {
    /// Class instance
    Instance(Instance),
    /// Array
    Array(ArrayObject),
}

impl HeapObject {
    /// Object identity
    pub fn identity(&self) -> ObjectRef {
        match self {
            HeapObject::Instance(instance) => instance.identity(),
            HeapObject::Array(array) => array.identity(),
        }
    }

    /// Class record of the object
    pub fn class(&self) -> &Arc<ClassRecord> {
        match self {
            HeapObject::Instance(instance) => instance.class(),
            HeapObject::Array(array) => array.class(),
        }
    }

    /// Class id of the object
    pub fn class_id(&self) -> &ClassId {
        self.class().id()
    }

    /// View as an instance
    pub fn as_instance(&self) -> Option<&Instance> {
        match self {
            HeapObject::Instance(instance) => Some(instance),
            HeapObject::Array(_) => None,
        }
    }

    /// View as an array
    pub fn as_array(&self) -> Option<&ArrayObject> {
        match self {
            HeapObject::Array(array) => Some(array),
            HeapObject::Instance(_) => None,
        }
    }
}
