//! Object store
//!
//! Owns every heap object of a runtime, keyed by identity. Identities are handed out from
//! a monotonic counter starting at 1 and are never reused. Memory is not reclaimed here.

use super::object::{ArrayObject, HeapObject, Instance};
use super::HeapError;
use crate::class::ClassRecord;
use crate::value::ObjectRef;
use dashmap::DashMap;
use javelin_types::TypeTag;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// Identity-keyed store of heap objects
#[derive(Debug)]
pub struct ObjectStore {
    objects: DashMap<ObjectRef, Arc<HeapObject>>,
    next_identity: AtomicU64,
    live: AtomicUsize,
    max_objects: Option<usize>,
}

impl ObjectStore {
    /// Create a store with an optional object limit
    pub fn new(max_objects: Option<usize>) -> Self {
        Self {
            objects: DashMap::new(),
            next_identity: AtomicU64::new(1),
            live: AtomicUsize::new(0),
            max_objects,
        }
    }

    /// Reserve room for one more object
    fn reserve(&self) -> Result<(), HeapError> {
        match self.max_objects {
            Some(limit) => self
                .live
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |live| {
                    (live < limit).then_some(live + 1)
                })
                .map(|_| ())
                .map_err(|_| HeapError::HeapLimitExceeded { limit }),
            None => {
                self.live.fetch_add(1, Ordering::AcqRel);
                Ok(())
            }
        }
    }

    fn next_identity(&self) -> ObjectRef {
        ObjectRef::from_raw(self.next_identity.fetch_add(1, Ordering::Relaxed))
    }

    /// Allocate an instance of `class` with default slots
    ///
    /// Does not check instantiability or trigger initialization; the runtime does both.
    pub fn allocate_instance(&self, class: Arc<ClassRecord>) -> Result<ObjectRef, HeapError> {
        self.reserve()?;
        let identity = self.next_identity();
        tracing::trace!(object = %identity, class = %class.id(), "allocated instance");
        let object = HeapObject::Instance(Instance::new(class, identity));
        self.objects.insert(identity, Arc::new(object));
        Ok(identity)
    }

    /// Allocate an array of `class` (an array class) with default elements
    pub fn allocate_array(
        &self,
        class: Arc<ClassRecord>,
        component: TypeTag,
        length: usize,
    ) -> Result<ObjectRef, HeapError> {
        self.reserve()?;
        let identity = self.next_identity();
        tracing::trace!(object = %identity, class = %class.id(), length, "allocated array");
        let object = HeapObject::Array(ArrayObject::new(class, component, identity, length));
        self.objects.insert(identity, Arc::new(object));
        Ok(identity)
    }

    /// Resolve an identity
    pub fn get(&self, object: ObjectRef) -> Result<Arc<HeapObject>, HeapError> {
        self.objects
            .get(&object)
            .map(|entry| entry.value().clone())
            .ok_or(HeapError::DanglingReference(object))
    }

    /// Resolve an identity that must be an instance
    pub fn instance(&self, object: ObjectRef) -> Result<Arc<HeapObject>, HeapError> {
        let resolved = self.get(object)?;
        if resolved.as_instance().is_none() {
            return Err(HeapError::NotAnInstance(object));
        }
        Ok(resolved)
    }

    /// Resolve an identity that must be an array
    pub fn array(&self, object: ObjectRef) -> Result<Arc<HeapObject>, HeapError> {
        let resolved = self.get(object)?;
        if resolved.as_array().is_none() {
            return Err(HeapError::NotAnArray(object));
        }
        Ok(resolved)
    }

    /// Check if an identity is live
    pub fn contains(&self, object: ObjectRef) -> bool {
        self.objects.contains_key(&object)
    }

    /// Number of objects
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Check if the store holds no objects
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Configured object limit
    pub fn max_objects(&self) -> Option<usize> {
        self.max_objects
    }
}

impl Default for ObjectStore {
    fn default() -> Self {
        Self::new(None)
    }
}
