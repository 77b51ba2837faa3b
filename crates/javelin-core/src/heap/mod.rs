//! Object store and hashing

mod hash;
mod object;
mod store;

pub use hash::{fold_slots, identity_hash, structural_hash, value_hash};
pub use object::{ArrayObject, HeapObject, Instance};
pub use store::ObjectStore;

use crate::value::ObjectRef;
use javelin_types::{ClassId, ClassKind};
use thiserror::Error;

/// Object store errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeapError {
    /// Identity does not name a live object
    #[error("Dangling reference {0}")]
    DanglingReference(ObjectRef),

    /// Interfaces, arrays and primitive classes cannot be allocated as instances
    #[error("Cannot instantiate {kind} {class}")]
    NotInstantiable {
        /// Class requested
        class: ClassId,
        /// Its kind
        kind: ClassKind,
    },

    /// Array operation on a non-array
    #[error("Object {0} is not an array")]
    NotAnArray(ObjectRef),

    /// Field operation on a non-instance
    #[error("Object {0} is not an instance")]
    NotAnInstance(ObjectRef),

    /// Array index out of range
    #[error("Index {index} out of bounds for length {length}")]
    IndexOutOfBounds {
        /// Requested index
        index: i64,
        /// Array length
        length: usize,
    },

    /// Object limit reached
    #[error("Heap limit of {limit} objects exceeded")]
    HeapLimitExceeded {
        /// Configured limit
        limit: usize,
    },

    /// Negative array length
    #[error("Negative array size: {0}")]
    NegativeArraySize(i32),
}
