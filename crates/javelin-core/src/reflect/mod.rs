//! Reflective field access
//!
//! Reflection hands out [`ReflectedField`] handles. A handle reads and writes public fields
//! directly; non-public and `final` fields additionally need an [`AccessBypass`], an
//! explicit capability minted by the runtime and honored only by that runtime.

mod accessor;
mod capability;
mod offsets;

pub use accessor::{FieldAction, ReflectedField};
pub use capability::AccessBypass;

pub(crate) use accessor::{check_access, check_receiver, check_static, check_value};
pub(crate) use offsets::{compare_and_swap_slot, read_slot, write_slot};

use javelin_types::ClassId;
use thiserror::Error;

/// Reflective access errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    /// Visibility forbids the access
    #[error("Cannot {action} field {class}.{field}")]
    IllegalAccess {
        /// Declaring class
        class: ClassId,
        /// Field name
        field: String,
        /// Attempted action
        action: FieldAction,
    },

    /// Field, receiver or value have incompatible types
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    /// Write to a `final` field without a bypass
    #[error("Field {class}.{field} is final")]
    ReadOnlyField {
        /// Declaring class
        class: ClassId,
        /// Field name
        field: String,
    },

    /// Bypass disabled by the runtime options, or minted by another runtime
    #[error("Access bypass is disabled")]
    BypassDenied,

    /// Offset does not name a slot of the object
    #[error("Invalid offset {offset} for {class}")]
    InvalidOffset {
        /// Object's class
        class: ClassId,
        /// Requested offset
        offset: usize,
    },
}
