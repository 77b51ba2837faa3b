//! Javelin Type Metadata
//!
//! Leaf types shared by every part of the runtime core:
//! - [`ClassId`] and [`ClassKind`] identify classes
//! - [`TypeTag`] describes the static type of a field (parsed from JVM descriptors)
//! - [`FieldDescriptor`] and [`FieldTable`] describe declared fields and their slots

#![warn(missing_docs)]

pub mod class_id;
pub mod error;
pub mod field;
pub mod ty;

pub use class_id::{ClassId, ClassKind};
pub use error::DescriptorError;
pub use field::{FieldDescriptor, FieldFlags, FieldTable};
pub use ty::TypeTag;
