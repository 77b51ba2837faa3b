//! Class metadata
//!
//! Classes are described with a [`ClassBuilder`], validated and laid out by the
//! [`ClassRegistry`], and stored as shared [`ClassRecord`]s that also own the class's static
//! slots and initialization state.

mod mirror;
mod record;
mod registry;

pub use mirror::ClassMirror;
pub use record::{ClassBuilder, ClassRecord, InitState, StaticInitializer};
pub use registry::{ClassRegistry, RegistryError};

pub(crate) use record::{InitClaim, StaticStep};
