//! Javelin runtime core
//!
//! This crate provides the managed-object runtime including:
//! - Class metadata registry (field layout, supertype chains, built-in classes)
//! - Lazy, dependency-ordered, at-most-once static initialization
//! - Object store with shallow, cycle-safe structural hashing
//! - Reflective field access with an explicit access-bypass capability
//!
//! Everything hangs off an explicit [`Runtime`] value; there is no global state.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod class;
pub mod config;
pub mod heap;
pub mod init;
pub mod reflect;
pub mod runtime;
pub mod value;

pub use class::{
    ClassBuilder, ClassMirror, ClassRecord, ClassRegistry, InitState, RegistryError,
    StaticInitializer,
};
pub use config::{ConfigError, ReflectOptions, ResourceLimits, RuntimeOptions};
pub use heap::{ArrayObject, HeapError, HeapObject, Instance, ObjectStore};
pub use init::InitializationError;
pub use reflect::{AccessBypass, AccessError, FieldAction, ReflectedField};
pub use runtime::Runtime;
pub use value::{ObjectRef, Value};

pub use javelin_types::{
    ClassId, ClassKind, DescriptorError, FieldDescriptor, FieldFlags, FieldTable, TypeTag,
};

/// Runtime errors
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// Class registry error
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Static initialization error
    #[error(transparent)]
    Initialization(#[from] InitializationError),

    /// Object store error
    #[error(transparent)]
    Heap(#[from] HeapError),

    /// Reflective access error
    #[error(transparent)]
    Access(#[from] AccessError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Malformed field descriptor
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    /// Failure raised by managed code (e.g. a static block)
    #[error("Thrown: {0}")]
    Thrown(String),
}

impl RuntimeError {
    /// Create an error raised by managed code
    pub fn thrown(message: impl Into<String>) -> Self {
        RuntimeError::Thrown(message.into())
    }
}

/// Runtime result
pub type RuntimeResult<T> = Result<T, RuntimeError>;
