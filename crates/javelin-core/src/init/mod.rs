//! Lazy static initialization
//!
//! A class is initialized on its first active use: reading or writing one of its static
//! fields, creating an instance with `new_instance`, or touching an element of an array
//! whose element type is the class. Initialization runs the superclass first, then the
//! class's static steps in declaration order, at most once per runtime.
//!
//! ```text
//! Uninitialized ──claim──► Initializing ──ok──► Initialized
//!                               │
//!                               └──error / panic──► Failed (sticky)
//! ```
//!
//! Each class has one initialization authority (a mutex plus condition variable on its
//! record). The owning thread may re-enter (cyclic dependencies observe default values);
//! other threads block until the owner finishes.

mod initializer;

pub(crate) use initializer::ensure_initialized;

use javelin_types::ClassId;
use std::sync::Arc;
use thiserror::Error;

/// Static initialization errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InitializationError {
    /// A static step (or the superclass) failed; the class is now permanently failed
    #[error("Initialization of {class} failed: {cause}")]
    Failed {
        /// Class that failed
        class: ClassId,
        /// Failure description
        cause: Arc<str>,
    },

    /// The class failed during an earlier attempt
    #[error("Initialization of {class} failed earlier: {cause}")]
    PreviouslyFailed {
        /// Class that failed
        class: ClassId,
        /// Failure recorded by the first attempt
        cause: Arc<str>,
    },

    /// Too many nested initializations on one thread
    #[error("Initialization of {class} exceeds nesting limit of {limit}")]
    DepthExceeded {
        /// Class whose initialization was refused
        class: ClassId,
        /// Configured limit
        limit: usize,
    },

    /// Class is not registered
    #[error("Class not found: {0}")]
    ClassNotFound(ClassId),
}

impl InitializationError {
    /// Class the error is about
    pub fn class(&self) -> &ClassId {
        match self {
            InitializationError::Failed { class, .. }
            | InitializationError::PreviouslyFailed { class, .. }
            | InitializationError::DepthExceeded { class, .. }
            | InitializationError::ClassNotFound(class) => class,
        }
    }
}
