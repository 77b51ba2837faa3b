//! Reflective view of a class

use super::record::ClassRecord;
use super::registry::{ClassRegistry, RegistryError};
use javelin_types::{ClassId, ClassKind, TypeTag};
use std::fmt;
use std::sync::Arc;

/// Read-only reflective view of a registered class
#[derive(Debug, Clone)]
pub struct ClassMirror {
    record: Arc<ClassRecord>,
}

impl ClassMirror {
    /// Wrap a class record
    pub fn new(record: Arc<ClassRecord>) -> Self {
        Self { record }
    }

    /// Class id
    pub fn id(&self) -> &ClassId {
        self.record.id()
    }

    /// Dotted name (`java.lang.String`, `[I`, `int`)
    pub fn name(&self) -> String {
        self.record.id().java_name()
    }

    /// Class kind
    pub fn kind(&self) -> ClassKind {
        self.record.kind()
    }

    /// Check for an interface
    pub fn is_interface(&self) -> bool {
        self.record.is_interface()
    }

    /// Check for an array class
    pub fn is_array(&self) -> bool {
        self.record.kind() == ClassKind::Array
    }

    /// Check for a primitive class
    pub fn is_primitive(&self) -> bool {
        self.record.kind() == ClassKind::Primitive
    }

    /// Component type of an array class
    pub fn component_type(&self) -> Option<&TypeTag> {
        self.record.component_type()
    }

    /// Direct superclass
    pub fn superclass(&self) -> Option<&ClassId> {
        self.record.superclass()
    }

    /// Check if values of class `other` can be assigned to this class
    pub fn is_assignable_from(
        &self,
        registry: &ClassRegistry,
        other: &ClassId,
    ) -> Result<bool, RegistryError> {
        registry.is_subclass_of(other, self.record.id())
    }

    /// Underlying record
    pub fn record(&self) -> &Arc<ClassRecord> {
        &self.record
    }
}

impl fmt::Display for ClassMirror {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            ClassKind::Primitive => write!(f, "{}", self.name()),
            ClassKind::Interface => write!(f, "interface {}", self.name()),
            ClassKind::Class | ClassKind::Array => write!(f, "class {}", self.name()),
        }
    }
}
