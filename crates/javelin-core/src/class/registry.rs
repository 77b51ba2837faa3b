//! Class metadata registry
//!
//! Maps class ids to their [`ClassRecord`]s. Registration validates the declared hierarchy
//! and assigns storage slots:
//!
//! ```text
//! class Base { int a; }            layout: [a]
//! class Mid extends Base { int b; } layout: [a, b]
//! class Leaf extends Mid { int c; } layout: [a, b, c]
//! ```
//!
//! Inherited instance fields always occupy the lowest slots, so a slot index taken from a
//! superclass's descriptor is valid for every subclass instance. Static fields are numbered
//! separately per class.

use super::record::{ClassBuilder, ClassRecord, PendingStep, StaticStep};
use crate::value::Value;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use javelin_types::{ClassId, ClassKind, FieldDescriptor, FieldTable, TypeTag};
use rustc_hash::FxHashSet;
use std::sync::Arc;
use thiserror::Error;

/// Registry errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// No class registered under the id
    #[error("Class not found: {0}")]
    ClassNotFound(ClassId),

    /// A class with the id is already registered
    #[error("Class already registered: {0}")]
    DuplicateClass(ClassId),

    /// Declared superclass or interface is not registered
    #[error("Class {class} refers to unregistered supertype {supertype}")]
    UnknownSuperclass {
        /// Class being registered
        class: ClassId,
        /// Missing supertype
        supertype: ClassId,
    },

    /// Declared supertypes are not allowed for this kind of class
    #[error("Invalid hierarchy for {class}: {reason}")]
    InvalidHierarchy {
        /// Class being registered
        class: ClassId,
        /// What is wrong
        reason: String,
    },

    /// Two declared fields share a name
    #[error("Duplicate field {field} in {class}")]
    DuplicateField {
        /// Declaring class
        class: ClassId,
        /// Field name
        field: String,
    },

    /// Initial value of a field does not fit its declared type
    #[error("Initializer of {class}.{field} is {found}, expected {expected}")]
    IncompatibleInitializer {
        /// Declaring class
        class: ClassId,
        /// Field name
        field: String,
        /// Declared type
        expected: TypeTag,
        /// Kind of the supplied value
        found: &'static str,
    },

    /// Field lookup failed
    #[error("No such field {field} in {class}")]
    NoSuchField {
        /// Class searched
        class: ClassId,
        /// Field name
        field: String,
    },
}

/// Registry of class records
#[derive(Debug, Default)]
pub struct ClassRegistry {
    classes: DashMap<ClassId, Arc<ClassRecord>>,
}

impl ClassRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            classes: DashMap::new(),
        }
    }

    /// Validate a class description, assign its slots and store it
    pub fn register(&self, builder: ClassBuilder) -> Result<Arc<ClassRecord>, RegistryError> {
        let id = builder.id.clone();
        if self.classes.contains_key(&id) {
            return Err(RegistryError::DuplicateClass(id));
        }

        let record = Arc::new(self.build_record(builder)?);
        match self.classes.entry(id.clone()) {
            Entry::Occupied(_) => Err(RegistryError::DuplicateClass(id)),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                tracing::debug!(
                    class = %id,
                    kind = %record.kind(),
                    instance_size = record.instance_size(),
                    "registered class"
                );
                Ok(record)
            }
        }
    }

    fn build_record(&self, builder: ClassBuilder) -> Result<ClassRecord, RegistryError> {
        let ClassBuilder {
            id,
            kind,
            superclass,
            interfaces,
            fields: pending_fields,
            steps: pending_steps,
            instance_initializers: pending_initializers,
        } = builder;

        let invalid = |reason: String| RegistryError::InvalidHierarchy {
            class: id.clone(),
            reason,
        };

        let mut supertypes = FxHashSet::default();
        supertypes.insert(id.clone());

        let mut layout: Vec<FieldDescriptor> = Vec::new();
        if let Some(superclass) = &superclass {
            if !kind.allows_superclass() {
                return Err(invalid(format!("{} may not declare a superclass", kind)));
            }
            let parent = self.lookup_supertype(&id, superclass)?;
            if parent.kind() != ClassKind::Class {
                return Err(invalid(format!("superclass {} is a {}", superclass, parent.kind())));
            }
            layout.extend(parent.layout().iter().cloned());
            supertypes.extend(parent.supertypes().iter().cloned());
        }

        for interface in &interfaces {
            let parent = self.lookup_supertype(&id, interface)?;
            if !parent.is_interface() {
                return Err(invalid(format!("{} is not an interface", interface)));
            }
            supertypes.extend(parent.supertypes().iter().cloned());
        }

        let mut fields = FieldTable::new();
        let mut static_count = 0;
        for pending in pending_fields {
            if kind == ClassKind::Interface && !pending.flags.is_static() {
                return Err(invalid(format!("interface declares instance field {}", pending.name)));
            }
            let slot = if pending.flags.is_static() {
                static_count += 1;
                static_count - 1
            } else {
                layout.len()
            };
            let descriptor = FieldDescriptor::new(
                pending.name.clone(),
                pending.type_tag,
                id.clone(),
                slot,
                pending.flags,
            );
            if !descriptor.is_static() {
                layout.push(descriptor.clone());
            }
            if fields.push(descriptor).is_none() {
                return Err(RegistryError::DuplicateField {
                    class: id.clone(),
                    field: pending.name.to_string(),
                });
            }
        }

        let no_such_field = |name: &str| RegistryError::NoSuchField {
            class: id.clone(),
            field: name.to_string(),
        };
        let typed_slot = |field: &FieldDescriptor, value: &Value| {
            if value.fits(&field.type_tag) {
                Ok(field.slot)
            } else {
                Err(RegistryError::IncompatibleInitializer {
                    class: id.clone(),
                    field: field.name().to_string(),
                    expected: field.type_tag.clone(),
                    found: value.type_name(),
                })
            }
        };

        let mut steps = Vec::with_capacity(pending_steps.len());
        for step in pending_steps {
            steps.push(match step {
                PendingStep::Constant { field, value } => {
                    let descriptor = fields
                        .get(&field)
                        .filter(|f| f.is_static())
                        .ok_or_else(|| no_such_field(&field))?;
                    let slot = typed_slot(descriptor, &value)?;
                    StaticStep::Constant { slot, value }
                }
                PendingStep::Block(block) => StaticStep::Block(block),
            });
        }

        let mut instance_initializers: Vec<(usize, Value)> = Vec::new();
        for (field, value) in pending_initializers {
            let descriptor = fields
                .get(&field)
                .filter(|f| !f.is_static())
                .ok_or_else(|| no_such_field(&field))?;
            instance_initializers.push((typed_slot(descriptor, &value)?, value));
        }

        Ok(ClassRecord::new(
            id,
            kind,
            superclass,
            interfaces,
            fields,
            Arc::from(layout),
            supertypes,
            steps,
            instance_initializers,
        ))
    }

    fn lookup_supertype(
        &self,
        class: &ClassId,
        supertype: &ClassId,
    ) -> Result<Arc<ClassRecord>, RegistryError> {
        self.lookup(supertype)
            .map_err(|_| RegistryError::UnknownSuperclass {
                class: class.clone(),
                supertype: supertype.clone(),
            })
    }

    /// Look up a class record
    pub fn lookup(&self, id: &ClassId) -> Result<Arc<ClassRecord>, RegistryError> {
        self.classes
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| RegistryError::ClassNotFound(id.clone()))
    }

    /// Full instance layout of a class, superclass fields first
    pub fn get_all_fields(&self, id: &ClassId) -> Result<Arc<[FieldDescriptor]>, RegistryError> {
        Ok(self.lookup(id)?.layout().clone())
    }

    /// Fields declared directly by a class (instance and static), in declaration order
    pub fn get_declared_fields(&self, id: &ClassId) -> Result<Vec<FieldDescriptor>, RegistryError> {
        Ok(self.lookup(id)?.declared_fields().iter().cloned().collect())
    }

    /// Check if `sub` is `sup`, a subclass of it, or implements it
    ///
    /// Array classes are covariant in their reference component type.
    pub fn is_subclass_of(&self, sub: &ClassId, sup: &ClassId) -> Result<bool, RegistryError> {
        let record = self.lookup(sub)?;
        if record.has_supertype(sup) {
            return Ok(true);
        }
        let sup_record = self.lookup(sup)?;
        match (record.component_type(), sup_record.component_type()) {
            (Some(sub_component), Some(sup_component))
                if sub_component.is_reference() && sup_component.is_reference() =>
            {
                self.is_subclass_of(&sub_component.class_id(), &sup_component.class_id())
            }
            _ => Ok(false),
        }
    }

    /// Get or register the class of a primitive type (`int`, `boolean`, ...)
    pub fn primitive_class(&self, tag: &TypeTag) -> Result<Arc<ClassRecord>, RegistryError> {
        if !tag.is_primitive() {
            return self.class_for_type(tag);
        }
        Ok(self.get_or_insert_builtin(tag.class_id(), ClassKind::Primitive, None))
    }

    /// Get or register the array class with the given component type
    ///
    /// Reference components must name a registered class.
    pub fn array_class(&self, component: &TypeTag) -> Result<Arc<ClassRecord>, RegistryError> {
        match component {
            TypeTag::Reference(class) => {
                self.lookup(class)?;
            }
            TypeTag::Array(inner) => {
                self.array_class(inner)?;
            }
            _ => {}
        }
        let array = TypeTag::Array(Box::new(component.clone()));
        Ok(self.get_or_insert_builtin(array.class_id(), ClassKind::Array, Some(component.clone())))
    }

    /// Class representing values of `tag` at runtime
    pub fn class_for_type(&self, tag: &TypeTag) -> Result<Arc<ClassRecord>, RegistryError> {
        match tag {
            TypeTag::Reference(class) => self.lookup(class),
            TypeTag::Array(component) => self.array_class(component),
            primitive => self.primitive_class(primitive),
        }
    }

    fn get_or_insert_builtin(
        &self,
        id: ClassId,
        kind: ClassKind,
        component: Option<TypeTag>,
    ) -> Arc<ClassRecord> {
        self.classes
            .entry(id.clone())
            .or_insert_with(|| {
                tracing::debug!(class = %id, %kind, "registered built-in class");
                Arc::new(ClassRecord::builtin(id.clone(), kind, component))
            })
            .value()
            .clone()
    }

    /// Check if a class is registered
    pub fn contains(&self, id: &ClassId) -> bool {
        self.classes.contains_key(id)
    }

    /// Number of registered classes (built-in classes included)
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Check if no classes are registered
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Ids of all registered classes, in no particular order
    pub fn ids(&self) -> Vec<ClassId> {
        self.classes.iter().map(|entry| entry.key().clone()).collect()
    }
}
