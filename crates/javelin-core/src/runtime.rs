//! Runtime facade
//!
//! A [`Runtime`] owns the class registry and the object store. It is `Send + Sync`; share it
//! between threads with `Arc<Runtime>`.

use crate::class::{ClassBuilder, ClassMirror, ClassRecord, ClassRegistry, InitState, RegistryError};
use crate::config::{ConfigError, RuntimeOptions};
use crate::heap::{identity_hash, structural_hash, HeapError, HeapObject, ObjectStore};
use crate::init;
use crate::reflect::{self, AccessBypass, AccessError, FieldAction, ReflectedField};
use crate::value::{ObjectRef, Value};
use crate::RuntimeResult;
use javelin_types::{ClassId, FieldDescriptor, TypeTag};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_RUNTIME_ID: AtomicU64 = AtomicU64::new(1);

/// Managed-object runtime
#[derive(Debug)]
pub struct Runtime {
    id: u64,
    options: RuntimeOptions,
    classes: ClassRegistry,
    heap: ObjectStore,
}

impl Runtime {
    /// Create a runtime with default options
    pub fn new() -> Self {
        Self::build(RuntimeOptions::default())
    }

    /// Create a runtime with specific options
    pub fn with_options(options: RuntimeOptions) -> Result<Self, ConfigError> {
        options.validate()?;
        let runtime = Self::build(options);
        tracing::debug!(
            runtime = runtime.id,
            max_init_depth = runtime.options.limits.max_init_depth,
            max_objects = ?runtime.options.limits.max_objects,
            allow_bypass = runtime.options.reflect.allow_bypass,
            "creating runtime"
        );
        Ok(runtime)
    }

    fn build(options: RuntimeOptions) -> Self {
        Self {
            id: NEXT_RUNTIME_ID.fetch_add(1, Ordering::Relaxed),
            heap: ObjectStore::new(options.limits.max_objects),
            classes: ClassRegistry::new(),
            options,
        }
    }

    /// Create a runtime from a TOML configuration file
    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::with_options(RuntimeOptions::from_file(path)?)
    }

    /// Runtime options
    pub fn options(&self) -> &RuntimeOptions {
        &self.options
    }

    /// Class registry
    pub fn classes(&self) -> &ClassRegistry {
        &self.classes
    }

    /// Object store
    pub fn heap(&self) -> &ObjectStore {
        &self.heap
    }


    // ===== Classes =====

    /// Register a class
    pub fn register(&self, builder: ClassBuilder) -> RuntimeResult<Arc<ClassRecord>> {
        Ok(self.classes.register(builder)?)
    }

    /// Look up a class record
    pub fn lookup(&self, class: impl Into<ClassId>) -> RuntimeResult<Arc<ClassRecord>> {
        Ok(self.classes.lookup(&class.into())?)
    }

    /// Full instance layout of a class
    pub fn get_all_fields(&self, class: impl Into<ClassId>) -> RuntimeResult<Arc<[FieldDescriptor]>> {
        Ok(self.classes.get_all_fields(&class.into())?)
    }

    /// Check if `sub` is `sup`, a subclass of it, or implements it
    pub fn is_subclass_of(
        &self,
        sub: impl Into<ClassId>,
        sup: impl Into<ClassId>,
    ) -> RuntimeResult<bool> {
        Ok(self.classes.is_subclass_of(&sub.into(), &sup.into())?)
    }

    /// Reflective view of a class
    pub fn mirror(&self, class: impl Into<ClassId>) -> RuntimeResult<ClassMirror> {
        Ok(ClassMirror::new(self.lookup(class)?))
    }

    /// Class of an object
    pub fn class_of(&self, object: ObjectRef) -> RuntimeResult<ClassMirror> {
        Ok(ClassMirror::new(self.heap.get(object)?.class().clone()))
    }

    /// Class of a primitive type, registered on demand
    pub fn primitive_class(&self, tag: &TypeTag) -> RuntimeResult<ClassMirror> {
        Ok(ClassMirror::new(self.classes.primitive_class(tag)?))
    }

    /// Array class with the given component type, registered on demand
    pub fn array_class(&self, component: &TypeTag) -> RuntimeResult<ClassMirror> {
        Ok(ClassMirror::new(self.classes.array_class(component)?))
    }

    /// Class named by a field descriptor (`I`, `[J`, `Lpkg/A;`)
    pub fn class_for_descriptor(&self, descriptor: &str) -> RuntimeResult<ClassMirror> {
        let tag = TypeTag::parse(descriptor)?;
        Ok(ClassMirror::new(self.classes.class_for_type(&tag)?))
    }

    // ===== Initialization =====

    /// Initialize a class (superclass first) if that has not happened yet
    pub fn ensure_initialized(&self, class: impl Into<ClassId>) -> RuntimeResult<()> {
        Ok(init::ensure_initialized(self, &class.into())?)
    }

    /// Current initialization state of a class
    pub fn init_state(&self, class: impl Into<ClassId>) -> RuntimeResult<InitState> {
        Ok(self.lookup(class)?.init_state())
    }

    // ===== Static fields =====

    /// Read a static field, resolving through interfaces and superclasses
    ///
    /// Initializes the class that declares the field.
    pub fn get_static(&self, class: impl Into<ClassId>, name: &str) -> RuntimeResult<Value> {
        let (owner, field) = self.resolve_static(&class.into(), name)?;
        init::ensure_initialized(self, owner.id())?;
        owner
            .read_static(field.slot)
            .ok_or_else(|| no_such_field(owner.id(), name).into())
    }

    /// Write a static field, resolving through interfaces and superclasses
    ///
    /// Initializes the class that declares the field. `final` is not enforced here; static
    /// initializers assign their constants this way.
    pub fn put_static(
        &self,
        class: impl Into<ClassId>,
        name: &str,
        value: Value,
    ) -> RuntimeResult<()> {
        let (owner, field) = self.resolve_static(&class.into(), name)?;
        self.check_assignable(&value, &field.type_tag)?;
        init::ensure_initialized(self, owner.id())?;
        if owner.write_static(field.slot, value) {
            Ok(())
        } else {
            Err(no_such_field(owner.id(), name).into())
        }
    }

    fn resolve_static(
        &self,
        class: &ClassId,
        name: &str,
    ) -> RuntimeResult<(Arc<ClassRecord>, FieldDescriptor)> {
        let record = self.classes.lookup(class)?;
        self.resolve_field(&record, name, &|field: &FieldDescriptor| field.is_static())?
            .ok_or_else(|| no_such_field(class, name).into())
    }

    /// Find a field declared by `record`, its interfaces or its superclasses
    fn resolve_field<P>(
        &self,
        record: &Arc<ClassRecord>,
        name: &str,
        accept: &P,
    ) -> RuntimeResult<Option<(Arc<ClassRecord>, FieldDescriptor)>>
    where
        P: Fn(&FieldDescriptor) -> bool,
    {
        if let Some(field) = record.declared_fields().get(name).filter(|f| accept(f)) {
            return Ok(Some((record.clone(), field.clone())));
        }
        for interface in record.interfaces() {
            let interface = self.classes.lookup(interface)?;
            if let Some(found) = self.resolve_field(&interface, name, accept)? {
                return Ok(Some(found));
            }
        }
        match record.superclass() {
            Some(superclass) => {
                let superclass = self.classes.lookup(superclass)?;
                self.resolve_field(&superclass, name, accept)
            }
            None => Ok(None),
        }
    }

    // ===== Objects =====

    /// Allocate an instance with default slots
    ///
    /// Does not initialize the class and does not run instance field initializers.
    pub fn allocate(&self, class: impl Into<ClassId>) -> RuntimeResult<ObjectRef> {
        let record = self.instantiable(&class.into())?;
        Ok(self.heap.allocate_instance(record)?)
    }

    /// Create an instance: initialize the class, allocate, then apply instance field
    /// initializers (superclass first)
    pub fn new_instance(&self, class: impl Into<ClassId>) -> RuntimeResult<ObjectRef> {
        let class = class.into();
        let record = self.instantiable(&class)?;
        init::ensure_initialized(self, &class)?;

        let mut chain = vec![record.clone()];
        while let Some(superclass) = chain.last().and_then(|r| r.superclass().cloned()) {
            chain.push(self.classes.lookup(&superclass)?);
        }

        let object = self.heap.allocate_instance(record)?;
        let resolved = self.heap.get(object)?;
        for ancestor in chain.iter().rev() {
            for (slot, value) in ancestor.instance_initializers() {
                reflect::write_slot(&resolved, *slot, *value)?;
            }
        }
        Ok(object)
    }

    fn instantiable(&self, class: &ClassId) -> RuntimeResult<Arc<ClassRecord>> {
        let record = self.classes.lookup(class)?;
        if !record.is_instantiable() {
            return Err(HeapError::NotInstantiable {
                class: class.clone(),
                kind: record.kind(),
            }
            .into());
        }
        Ok(record)
    }

    /// Create an array of `length` default elements
    ///
    /// Creating the array does not initialize the element class.
    pub fn new_array(&self, component: TypeTag, length: i32) -> RuntimeResult<ObjectRef> {
        if length < 0 {
            return Err(HeapError::NegativeArraySize(length).into());
        }
        let class = self.classes.array_class(&component)?;
        Ok(self.heap.allocate_array(class, component, length as usize)?)
    }

    /// Number of elements of an array
    pub fn array_length(&self, array: ObjectRef) -> RuntimeResult<usize> {
        let object = self.heap.array(array)?;
        let length = object.as_array().map_or(0, |a| a.len());
        Ok(length)
    }

    /// Load an array element
    pub fn array_load(&self, array: ObjectRef, index: i32) -> RuntimeResult<Value> {
        let object = self.heap.array(array)?;
        let offset = self.element_offset(&object, array, index)?;
        Ok(reflect::read_slot(&object, offset)?)
    }

    /// Store an array element
    pub fn array_store(&self, array: ObjectRef, index: i32, value: Value) -> RuntimeResult<()> {
        let object = self.heap.array(array)?;
        let offset = self.element_offset(&object, array, index)?;
        if let Some(elements) = object.as_array() {
            self.check_assignable(&value, elements.component_type())?;
        }
        Ok(reflect::write_slot(&object, offset, value)?)
    }

    /// Bounds-check an element index, initializing the element class on first access
    fn element_offset(
        &self,
        object: &HeapObject,
        array: ObjectRef,
        index: i32,
    ) -> RuntimeResult<usize> {
        let elements = object.as_array().ok_or(HeapError::NotAnArray(array))?;
        if let Some(element_class) = elements.component_type().element_class() {
            init::ensure_initialized(self, element_class)?;
        }
        let length = elements.len();
        if index < 0 || index as usize >= length {
            return Err(HeapError::IndexOutOfBounds {
                index: i64::from(index),
                length,
            }
            .into());
        }
        Ok(index as usize)
    }

    /// Read an instance field by name, without access checks
    ///
    /// The most derived declaration wins when a subclass shadows a field.
    pub fn read_field(&self, object: ObjectRef, name: &str) -> RuntimeResult<Value> {
        let resolved = self.heap.instance(object)?;
        let slot = layout_slot(resolved.class(), name)?.slot;
        Ok(reflect::read_slot(&resolved, slot)?)
    }

    /// Write an instance field by name, without access checks
    pub fn write_field(&self, object: ObjectRef, name: &str, value: Value) -> RuntimeResult<()> {
        let resolved = self.heap.instance(object)?;
        let field = layout_slot(resolved.class(), name)?;
        self.check_assignable(&value, &field.type_tag)?;
        Ok(reflect::write_slot(&resolved, field.slot, value)?)
    }

    /// Check that `value` may be stored in a slot of type `tag`
    ///
    /// Reference slots accept null or an object whose class is the declared class or one
    /// of its subtypes.
    fn check_assignable(&self, value: &Value, tag: &TypeTag) -> RuntimeResult<()> {
        if !value.fits(tag) {
            return Err(AccessError::TypeMismatch(format!(
                "cannot store {} into {}",
                value.type_name(),
                tag
            ))
            .into());
        }
        if let Value::Ref(target) = value {
            let actual = self.heap.get(*target)?;
            // resolving the slot type registers array classes on demand
            let compatible = match self.classes.class_for_type(tag) {
                Ok(expected) => self
                    .classes
                    .is_subclass_of(actual.class_id(), expected.id())
                    .unwrap_or(false),
                Err(_) => false,
            };
            if !compatible {
                return Err(AccessError::TypeMismatch(format!(
                    "cannot store {} into {}",
                    actual.class_id().java_name(),
                    tag
                ))
                .into());
            }
        }
        Ok(())
    }

    /// Structural hash code (shallow, cycle-safe)
    pub fn hash_code(&self, object: ObjectRef) -> RuntimeResult<i32> {
        let object = self.heap.get(object)?;
        Ok(structural_hash(&object))
    }

    /// Identity hash code
    pub fn identity_hash_code(&self, object: ObjectRef) -> RuntimeResult<i32> {
        self.heap.get(object)?;
        Ok(identity_hash(object))
    }

    // ===== Reflection =====

    /// Mint an access-bypass token
    pub fn grant_access_bypass(&self, reason: &str) -> RuntimeResult<AccessBypass> {
        if !self.options.reflect.allow_bypass {
            tracing::warn!(runtime = self.id, reason, "access bypass denied by configuration");
            return Err(AccessError::BypassDenied.into());
        }
        tracing::info!(runtime = self.id, reason, "access bypass granted");
        Ok(AccessBypass::new(Arc::from(reason), self.id))
    }

    /// Fields declared by a class, in declaration order
    pub fn get_declared_fields(&self, class: impl Into<ClassId>) -> RuntimeResult<Vec<ReflectedField>> {
        Ok(self
            .classes
            .get_declared_fields(&class.into())?
            .into_iter()
            .map(ReflectedField::new)
            .collect())
    }

    /// Fields declared by a class, each carrying `bypass`
    pub fn get_declared_fields_with(
        &self,
        class: impl Into<ClassId>,
        bypass: &AccessBypass,
    ) -> RuntimeResult<Vec<ReflectedField>> {
        Ok(self
            .classes
            .get_declared_fields(&class.into())?
            .into_iter()
            .map(|field| ReflectedField::with_bypass(field, bypass))
            .collect())
    }

    /// Public field of a class, its interfaces or its superclasses
    pub fn get_field_by_name(
        &self,
        class: impl Into<ClassId>,
        name: &str,
    ) -> RuntimeResult<ReflectedField> {
        let class = class.into();
        let record = self.classes.lookup(&class)?;
        let (_, field) = self
            .resolve_field(&record, name, &|field: &FieldDescriptor| field.is_public())?
            .ok_or_else(|| no_such_field(&class, name))?;
        Ok(ReflectedField::new(field))
    }

    /// Read an instance field through a reflected handle
    pub fn get_field(&self, object: ObjectRef, field: &ReflectedField) -> RuntimeResult<Value> {
        let resolved = self.heap.instance(object)?;
        reflect::check_receiver(resolved.class(), field)?;
        reflect::check_access(field, FieldAction::Read, self.id)?;
        Ok(reflect::read_slot(&resolved, field.descriptor().slot)?)
    }

    /// Write an instance field through a reflected handle
    pub fn set_field(
        &self,
        object: ObjectRef,
        field: &ReflectedField,
        value: Value,
    ) -> RuntimeResult<()> {
        let resolved = self.heap.instance(object)?;
        reflect::check_receiver(resolved.class(), field)?;
        reflect::check_value(field, &value)?;
        self.check_assignable(&value, &field.descriptor().type_tag)?;
        reflect::check_access(field, FieldAction::Write, self.id)?;
        Ok(reflect::write_slot(&resolved, field.descriptor().slot, value)?)
    }

    /// Read a static field through a reflected handle (initializes the declaring class)
    pub fn get_static_field(&self, field: &ReflectedField) -> RuntimeResult<Value> {
        let owner = self.static_owner(field)?;
        reflect::check_access(field, FieldAction::Read, self.id)?;
        init::ensure_initialized(self, owner.id())?;
        owner
            .read_static(field.descriptor().slot)
            .ok_or_else(|| no_such_field(owner.id(), field.name()).into())
    }

    /// Write a static field through a reflected handle (initializes the declaring class)
    pub fn set_static_field(&self, field: &ReflectedField, value: Value) -> RuntimeResult<()> {
        let owner = self.static_owner(field)?;
        reflect::check_value(field, &value)?;
        self.check_assignable(&value, &field.descriptor().type_tag)?;
        reflect::check_access(field, FieldAction::Write, self.id)?;
        init::ensure_initialized(self, owner.id())?;
        if owner.write_static(field.descriptor().slot, value) {
            Ok(())
        } else {
            Err(no_such_field(owner.id(), field.name()).into())
        }
    }

    /// Declaring class of a static handle, checked against its declared fields
    fn static_owner(&self, field: &ReflectedField) -> RuntimeResult<Arc<ClassRecord>> {
        let owner = self.classes.lookup(&field.descriptor().declaring_class)?;
        reflect::check_static(&owner, field)?;
        Ok(owner)
    }

    // ===== Offsets =====

    /// Slot offset of an instance field
    pub fn field_offset(&self, field: &ReflectedField, bypass: &AccessBypass) -> RuntimeResult<usize> {
        bypass.verify(self.id)?;
        if field.descriptor().is_static() {
            return Err(AccessError::TypeMismatch(format!(
                "{} is static and has no instance offset",
                field.descriptor()
            ))
            .into());
        }
        Ok(field.descriptor().slot)
    }

    /// Read the slot at `offset` (an array offset is an element index)
    pub fn get_at_offset(
        &self,
        object: ObjectRef,
        offset: usize,
        bypass: &AccessBypass,
    ) -> RuntimeResult<Value> {
        bypass.verify(self.id)?;
        let object = self.heap.get(object)?;
        Ok(reflect::read_slot(&object, offset)?)
    }

    /// Write the slot at `offset`, ignoring visibility and `final`
    pub fn put_at_offset(
        &self,
        object: ObjectRef,
        offset: usize,
        value: Value,
        bypass: &AccessBypass,
    ) -> RuntimeResult<()> {
        bypass.verify(self.id)?;
        let object = self.heap.get(object)?;
        Ok(reflect::write_slot(&object, offset, value)?)
    }

    /// Atomically replace the slot at `offset` if it holds `expected`
    pub fn compare_and_swap(
        &self,
        object: ObjectRef,
        offset: usize,
        expected: Value,
        new: Value,
        bypass: &AccessBypass,
    ) -> RuntimeResult<bool> {
        bypass.verify(self.id)?;
        let object = self.heap.get(object)?;
        Ok(reflect::compare_and_swap_slot(&object, offset, expected, new)?)
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

fn no_such_field(class: &ClassId, name: &str) -> RegistryError {
    RegistryError::NoSuchField {
        class: class.clone(),
        field: name.to_string(),
    }
}

fn layout_slot<'a>(record: &'a ClassRecord, name: &str) -> Result<&'a FieldDescriptor, RegistryError> {
    record
        .layout()
        .iter()
        .rev()
        .find(|field| field.name() == name)
        .ok_or_else(|| no_such_field(record.id(), name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RuntimeError;
    use javelin_types::FieldFlags;

    fn runtime() -> Runtime {
        let runtime = Runtime::new();
        runtime
            .register(
                ClassBuilder::new("pkg/Point")
                    .field_with("x", TypeTag::Int, FieldFlags::PUBLIC, Value::Int(3))
                    .field("y", TypeTag::Int, FieldFlags::PRIVATE)
                    .static_field_with("count", TypeTag::Int, FieldFlags::PUBLIC, Value::Int(7)),
            )
            .unwrap();
        runtime
    }

    #[test]
    fn test_runtime_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Runtime>();
    }

    #[test]
    fn test_allocate_vs_new_instance() {
        let runtime = runtime();
        let raw = runtime.allocate("pkg/Point").unwrap();
        assert_eq!(runtime.read_field(raw, "x").unwrap(), Value::Int(0));
        assert_eq!(runtime.init_state("pkg/Point").unwrap(), InitState::Uninitialized);

        let built = runtime.new_instance("pkg/Point").unwrap();
        assert_eq!(runtime.read_field(built, "x").unwrap(), Value::Int(3));
        assert_eq!(runtime.init_state("pkg/Point").unwrap(), InitState::Initialized);
    }

    #[test]
    fn test_static_access() {
        let runtime = runtime();
        assert_eq!(runtime.get_static("pkg/Point", "count").unwrap(), Value::Int(7));
        runtime.put_static("pkg/Point", "count", Value::Int(8)).unwrap();
        assert_eq!(runtime.get_static("pkg/Point", "count").unwrap(), Value::Int(8));
        assert!(matches!(
            runtime.put_static("pkg/Point", "count", Value::Long(8)),
            Err(RuntimeError::Access(AccessError::TypeMismatch(_)))
        ));
        assert!(matches!(
            runtime.get_static("pkg/Point", "x"),
            Err(RuntimeError::Registry(RegistryError::NoSuchField { .. }))
        ));
    }

    #[test]
    fn test_not_instantiable() {
        let runtime = runtime();
        runtime.register(ClassBuilder::interface("pkg/I")).unwrap();
        assert!(matches!(
            runtime.allocate("pkg/I"),
            Err(RuntimeError::Heap(HeapError::NotInstantiable { .. }))
        ));
        assert!(matches!(
            runtime.allocate("pkg/Missing"),
            Err(RuntimeError::Registry(RegistryError::ClassNotFound(_)))
        ));
    }

    #[test]
    fn test_arrays() {
        let runtime = runtime();
        let array = runtime.new_array(TypeTag::Int, 3).unwrap();
        assert_eq!(runtime.array_length(array).unwrap(), 3);
        runtime.array_store(array, 2, Value::Int(9)).unwrap();
        assert_eq!(runtime.array_load(array, 2).unwrap(), Value::Int(9));
        assert!(matches!(
            runtime.array_load(array, 3),
            Err(RuntimeError::Heap(HeapError::IndexOutOfBounds { index: 3, length: 3 }))
        ));
        assert!(matches!(
            runtime.array_load(array, -1),
            Err(RuntimeError::Heap(HeapError::IndexOutOfBounds { .. }))
        ));
        assert!(matches!(
            runtime.array_store(array, 0, Value::Long(1)),
            Err(RuntimeError::Access(AccessError::TypeMismatch(_)))
        ));
        assert!(matches!(
            runtime.new_array(TypeTag::Int, -1),
            Err(RuntimeError::Heap(HeapError::NegativeArraySize(-1)))
        ));
        assert_eq!(runtime.class_of(array).unwrap().to_string(), "class [I");
    }

    #[test]
    fn test_reference_slots_check_class() {
        let runtime = runtime();
        runtime
            .register(
                ClassBuilder::new("pkg/Holder")
                    .field("point", TypeTag::Reference(ClassId::new("pkg/Point")), FieldFlags::PUBLIC),
            )
            .unwrap();
        let holder = runtime.allocate("pkg/Holder").unwrap();
        let point = runtime.allocate("pkg/Point").unwrap();
        runtime.write_field(holder, "point", Value::Ref(point)).unwrap();
        assert!(matches!(
            runtime.write_field(holder, "point", Value::Ref(holder)),
            Err(RuntimeError::Access(AccessError::TypeMismatch(_)))
        ));
        runtime.write_field(holder, "point", Value::Null).unwrap();
    }

    #[test]
    fn test_class_for_descriptor() {
        let runtime = runtime();
        assert_eq!(runtime.class_for_descriptor("I").unwrap().to_string(), "int");
        assert_eq!(
            runtime.class_for_descriptor("[Lpkg/Point;").unwrap().to_string(),
            "class [Lpkg.Point;"
        );
        assert!(matches!(
            runtime.class_for_descriptor("Q"),
            Err(RuntimeError::Descriptor(_))
        ));
    }

    #[test]
    fn test_bypass_denied() {
        let runtime = Runtime::with_options(RuntimeOptions::default().deny_bypass()).unwrap();
        assert!(matches!(
            runtime.grant_access_bypass("test"),
            Err(RuntimeError::Access(AccessError::BypassDenied))
        ));
    }

    #[test]
    fn test_edited_descriptor_rejected() {
        let runtime = runtime();
        runtime
            .register(ClassBuilder::new("pkg/Vault").field(
                "secret",
                TypeTag::Int,
                FieldFlags::PRIVATE | FieldFlags::FINAL,
            ))
            .unwrap();
        let vault = runtime.new_instance("pkg/Vault").unwrap();
        let mut forged = runtime.get_declared_fields("pkg/Vault").unwrap()[0]
            .descriptor()
            .clone();
        forged.flags = FieldFlags::PUBLIC;

        let handle = ReflectedField::new(forged);
        assert!(matches!(
            runtime.set_field(vault, &handle, Value::Int(99)),
            Err(RuntimeError::Access(AccessError::TypeMismatch(_)))
        ));
        assert!(matches!(
            runtime.get_field(vault, &handle),
            Err(RuntimeError::Access(AccessError::TypeMismatch(_)))
        ));
        assert_eq!(runtime.read_field(vault, "secret").unwrap(), Value::Int(0));
    }

    #[test]
    fn test_edited_static_descriptor_rejected() {
        let runtime = runtime();
        runtime
            .register(ClassBuilder::new("pkg/Config").static_field_with(
                "level",
                TypeTag::Int,
                FieldFlags::PRIVATE,
                Value::Int(1),
            ))
            .unwrap();
        let mut forged = runtime.get_declared_fields("pkg/Config").unwrap()[0]
            .descriptor()
            .clone();
        forged.flags = FieldFlags::PUBLIC | FieldFlags::STATIC;

        assert!(matches!(
            runtime.set_static_field(&ReflectedField::new(forged), Value::Int(5)),
            Err(RuntimeError::Access(AccessError::TypeMismatch(_)))
        ));
        assert_eq!(runtime.get_static("pkg/Config", "level").unwrap(), Value::Int(1));
    }

    #[test]
    fn test_offsets_refuse_foreign_bypass() {
        let lenient = Runtime::new();
        let token = lenient.grant_access_bypass("other runtime").unwrap();

        let strict = Runtime::with_options(RuntimeOptions::default().deny_bypass()).unwrap();
        strict
            .register(ClassBuilder::new("pkg/Cell").field("v", TypeTag::Int, FieldFlags::PRIVATE))
            .unwrap();
        let cell = strict.allocate("pkg/Cell").unwrap();
        let field = strict.get_declared_fields("pkg/Cell").unwrap().remove(0);

        let denied = |result: RuntimeResult<()>| {
            matches!(result, Err(RuntimeError::Access(AccessError::BypassDenied)))
        };
        assert!(denied(strict.field_offset(&field, &token).map(|_| ())));
        assert!(denied(strict.get_at_offset(cell, 0, &token).map(|_| ())));
        assert!(denied(strict.put_at_offset(cell, 0, Value::Int(1), &token)));
        assert!(denied(
            strict
                .compare_and_swap(cell, 0, Value::Int(0), Value::Int(1), &token)
                .map(|_| ())
        ));
        assert_eq!(strict.read_field(cell, "v").unwrap(), Value::Int(0));

        // the minting runtime still honors its own token
        lenient
            .register(ClassBuilder::new("pkg/Cell").field("v", TypeTag::Int, FieldFlags::PRIVATE))
            .unwrap();
        let own = lenient.allocate("pkg/Cell").unwrap();
        lenient.put_at_offset(own, 0, Value::Int(4), &token).unwrap();
        assert_eq!(lenient.get_at_offset(own, 0, &token).unwrap(), Value::Int(4));
    }

    #[test]
    fn test_covariant_array_slot() {
        let runtime = runtime();
        runtime.register(ClassBuilder::new("pkg/A")).unwrap();
        runtime.register(ClassBuilder::new("pkg/B").superclass("pkg/A")).unwrap();
        let a_array = TypeTag::Array(Box::new(TypeTag::Reference(ClassId::new("pkg/A"))));
        runtime
            .register(ClassBuilder::new("pkg/Holder").field("items", a_array, FieldFlags::PUBLIC))
            .unwrap();
        let holder = runtime.allocate("pkg/Holder").unwrap();

        let b_array = runtime
            .new_array(TypeTag::Reference(ClassId::new("pkg/B")), 2)
            .unwrap();
        runtime.write_field(holder, "items", Value::Ref(b_array)).unwrap();
        assert_eq!(runtime.read_field(holder, "items").unwrap(), Value::Ref(b_array));

        let ints = runtime.new_array(TypeTag::Int, 2).unwrap();
        assert!(matches!(
            runtime.write_field(holder, "items", Value::Ref(ints)),
            Err(RuntimeError::Access(AccessError::TypeMismatch(_)))
        ));
    }
}
