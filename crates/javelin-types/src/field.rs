//! Field descriptors and per-class field tables

use crate::class_id::ClassId;
use crate::ty::TypeTag;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;

/// Field access flags (JVM `access_flags` bit values)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FieldFlags(u16);

impl FieldFlags {
    /// Package-private, instance, mutable
    pub const NONE: Self = Self(0x0000);
    /// Declared `public`
    pub const PUBLIC: Self = Self(0x0001);
    /// Declared `private`
    pub const PRIVATE: Self = Self(0x0002);
    /// Declared `protected`
    pub const PROTECTED: Self = Self(0x0004);
    /// Declared `static`
    pub const STATIC: Self = Self(0x0008);
    /// Declared `final`
    pub const FINAL: Self = Self(0x0010);
    /// Declared `volatile`
    pub const VOLATILE: Self = Self(0x0040);
    /// Declared `transient`
    pub const TRANSIENT: Self = Self(0x0080);

    /// Create from raw bits
    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    /// Get raw bits
    pub const fn bits(&self) -> u16 {
        self.0
    }

    /// Check if all bits of `other` are set
    pub const fn contains(&self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    /// Union of flags
    pub const fn union(&self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Check for `public`
    pub const fn is_public(&self) -> bool {
        self.contains(Self::PUBLIC)
    }

    /// Check for `private`
    pub const fn is_private(&self) -> bool {
        self.contains(Self::PRIVATE)
    }

    /// Check for `static`
    pub const fn is_static(&self) -> bool {
        self.contains(Self::STATIC)
    }

    /// Check for `final`
    pub const fn is_final(&self) -> bool {
        self.contains(Self::FINAL)
    }
}

impl std::ops::BitOr for FieldFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl fmt::Display for FieldFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut words = Vec::new();
        if self.contains(Self::PUBLIC) {
            words.push("public");
        }
        if self.contains(Self::PRIVATE) {
            words.push("private");
        }
        if self.contains(Self::PROTECTED) {
            words.push("protected");
        }
        if self.contains(Self::STATIC) {
            words.push("static");
        }
        if self.contains(Self::FINAL) {
            words.push("final");
        }
        if self.contains(Self::VOLATILE) {
            words.push("volatile");
        }
        if self.contains(Self::TRANSIENT) {
            words.push("transient");
        }
        f.write_str(&words.join(" "))
    }
}

/// A declared field with its assigned storage slot
///
/// For instance fields `slot` indexes the full instance layout of any subclass of the
/// declaring class. For static fields it indexes the declaring class's static slot table.
/// Slots are assigned once at registration and never change.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldDescriptor {
    /// Field name
    pub name: Arc<str>,
    /// Declared type
    pub type_tag: TypeTag,
    /// Class whose declaration introduced the field
    pub declaring_class: ClassId,
    /// Storage slot
    pub slot: usize,
    /// Access flags
    pub flags: FieldFlags,
}

impl FieldDescriptor {
    /// Create a descriptor
    pub fn new(
        name: impl Into<Arc<str>>,
        type_tag: TypeTag,
        declaring_class: ClassId,
        slot: usize,
        flags: FieldFlags,
    ) -> Self {
        Self {
            name: name.into(),
            type_tag,
            declaring_class,
            slot,
            flags,
        }
    }

    /// Field name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the field lives in the static slot table
    pub fn is_static(&self) -> bool {
        self.flags.is_static()
    }

    /// Whether the field is immutable after construction
    pub fn is_final(&self) -> bool {
        self.flags.is_final()
    }

    /// Whether the field is visible without an access bypass
    pub fn is_public(&self) -> bool {
        self.flags.is_public()
    }
}

impl fmt::Display for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.flags.bits() != 0 {
            write!(f, "{} ", self.flags)?;
        }
        write!(
            f,
            "{} {}.{}",
            self.type_tag,
            self.declaring_class.java_name(),
            self.name
        )
    }
}

/// Ordered table of the fields declared directly by one class
#[derive(Debug, Clone, Default)]
pub struct FieldTable {
    /// Descriptors in declaration order
    fields: Vec<FieldDescriptor>,
    /// Field name to position in `fields`
    by_name: FxHashMap<Arc<str>, usize>,
}

impl FieldTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a descriptor
    ///
    /// Returns the position of the new entry, or None if a field with the same name is
    /// already declared (the table is left unchanged).
    pub fn push(&mut self, field: FieldDescriptor) -> Option<usize> {
        if self.by_name.contains_key(&field.name) {
            return None;
        }
        let index = self.fields.len();
        self.by_name.insert(field.name.clone(), index);
        self.fields.push(field);
        Some(index)
    }

    /// Look up a declared field by name
    pub fn get(&self, name: &str) -> Option<&FieldDescriptor> {
        self.by_name.get(name).map(|index| &self.fields[*index])
    }

    /// All declared fields, in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter()
    }

    /// Declared instance fields, in declaration order
    pub fn instance_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| !f.is_static())
    }

    /// Declared static fields, in declaration order
    pub fn static_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| f.is_static())
    }

    /// Descriptors as a slice
    pub fn as_slice(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Number of declared fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if no fields are declared
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
