//! Reflected field handles and access checks
//!
//! Checks run in a fixed order so callers see the most fundamental problem first:
//!
//! 1. `TypeMismatch`: wrong kind of field (static vs instance), a receiver whose class
//!    does not inherit the field, or a value that does not fit the field type
//! 2. `IllegalAccess`: non-public field without a bypass
//! 3. `ReadOnlyField`: write to a `final` field without a bypass
//!
//! A handle carrying a bypass minted by a different runtime fails with `BypassDenied`
//! before any of these.

use super::capability::AccessBypass;
use super::AccessError;
use crate::class::ClassRecord;
use crate::value::Value;
use javelin_types::FieldDescriptor;
use std::fmt;

/// Kind of access being checked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldAction {
    /// Read the field
    Read,
    /// Write the field
    Write,
}

impl fmt::Display for FieldAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldAction::Read => write!(f, "read"),
            FieldAction::Write => write!(f, "write"),
        }
    }
}

/// A field obtained through reflection
#[derive(Debug, Clone)]
pub struct ReflectedField {
    descriptor: FieldDescriptor,
    bypass: Option<AccessBypass>,
}

impl ReflectedField {
    /// Wrap a descriptor without bypass
    pub(crate) fn new(descriptor: FieldDescriptor) -> Self {
        Self {
            descriptor,
            bypass: None,
        }
    }

    /// Wrap a descriptor that carries a bypass
    pub(crate) fn with_bypass(descriptor: FieldDescriptor, bypass: &AccessBypass) -> Self {
        Self {
            descriptor,
            bypass: Some(bypass.clone()),
        }
    }

    /// Field descriptor
    pub fn descriptor(&self) -> &FieldDescriptor {
        &self.descriptor
    }

    /// Field name
    pub fn name(&self) -> &str {
        self.descriptor.name()
    }

    /// Whether the handle carries a bypass
    pub fn is_accessible(&self) -> bool {
        self.bypass.is_some()
    }

    /// Attach a bypass to this handle
    pub fn set_accessible(&mut self, bypass: &AccessBypass) {
        self.bypass = Some(bypass.clone());
    }

    /// Bypass carried by this handle
    pub fn bypass(&self) -> Option<&AccessBypass> {
        self.bypass.as_ref()
    }
}

impl fmt::Display for ReflectedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.descriptor)
    }
}

/// Check that `field` is an instance field inherited by `receiver`
pub(crate) fn check_receiver(
    receiver: &ClassRecord,
    field: &ReflectedField,
) -> Result<(), AccessError> {
    let descriptor = field.descriptor();
    if descriptor.is_static() {
        return Err(AccessError::TypeMismatch(format!(
            "{} is static, not an instance field",
            descriptor
        )));
    }
    let in_layout = receiver.layout().get(descriptor.slot) == Some(descriptor);
    if !receiver.has_supertype(&descriptor.declaring_class) || !in_layout {
        return Err(AccessError::TypeMismatch(format!(
            "{} is not a field of {}",
            descriptor,
            receiver.id()
        )));
    }
    Ok(())
}

/// Check that `field` is a static field declared by `owner`
pub(crate) fn check_static(owner: &ClassRecord, field: &ReflectedField) -> Result<(), AccessError> {
    let descriptor = field.descriptor();
    if !descriptor.is_static() {
        return Err(AccessError::TypeMismatch(format!(
            "{} is an instance field, not static",
            descriptor
        )));
    }
    if owner.declared_fields().get(descriptor.name()) != Some(descriptor) {
        return Err(AccessError::TypeMismatch(format!(
            "{} is not a static field of {}",
            descriptor,
            owner.id()
        )));
    }
    Ok(())
}

/// Check that `value` fits the field's type
pub(crate) fn check_value(field: &ReflectedField, value: &Value) -> Result<(), AccessError> {
    let descriptor = field.descriptor();
    if !value.fits(&descriptor.type_tag) {
        return Err(AccessError::TypeMismatch(format!(
            "cannot store {} into {}",
            value.type_name(),
            descriptor
        )));
    }
    Ok(())
}

/// Bypass origin, visibility and `final` checks for runtime `runtime`
pub(crate) fn check_access(
    field: &ReflectedField,
    action: FieldAction,
    runtime: u64,
) -> Result<(), AccessError> {
    if let Some(bypass) = field.bypass() {
        bypass.verify(runtime)?;
    }
    let descriptor = field.descriptor();
    let illegal = || AccessError::IllegalAccess {
        class: descriptor.declaring_class.clone(),
        field: descriptor.name().to_string(),
        action,
    };

    if !descriptor.is_public() && !field.is_accessible() {
        return Err(illegal());
    }
    if action == FieldAction::Write && descriptor.is_final() && !field.is_accessible() {
        return Err(AccessError::ReadOnlyField {
            class: descriptor.declaring_class.clone(),
            field: descriptor.name().to_string(),
        });
    }
    Ok(())
}
