//! Slot values
//!
//! Every instance slot, static slot and array element holds a [`Value`]. References to
//! heap objects are identities ([`ObjectRef`]) resolved through the object store; holding
//! a reference implies no ownership, so arbitrary (cyclic) graphs are representable.

use javelin_types::TypeTag;
use std::fmt;

/// Identity of a heap object
///
/// Identities are handed out by the object store in allocation order and are never
/// reused within a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectRef(u64);

impl ObjectRef {
    /// Wrap a raw identity
    pub const fn from_raw(raw: u64) -> Self {
        ObjectRef(raw)
    }

    /// Get the raw identity
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A value stored in a slot
#[derive(Clone, Copy, PartialEq)]
pub enum Value {
    /// Null reference
    Null,
    /// `boolean`
    Boolean(bool),
    /// `byte`
    Byte(i8),
    /// `char` (UTF-16 code unit)
    Char(u16),
    /// `short`
    Short(i16),
    /// `int`
    Int(i32),
    /// `long`
    Long(i64),
    /// `float`
    Float(f32),
    /// `double`
    Double(f64),
    /// Reference to a heap object
    Ref(ObjectRef),
}

impl Value {
    /// Create a null value
    #[inline]
    pub const fn null() -> Self {
        Value::Null
    }

    /// Default (zero) value for a slot of the given type
    pub fn default_for(tag: &TypeTag) -> Self {
        match tag {
            TypeTag::Boolean => Value::Boolean(false),
            TypeTag::Byte => Value::Byte(0),
            TypeTag::Char => Value::Char(0),
            TypeTag::Short => Value::Short(0),
            TypeTag::Int => Value::Int(0),
            TypeTag::Long => Value::Long(0),
            TypeTag::Float => Value::Float(0.0),
            TypeTag::Double => Value::Double(0.0),
            TypeTag::Reference(_) | TypeTag::Array(_) => Value::Null,
        }
    }

    /// Check whether this value may be stored in a slot of the given type
    ///
    /// Primitive slots require the exact primitive kind; reference slots accept null or
    /// any reference (class compatibility of the target is the caller's concern).
    pub fn fits(&self, tag: &TypeTag) -> bool {
        matches!(
            (self, tag),
            (Value::Boolean(_), TypeTag::Boolean)
                | (Value::Byte(_), TypeTag::Byte)
                | (Value::Char(_), TypeTag::Char)
                | (Value::Short(_), TypeTag::Short)
                | (Value::Int(_), TypeTag::Int)
                | (Value::Long(_), TypeTag::Long)
                | (Value::Float(_), TypeTag::Float)
                | (Value::Double(_), TypeTag::Double)
                | (Value::Null, TypeTag::Reference(_) | TypeTag::Array(_))
                | (Value::Ref(_), TypeTag::Reference(_) | TypeTag::Array(_))
        )
    }

    /// Bitwise identity comparison (floats compare by bit pattern, so NaN matches NaN)
    pub fn identical(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Double(a), Value::Double(b)) => a.to_bits() == b.to_bits(),
            (a, b) => a == b,
        }
    }

    /// Check if this value is null
    #[inline]
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Extract boolean value
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Extract an int-like value (`byte`, `char`, `short`, `int`) widened to i32
    pub const fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Byte(b) => Some(*b as i32),
            Value::Char(c) => Some(*c as i32),
            Value::Short(s) => Some(*s as i32),
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Extract long value
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Long(l) => Some(*l),
            _ => None,
        }
    }

    /// Extract float value
    pub const fn as_f32(&self) -> Option<f32> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Extract double value
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(d) => Some(*d),
            _ => None,
        }
    }

    /// Extract reference
    pub const fn as_object(&self) -> Option<ObjectRef> {
        match self {
            Value::Ref(r) => Some(*r),
            _ => None,
        }
    }

    /// Get type name for debugging
    pub const fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Byte(_) => "byte",
            Value::Char(_) => "char",
            Value::Short(_) => "short",
            Value::Int(_) => "int",
            Value::Long(_) => "long",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::Ref(_) => "reference",
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "boolean({})", b),
            Value::Byte(b) => write!(f, "byte({})", b),
            Value::Char(c) => write!(f, "char({:#06x})", c),
            Value::Short(s) => write!(f, "short({})", s),
            Value::Int(i) => write!(f, "int({})", i),
            Value::Long(l) => write!(f, "long({})", l),
            Value::Float(x) => write!(f, "float({})", x),
            Value::Double(x) => write!(f, "double({})", x),
            Value::Ref(r) => write!(f, "ref({})", r),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Byte(b) => write!(f, "{}", b),
            Value::Char(c) => match char::from_u32(*c as u32) {
                Some(ch) => write!(f, "{}", ch),
                None => write!(f, "\\u{:04x}", c),
            },
            Value::Short(s) => write!(f, "{}", s),
            Value::Int(i) => write!(f, "{}", i),
            Value::Long(l) => write!(f, "{}", l),
            Value::Float(x) => write!(f, "{}", x),
            Value::Double(x) => write!(f, "{}", x),
            Value::Ref(r) => write!(f, "[object{}]", r),
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::null()
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i)
    }
}

impl From<i64> for Value {
    fn from(l: i64) -> Self {
        Value::Long(l)
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Double(d)
    }
}

impl From<ObjectRef> for Value {
    fn from(r: ObjectRef) -> Self {
        Value::Ref(r)
    }
}
