//! Field type tags and JVM field descriptors
//!
//! ```text
//! Z boolean   B byte   C char   S short
//! I int       J long   F float  D double
//! Lpkg/Name;  object reference
//! [T          array of T
//! ```

use crate::class_id::ClassId;
use crate::error::DescriptorError;
use std::fmt;

const MAX_ARRAY_DIMENSIONS: usize = 255;

/// Static type of a field or array element
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeTag {
    /// `boolean`
    Boolean,
    /// `byte`
    Byte,
    /// `char` (UTF-16 code unit)
    Char,
    /// `short`
    Short,
    /// `int`
    Int,
    /// `long`
    Long,
    /// `float`
    Float,
    /// `double`
    Double,
    /// Reference to an instance of the named class (or a subtype)
    Reference(ClassId),
    /// Array with the given component type
    Array(Box<TypeTag>),
}

impl TypeTag {
    /// Parse a complete field descriptor such as `I`, `Lpkg/A;` or `[[J`
    pub fn parse(descriptor: &str) -> Result<Self, DescriptorError> {
        if descriptor.is_empty() {
            return Err(DescriptorError::Empty);
        }
        let (tag, rest) = Self::parse_prefix(descriptor, descriptor)?;
        if !rest.is_empty() {
            return Err(DescriptorError::TrailingCharacters(descriptor.to_string()));
        }
        Ok(tag)
    }

    fn parse_prefix<'a>(input: &'a str, full: &str) -> Result<(Self, &'a str), DescriptorError> {
        let dims = input.bytes().take_while(|b| *b == b'[').count();
        if dims > MAX_ARRAY_DIMENSIONS {
            return Err(DescriptorError::TooManyDimensions(full.to_string()));
        }
        let rest = &input[dims..];
        let mut chars = rest.chars();
        let first = chars.next().ok_or(DescriptorError::Empty)?;
        let (mut tag, rest) = match first {
            'Z' => (TypeTag::Boolean, &rest[1..]),
            'B' => (TypeTag::Byte, &rest[1..]),
            'C' => (TypeTag::Char, &rest[1..]),
            'S' => (TypeTag::Short, &rest[1..]),
            'I' => (TypeTag::Int, &rest[1..]),
            'J' => (TypeTag::Long, &rest[1..]),
            'F' => (TypeTag::Float, &rest[1..]),
            'D' => (TypeTag::Double, &rest[1..]),
            'L' => {
                let end = rest
                    .find(';')
                    .ok_or_else(|| DescriptorError::MalformedObjectType(full.to_string()))?;
                let name = &rest[1..end];
                if name.is_empty() {
                    return Err(DescriptorError::MalformedObjectType(full.to_string()));
                }
                (TypeTag::Reference(ClassId::new(name)), &rest[end + 1..])
            }
            other => {
                return Err(DescriptorError::UnknownBaseType {
                    found: other,
                    descriptor: full.to_string(),
                })
            }
        };
        for _ in 0..dims {
            tag = TypeTag::Array(Box::new(tag));
        }
        Ok((tag, rest))
    }

    /// Render as a JVM field descriptor
    pub fn descriptor(&self) -> String {
        let mut out = String::new();
        self.write_descriptor(&mut out);
        out
    }

    fn write_descriptor(&self, out: &mut String) {
        match self {
            TypeTag::Boolean => out.push('Z'),
            TypeTag::Byte => out.push('B'),
            TypeTag::Char => out.push('C'),
            TypeTag::Short => out.push('S'),
            TypeTag::Int => out.push('I'),
            TypeTag::Long => out.push('J'),
            TypeTag::Float => out.push('F'),
            TypeTag::Double => out.push('D'),
            TypeTag::Reference(class) => {
                out.push('L');
                out.push_str(class.as_str());
                out.push(';');
            }
            TypeTag::Array(component) => {
                out.push('[');
                component.write_descriptor(out);
            }
        }
    }

    /// Map a primitive type name (`"int"`) to its tag
    pub fn from_primitive_name(name: &str) -> Option<Self> {
        Some(match name {
            "boolean" => TypeTag::Boolean,
            "byte" => TypeTag::Byte,
            "char" => TypeTag::Char,
            "short" => TypeTag::Short,
            "int" => TypeTag::Int,
            "long" => TypeTag::Long,
            "float" => TypeTag::Float,
            "double" => TypeTag::Double,
            _ => return None,
        })
    }

    /// Primitive type name, or None for references and arrays
    pub fn primitive_name(&self) -> Option<&'static str> {
        Some(match self {
            TypeTag::Boolean => "boolean",
            TypeTag::Byte => "byte",
            TypeTag::Char => "char",
            TypeTag::Short => "short",
            TypeTag::Int => "int",
            TypeTag::Long => "long",
            TypeTag::Float => "float",
            TypeTag::Double => "double",
            TypeTag::Reference(_) | TypeTag::Array(_) => return None,
        })
    }

    /// Check if this is a primitive type
    pub fn is_primitive(&self) -> bool {
        self.primitive_name().is_some()
    }

    /// Check if values of this type are heap references
    pub fn is_reference(&self) -> bool {
        matches!(self, TypeTag::Reference(_) | TypeTag::Array(_))
    }

    /// Id of the class that represents this type at runtime
    ///
    /// Primitives map to their primitive class (`int`), references to the named class
    /// and arrays to the array class named by the descriptor (`[I`).
    pub fn class_id(&self) -> ClassId {
        match self {
            TypeTag::Reference(class) => class.clone(),
            TypeTag::Array(_) => ClassId::new(self.descriptor()),
            primitive => ClassId::new(primitive.primitive_name().unwrap_or_default()),
        }
    }

    /// Innermost element type of an array (the type itself for non-arrays)
    pub fn element_type(&self) -> &TypeTag {
        match self {
            TypeTag::Array(component) => component.element_type(),
            other => other,
        }
    }

    /// Class referenced by the innermost element type, if it is a class
    pub fn element_class(&self) -> Option<&ClassId> {
        match self.element_type() {
            TypeTag::Reference(class) => Some(class),
            _ => None,
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeTag::Reference(class) => write!(f, "{}", class.java_name()),
            TypeTag::Array(component) => write!(f, "{}[]", component),
            primitive => f.write_str(primitive.primitive_name().unwrap_or("?")),
        }
    }
}
