//! Class identifiers

use std::fmt;
use std::sync::Arc;

/// Stable identifier for a class, interface, array class or primitive class
///
/// The identifier is the binary class name (`"java/lang/Object"`, `"outer$Inner"`,
/// `"[I"`, `"int"`). Cloning only bumps a reference count, so ids are passed by value
/// freely throughout the runtime.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(Arc<str>);

impl ClassId {
    /// Create a class id from a binary name
    pub fn new(name: impl AsRef<str>) -> Self {
        ClassId(Arc::from(name.as_ref()))
    }

    /// The binary name
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check if the name denotes an array class (`[` prefix)
    pub fn is_array_name(&self) -> bool {
        self.0.starts_with('[')
    }

    /// Human readable name: `/` separators become `.`
    pub fn java_name(&self) -> String {
        self.0.replace('/', ".")
    }
}

impl fmt::Debug for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClassId({})", self.0)
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClassId {
    fn from(name: &str) -> Self {
        ClassId::new(name)
    }
}

impl From<String> for ClassId {
    fn from(name: String) -> Self {
        ClassId(Arc::from(name))
    }
}

impl From<&ClassId> for ClassId {
    fn from(id: &ClassId) -> Self {
        id.clone()
    }
}

impl AsRef<str> for ClassId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// What sort of type a class record describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassKind {
    /// Ordinary class (instantiable, may have a superclass)
    Class,
    /// Interface (static fields only, no superclass)
    Interface,
    /// Array class (`[I`, `[Lpkg/A;`)
    Array,
    /// Primitive class (`int`, `boolean`, ...)
    Primitive,
}

impl ClassKind {
    /// Whether records of this kind may declare a superclass
    pub fn allows_superclass(self) -> bool {
        matches!(self, ClassKind::Class)
    }
}

impl fmt::Display for ClassKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassKind::Class => write!(f, "class"),
            ClassKind::Interface => write!(f, "interface"),
            ClassKind::Array => write!(f, "array"),
            ClassKind::Primitive => write!(f, "primitive"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_id_equality() {
        let a = ClassId::new("pkg/A");
        let b: ClassId = "pkg/A".into();
        assert_eq!(a, b);
        assert_ne!(a, ClassId::new("pkg/B"));
    }

    #[test]
    fn test_class_id_names() {
        let id = ClassId::new("java/lang/String");
        assert_eq!(id.as_str(), "java/lang/String");
        assert_eq!(id.java_name(), "java.lang.String");
        assert_eq!(id.to_string(), "java/lang/String");
        assert!(!id.is_array_name());
        assert!(ClassId::new("[I").is_array_name());
    }

    #[test]
    fn test_kind_superclass_rule() {
        assert!(ClassKind::Class.allows_superclass());
        assert!(!ClassKind::Interface.allows_superclass());
        assert!(!ClassKind::Array.allows_superclass());
        assert!(!ClassKind::Primitive.allows_superclass());
    }
}
