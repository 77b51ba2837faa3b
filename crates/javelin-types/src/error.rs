//! Descriptor errors

use thiserror::Error;

/// Errors produced while parsing a field type descriptor
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DescriptorError {
    /// Descriptor string was empty
    #[error("Empty type descriptor")]
    Empty,

    /// Unknown base type character
    #[error("Unknown type descriptor character '{found}' in '{descriptor}'")]
    UnknownBaseType {
        /// Offending character
        found: char,
        /// Full descriptor
        descriptor: String,
    },

    /// Object type without terminating ';' or with an empty class name
    #[error("Malformed object type descriptor '{0}'")]
    MalformedObjectType(String),

    /// Characters left over after a complete descriptor
    #[error("Trailing characters in type descriptor '{0}'")]
    TrailingCharacters(String),

    /// Array nesting deeper than the JVM limit of 255 dimensions
    #[error("Array descriptor '{0}' exceeds 255 dimensions")]
    TooManyDimensions(String),
}
