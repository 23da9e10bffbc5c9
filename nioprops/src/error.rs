//! Error types and result definitions for property trees.

use thiserror::Error;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, PropertyError>;

/// Failures raised by property containers and the template loader.
///
/// Every failure is local to the operation that raised it: a rejected write
/// leaves the previous value in place.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PropertyError {
    /// Read of a key that is not present.
    #[error("no such key: `{key}`")]
    NotFound { key: String },

    /// Write that would add or remove a key of a locked container.
    #[error("`{key}` is not part of the container schema")]
    SchemaViolation { key: String },

    /// Value that cannot be converted to the pinned type of its slot.
    #[error("{value} is not type {expected}")]
    TypeMismatch { value: String, expected: String },

    /// Index assignment on a sequence created with `noset`.
    #[error("item {index} cannot be set: sequence does not allow setting items")]
    ImmutableElement { index: usize },

    /// Sequence index past the end.
    #[error("index {index} out of range for sequence of length {len}")]
    OutOfRange { index: usize, len: usize },

    /// Value that matches no enumeration member by identity, name or value.
    #[error("value does not exist in enum: {value}")]
    InvalidEnumValue { value: String },

    /// Attempt to replace a typed container or typed sequence as a whole.
    #[error("`{key}` is a protected member")]
    ProtectedMember { key: String },

    /// Template type tag with no registered builder.
    #[error("unknown property type: {tag}")]
    UnknownType { tag: String },

    /// Builder could not produce a value from the given template node.
    #[error("cannot build `{tag}` property: {message}")]
    Builder { tag: String, message: String },

    /// Template document with an unexpected overall structure.
    #[error("malformed template: {message}")]
    Template { message: String },
}

impl PropertyError {
    pub(crate) fn not_found(key: impl Into<String>) -> Self {
        PropertyError::NotFound { key: key.into() }
    }

    pub(crate) fn builder(tag: impl Into<String>, message: impl Into<String>) -> Self {
        PropertyError::Builder {
            tag: tag.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_mismatch_display() {
        let e = PropertyError::TypeMismatch {
            value: "\"abc\"".to_string(),
            expected: "int".to_string(),
        };
        assert_eq!(e.to_string(), "\"abc\" is not type int");
    }

    #[test]
    fn builder_display() {
        let e = PropertyError::builder("object", "missing `template`");
        let display = e.to_string();
        assert!(display.contains("object"));
        assert!(display.contains("missing `template`"));
    }

    #[test]
    fn not_found_display() {
        assert!(PropertyError::not_found("timeout").to_string().contains("timeout"));
    }
}
