//! Error types for pipestack core operations

use crate::{KeyAttributeType, StreamViewType};
use thiserror::Error;

/// Field-path parse, schema and evaluation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("Path syntax error at column {column}: {message}")]
    Syntax { column: usize, message: String },

    #[error("Unknown field '{field}' in path {path}")]
    UnknownField { path: String, field: String },

    #[error("Path {path} indexes into a value that is not a list")]
    NotIndexable { path: String },

    #[error("Path {path} descends into a scalar value")]
    ScalarDescent { path: String },

    #[error("Path {path} does not resolve to a string value")]
    NotString { path: String },

    #[error("Attribute '{name}' is not a key attribute of the source table")]
    UnknownKeyAttribute { name: String },

    #[error("Key attribute '{name}' has type {expected:?}, path reads descriptor {found}")]
    KeyTypeMismatch {
        name: String,
        expected: KeyAttributeType,
        found: String,
    },

    #[error("Path {path} reads {image}, which a {view} stream does not capture")]
    ImageNotCaptured {
        path: String,
        image: String,
        view: StreamViewType,
    },

    #[error("Path {path} has no value in the event")]
    Missing { path: String },
}

/// Which SQS message attribute a value is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageAttribute {
    DeduplicationId,
    GroupId,
}

impl std::fmt::Display for MessageAttribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageAttribute::DeduplicationId => write!(f, "MessageDeduplicationId"),
            MessageAttribute::GroupId => write!(f, "MessageGroupId"),
        }
    }
}

/// A derived value the target queue would reject.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MessageAttributeError {
    #[error("{attribute} is empty")]
    Empty { attribute: MessageAttribute },

    #[error("{attribute} is {length} characters, maximum is {max}")]
    TooLong {
        attribute: MessageAttribute,
        length: usize,
        max: usize,
    },

    #[error("{attribute} contains characters outside printable ASCII: {value:?}")]
    InvalidCharacters {
        attribute: MessageAttribute,
        value: String,
    },
}

/// Failure to derive a queue message from a change event.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MappingError {
    #[error("Mapping {attribute} failed: {source}")]
    Path {
        attribute: MessageAttribute,
        #[source]
        source: PathError,
    },

    #[error("Delivery would be rejected: {0}")]
    Attribute(#[from] MessageAttributeError),

    #[error("Event encoding failed: {reason}")]
    Encode { reason: String },
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_syntax_error_display() {
        let err = PathError::Syntax {
            column: 3,
            message: "expected field name".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("column 3"));
        assert!(msg.contains("expected field name"));
    }

    #[test]
    fn test_image_not_captured_display() {
        let err = PathError::ImageNotCaptured {
            path: "$.dynamodb.NewImage.foo.S".to_string(),
            image: "NewImage".to_string(),
            view: StreamViewType::KeysOnly,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("KEYS_ONLY"));
        assert!(msg.contains("NewImage"));
    }

    #[test]
    fn test_message_attribute_error_display() {
        let err = MessageAttributeError::TooLong {
            attribute: MessageAttribute::GroupId,
            length: 200,
            max: 128,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("MessageGroupId"));
        assert!(msg.contains("200"));
        assert!(msg.contains("128"));
    }

    #[test]
    fn test_mapping_error_from_attribute() {
        let err = MappingError::from(MessageAttributeError::Empty {
            attribute: MessageAttribute::DeduplicationId,
        });
        assert!(matches!(err, MappingError::Attribute(_)));
        assert!(err.to_string().contains("MessageDeduplicationId"));
    }
}
