//! Queue messages derived from change events

use crate::{ChangeEvent, FieldPath, MappingError, MessageAttribute, MessageAttributeError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Longest deduplication or group identifier a FIFO queue accepts.
pub const MAX_MESSAGE_ATTRIBUTE_LEN: usize = 128;

/// Alphanumerics and punctuation, i.e. printable ASCII without space.
static MESSAGE_ATTRIBUTE_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[!-~]+$").expect("Invalid message attribute regex"));

/// One delivery to the target queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueMessage {
    pub message_deduplication_id: String,
    pub message_group_id: String,
    /// The event document, forwarded unchanged
    pub body: Value,
}

/// Paths that bind a message's FIFO attributes to fields of the event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageMapping {
    pub deduplication_id: FieldPath,
    pub group_id: FieldPath,
}

impl MessageMapping {
    /// Event id for deduplication, `id` key for ordering.
    pub fn by_event_and_key(key_attribute: &str) -> Self {
        Self {
            deduplication_id: FieldPath::fields(&["eventID"]),
            group_id: FieldPath::fields(&["dynamodb", "Keys", key_attribute, "S"]),
        }
    }

    pub fn apply(&self, event: &ChangeEvent) -> Result<QueueMessage, MappingError> {
        let body = event.to_json().map_err(|e| MappingError::Encode {
            reason: e.to_string(),
        })?;
        self.apply_value(body)
    }

    /// Derive a message from a raw event document.
    pub fn apply_value(&self, body: Value) -> Result<QueueMessage, MappingError> {
        let message_deduplication_id = resolve(
            &self.deduplication_id,
            &body,
            MessageAttribute::DeduplicationId,
        )?;
        let message_group_id = resolve(&self.group_id, &body, MessageAttribute::GroupId)?;
        Ok(QueueMessage {
            message_deduplication_id,
            message_group_id,
            body,
        })
    }
}

fn resolve(path: &FieldPath, body: &Value, attribute: MessageAttribute) -> Result<String, MappingError> {
    let value = path
        .resolve_str(body)
        .map_err(|source| MappingError::Path { attribute, source })?;
    validate_message_attribute(attribute, value)?;
    Ok(value.to_string())
}

/// Check a value against the queue's rules for FIFO message attributes.
pub fn validate_message_attribute(
    attribute: MessageAttribute,
    value: &str,
) -> Result<(), MessageAttributeError> {
    if value.is_empty() {
        return Err(MessageAttributeError::Empty { attribute });
    }
    let length = value.chars().count();
    if length > MAX_MESSAGE_ATTRIBUTE_LEN {
        return Err(MessageAttributeError::TooLong {
            attribute,
            length,
            max: MAX_MESSAGE_ATTRIBUTE_LEN,
        });
    }
    if !MESSAGE_ATTRIBUTE_CHARS.is_match(value) {
        return Err(MessageAttributeError::InvalidCharacters {
            attribute,
            value: value.to_string(),
        });
    }
    Ok(())
}
