//! Change-stream event wire format
//!
//! One `ChangeEvent` is emitted per item mutation in the source table. The
//! routing pipe hands each event to the target as a JSON document of exactly
//! this shape, so field paths are written against it.

use crate::{EventName, StreamViewType};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A typed attribute value, serialized with its single-key type descriptor
/// (`{"S": "1"}`, `{"N": "42"}`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    S(String),
    /// Numbers travel as strings to keep arbitrary precision
    N(String),
    /// Base64-encoded bytes
    B(String),
    #[serde(rename = "BOOL")]
    Bool(bool),
    #[serde(rename = "NULL")]
    Null(bool),
    M(AttributeMap),
    L(Vec<AttributeValue>),
    SS(Vec<String>),
    NS(Vec<String>),
    BS(Vec<String>),
}

impl AttributeValue {
    /// The type descriptor this value serializes under.
    pub fn descriptor(&self) -> &'static str {
        match self {
            AttributeValue::S(_) => "S",
            AttributeValue::N(_) => "N",
            AttributeValue::B(_) => "B",
            AttributeValue::Bool(_) => "BOOL",
            AttributeValue::Null(_) => "NULL",
            AttributeValue::M(_) => "M",
            AttributeValue::L(_) => "L",
            AttributeValue::SS(_) => "SS",
            AttributeValue::NS(_) => "NS",
            AttributeValue::BS(_) => "BS",
        }
    }

    /// String payload of S, N and B values.
    pub fn as_scalar_str(&self) -> Option<&str> {
        match self {
            AttributeValue::S(s) | AttributeValue::N(s) | AttributeValue::B(s) => Some(s),
            _ => None,
        }
    }
}

/// Attribute name to value, as found in `Keys`, `NewImage` and `OldImage`.
pub type AttributeMap = BTreeMap<String, AttributeValue>;

/// The `dynamodb` section of a change event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StreamRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approximate_creation_date_time: Option<i64>,
    pub keys: AttributeMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_image: Option<AttributeMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_image: Option<AttributeMap>,
    pub sequence_number: String,
    pub size_bytes: u64,
    pub stream_view_type: StreamViewType,
    /// Record fields this crate does not model, kept for forwarding
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A single change-stream notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    #[serde(rename = "eventID")]
    pub event_id: String,
    #[serde(rename = "eventName")]
    pub event_name: EventName,
    #[serde(rename = "eventVersion")]
    pub event_version: String,
    #[serde(rename = "eventSource")]
    pub event_source: String,
    #[serde(rename = "awsRegion")]
    pub aws_region: String,
    pub dynamodb: StreamRecord,
    #[serde(rename = "eventSourceARN")]
    pub event_source_arn: String,
    /// `userIdentity` and any other unmodelled wire fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChangeEvent {
    /// Scalar string value of a key attribute, if present.
    pub fn key_str(&self, name: &str) -> Option<&str> {
        self.dynamodb.keys.get(name).and_then(AttributeValue::as_scalar_str)
    }

    /// The event as the JSON document the pipe forwards.
    pub fn to_json(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }

    /// Parse a batch as delivered by the stream (a JSON array of events).
    pub fn batch_from_json(json: &str) -> serde_json::Result<Vec<ChangeEvent>> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"[
      {
        "eventID": "47abf761f1e6b781d82c7a7a93ff769e",
        "eventName": "INSERT",
        "eventVersion": "1.1",
        "eventSource": "aws:dynamodb",
        "awsRegion": "eu-central-1",
        "dynamodb": {
          "ApproximateCreationDateTime": 1710952409,
          "Keys": { "id": { "S": "1" } },
          "NewImage": { "foo": { "S": "bar" }, "id": { "S": "1" } },
          "SequenceNumber": "100000000025043195499",
          "SizeBytes": 12,
          "StreamViewType": "NEW_AND_OLD_IMAGES"
        },
        "eventSourceARN": "arn:aws:dynamodb:eu-central-1:123456789012:table/Table/stream/2024-03-20T16:30:16.493"
      }
    ]"#;

    #[test]
    fn test_parse_sample_batch() {
        let batch = ChangeEvent::batch_from_json(SAMPLE).unwrap();
        assert_eq!(batch.len(), 1);
        let event = &batch[0];
        assert_eq!(event.event_id, "47abf761f1e6b781d82c7a7a93ff769e");
        assert_eq!(event.event_name, EventName::Insert);
        assert_eq!(event.key_str("id"), Some("1"));
        assert!(event.dynamodb.old_image.is_none());
        assert_eq!(
            event.dynamodb.stream_view_type,
            StreamViewType::NewAndOldImages
        );
        let image = event.dynamodb.new_image.as_ref().unwrap();
        assert_eq!(image.get("foo"), Some(&AttributeValue::S("bar".to_string())));
    }

    #[test]
    fn test_to_json_keeps_wire_names() {
        let event = ChangeEvent::batch_from_json(SAMPLE).unwrap().remove(0);
        let json = event.to_json().unwrap();
        assert_eq!(json["eventID"], "47abf761f1e6b781d82c7a7a93ff769e");
        assert_eq!(json["dynamodb"]["Keys"]["id"]["S"], "1");
        assert!(json["dynamodb"].get("OldImage").is_none());
        assert!(json.get("eventSourceARN").is_some());
    }

    #[test]
    fn test_unmodelled_fields_survive_to_json() {
        let raw = serde_json::json!({
            "eventID": "E9",
            "eventName": "REMOVE",
            "eventVersion": "1.1",
            "eventSource": "aws:dynamodb",
            "awsRegion": "eu-central-1",
            "userIdentity": { "type": "Service", "principalId": "dynamodb.amazonaws.com" },
            "dynamodb": {
                "ApproximateCreationDateTime": 1710952409,
                "ApproximateCreationDateTimePrecision": "MILLISECOND",
                "Keys": { "id": { "S": "1" } },
                "OldImage": { "id": { "S": "1" } },
                "SequenceNumber": "200",
                "SizeBytes": 8,
                "StreamViewType": "NEW_AND_OLD_IMAGES"
            },
            "eventSourceARN": "arn:aws:dynamodb:eu-central-1:123456789012:table/Table/stream/x"
        });
        let event: ChangeEvent = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(event.extra["userIdentity"]["type"], "Service");
        assert_eq!(
            event.dynamodb.extra["ApproximateCreationDateTimePrecision"],
            "MILLISECOND"
        );
        assert_eq!(event.to_json().unwrap(), raw);
    }

    #[test]
    fn test_attribute_value_descriptors() {
        let nested = AttributeValue::M(AttributeMap::from([(
            "flag".to_string(),
            AttributeValue::Bool(true),
        )]));
        let json = serde_json::to_value(&nested).unwrap();
        assert_eq!(json["M"]["flag"]["BOOL"], true);
        assert_eq!(nested.descriptor(), "M");
        assert_eq!(AttributeValue::N("7".into()).as_scalar_str(), Some("7"));
        assert_eq!(AttributeValue::Null(true).as_scalar_str(), None);
    }
}
