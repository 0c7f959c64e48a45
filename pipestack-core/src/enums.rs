//! Enum types for pipestack resources

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// SOURCE ENUMS
// ============================================================================

/// Where a new stream consumer begins reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StartingPosition {
    /// Only records written after the consumer attaches
    #[default]
    Latest,
    /// Oldest record still retained by the stream (full replay)
    TrimHorizon,
}

impl StartingPosition {
    pub fn as_cfn_str(&self) -> &'static str {
        match self {
            StartingPosition::Latest => "LATEST",
            StartingPosition::TrimHorizon => "TRIM_HORIZON",
        }
    }

    pub fn from_cfn_str(s: &str) -> Result<Self, EnumParseError> {
        match s {
            "LATEST" => Ok(StartingPosition::Latest),
            "TRIM_HORIZON" => Ok(StartingPosition::TrimHorizon),
            other => Err(EnumParseError::new("starting position", other)),
        }
    }
}

/// What a change stream captures for each mutated item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StreamViewType {
    KeysOnly,
    NewImage,
    OldImage,
    #[default]
    NewAndOldImages,
}

impl StreamViewType {
    pub fn as_cfn_str(&self) -> &'static str {
        match self {
            StreamViewType::KeysOnly => "KEYS_ONLY",
            StreamViewType::NewImage => "NEW_IMAGE",
            StreamViewType::OldImage => "OLD_IMAGE",
            StreamViewType::NewAndOldImages => "NEW_AND_OLD_IMAGES",
        }
    }

    pub fn from_cfn_str(s: &str) -> Result<Self, EnumParseError> {
        match s {
            "KEYS_ONLY" => Ok(StreamViewType::KeysOnly),
            "NEW_IMAGE" => Ok(StreamViewType::NewImage),
            "OLD_IMAGE" => Ok(StreamViewType::OldImage),
            "NEW_AND_OLD_IMAGES" => Ok(StreamViewType::NewAndOldImages),
            other => Err(EnumParseError::new("stream view type", other)),
        }
    }

    /// Whether events carry the post-mutation image.
    pub fn includes_new_image(&self) -> bool {
        matches!(
            self,
            StreamViewType::NewImage | StreamViewType::NewAndOldImages
        )
    }

    /// Whether events carry the pre-mutation image.
    pub fn includes_old_image(&self) -> bool {
        matches!(
            self,
            StreamViewType::OldImage | StreamViewType::NewAndOldImages
        )
    }
}

// ============================================================================
// TABLE ENUMS
// ============================================================================

/// Capacity mode of the source table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillingMode {
    #[default]
    PayPerRequest,
    Provisioned,
}

impl BillingMode {
    pub fn as_cfn_str(&self) -> &'static str {
        match self {
            BillingMode::PayPerRequest => "PAY_PER_REQUEST",
            BillingMode::Provisioned => "PROVISIONED",
        }
    }
}

/// Scalar type of a key attribute, written as its attribute-value descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum KeyAttributeType {
    #[default]
    #[serde(rename = "S", alias = "STRING")]
    String,
    #[serde(rename = "N", alias = "NUMBER")]
    Number,
    #[serde(rename = "B", alias = "BINARY")]
    Binary,
}

impl KeyAttributeType {
    /// Descriptor used both in `AttributeDefinitions` and inside stream images.
    pub fn descriptor(&self) -> &'static str {
        match self {
            KeyAttributeType::String => "S",
            KeyAttributeType::Number => "N",
            KeyAttributeType::Binary => "B",
        }
    }

    pub fn from_descriptor(s: &str) -> Option<Self> {
        match s {
            "S" => Some(KeyAttributeType::String),
            "N" => Some(KeyAttributeType::Number),
            "B" => Some(KeyAttributeType::Binary),
            _ => None,
        }
    }
}

/// What happens to a resource when the stack is torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RemovalPolicy {
    #[default]
    Destroy,
    Retain,
    /// Only meaningful for resources that support snapshots (tables)
    Snapshot,
}

impl RemovalPolicy {
    /// Value for the template's `DeletionPolicy` / `UpdateReplacePolicy`.
    pub fn as_deletion_policy(&self) -> &'static str {
        match self {
            RemovalPolicy::Destroy => "Delete",
            RemovalPolicy::Retain => "Retain",
            RemovalPolicy::Snapshot => "Snapshot",
        }
    }
}

// ============================================================================
// PIPE ENUMS
// ============================================================================

/// Verbosity of pipe execution logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogLevel {
    Off,
    Error,
    Info,
    #[default]
    Trace,
}

impl LogLevel {
    pub fn as_cfn_str(&self) -> &'static str {
        match self {
            LogLevel::Off => "OFF",
            LogLevel::Error => "ERROR",
            LogLevel::Info => "INFO",
            LogLevel::Trace => "TRACE",
        }
    }

    pub fn from_cfn_str(s: &str) -> Result<Self, EnumParseError> {
        match s {
            "OFF" => Ok(LogLevel::Off),
            "ERROR" => Ok(LogLevel::Error),
            "INFO" => Ok(LogLevel::Info),
            "TRACE" => Ok(LogLevel::Trace),
            other => Err(EnumParseError::new("log level", other)),
        }
    }

    /// The most verbose level the pipe service supports.
    pub fn is_maximum(&self) -> bool {
        *self == LogLevel::Trace
    }
}

/// Execution data captured alongside pipe log records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionData {
    /// Full input and output payloads
    All,
}

impl ExecutionData {
    pub fn as_cfn_str(&self) -> &'static str {
        match self {
            ExecutionData::All => "ALL",
        }
    }
}

/// Declared run state of a routing pipe.
///
/// Only an administrative action outside the stack moves a deployed pipe
/// between states; the declaration just records which one is desired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PipeState {
    #[default]
    #[serde(rename = "RUNNING", alias = "ACTIVE")]
    Active,
    #[serde(rename = "STOPPED")]
    Stopped,
}

impl PipeState {
    /// Value of the pipe's `DesiredState` property.
    pub fn as_desired_state(&self) -> &'static str {
        match self {
            PipeState::Active => "RUNNING",
            PipeState::Stopped => "STOPPED",
        }
    }
}

impl fmt::Display for PipeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipeState::Active => write!(f, "ACTIVE"),
            PipeState::Stopped => write!(f, "STOPPED"),
        }
    }
}

// ============================================================================
// EVENT ENUMS
// ============================================================================

/// Kind of mutation a change event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventName {
    Insert,
    Modify,
    Remove,
}

impl EventName {
    pub fn as_wire_str(&self) -> &'static str {
        match self {
            EventName::Insert => "INSERT",
            EventName::Modify => "MODIFY",
            EventName::Remove => "REMOVE",
        }
    }
}

// ============================================================================
// DISPLAY / FROMSTR
// ============================================================================

impl fmt::Display for StartingPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_cfn_str())
    }
}

impl FromStr for StartingPosition {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_cfn_str(s)
    }
}

impl fmt::Display for StreamViewType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_cfn_str())
    }
}

impl FromStr for StreamViewType {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_cfn_str(s)
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_cfn_str())
    }
}

impl FromStr for LogLevel {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_cfn_str(s)
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_wire_str())
    }
}

/// Error when parsing an unknown enum string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumParseError {
    pub kind: &'static str,
    pub value: String,
}

impl EnumParseError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

impl fmt::Display for EnumParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid {}: {}", self.kind, self.value)
    }
}

impl std::error::Error for EnumParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starting_position_default_is_latest() {
        assert_eq!(StartingPosition::default(), StartingPosition::Latest);
        assert_eq!(StartingPosition::default().as_cfn_str(), "LATEST");
    }

    #[test]
    fn test_starting_position_parse() {
        assert_eq!(
            "TRIM_HORIZON".parse::<StartingPosition>().unwrap(),
            StartingPosition::TrimHorizon
        );
        let err = "EARLIEST".parse::<StartingPosition>().unwrap_err();
        assert!(err.to_string().contains("EARLIEST"));
    }

    #[test]
    fn test_stream_view_images() {
        assert!(StreamViewType::NewAndOldImages.includes_new_image());
        assert!(StreamViewType::NewAndOldImages.includes_old_image());
        assert!(!StreamViewType::KeysOnly.includes_new_image());
        assert!(!StreamViewType::NewImage.includes_old_image());
        assert!(StreamViewType::OldImage.includes_old_image());
    }

    #[test]
    fn test_serde_uses_cfn_spelling() {
        let json = serde_json::to_string(&StreamViewType::NewAndOldImages).unwrap();
        assert_eq!(json, "\"NEW_AND_OLD_IMAGES\"");
        let json = serde_json::to_string(&BillingMode::PayPerRequest).unwrap();
        assert_eq!(json, "\"PAY_PER_REQUEST\"");
        let json = serde_json::to_string(&PipeState::Active).unwrap();
        assert_eq!(json, "\"RUNNING\"");
        let state: PipeState = serde_json::from_str("\"ACTIVE\"").unwrap();
        assert_eq!(state, PipeState::Active);
    }

    #[test]
    fn test_key_attribute_descriptor() {
        assert_eq!(KeyAttributeType::String.descriptor(), "S");
        assert_eq!(
            KeyAttributeType::from_descriptor("N"),
            Some(KeyAttributeType::Number)
        );
        assert_eq!(KeyAttributeType::from_descriptor("BOOL"), None);
        let parsed: KeyAttributeType = serde_json::from_str("\"STRING\"").unwrap();
        assert_eq!(parsed, KeyAttributeType::String);
    }

    #[test]
    fn test_log_level_maximum() {
        assert!(LogLevel::Trace.is_maximum());
        assert!(!LogLevel::Info.is_maximum());
        assert!(LogLevel::Trace > LogLevel::Error);
    }

    #[test]
    fn test_removal_policy_deletion_policy() {
        assert_eq!(RemovalPolicy::Destroy.as_deletion_policy(), "Delete");
        assert_eq!(RemovalPolicy::default(), RemovalPolicy::Destroy);
    }
}
