//! Stack configuration schema and loaders
//! Uses serde for ALL parsing (TOML or YAML, no custom syntax)

use pipestack_core::{
    BillingMode, ExecutionData, FieldPath, KeyAttributeType, LogLevel, PipeState, RemovalPolicy,
    StartingPosition, StreamViewType, DEFAULT_LOG_GROUP_NAME, DEFAULT_MAXIMUM_RETRY_ATTEMPTS,
    DEFAULT_PARTITION_KEY,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

// ============================================================================
// ERROR TYPES
// ============================================================================

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("TOML parse error: {0}")]
    TomlParse(String),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(String),

    #[error("YAML parse error: {0}")]
    YamlParse(String),

    #[error("Cannot read {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("Unsupported stack file extension: {0}")]
    UnsupportedFormat(String),
}

// ============================================================================
// CONFIG STRUCTS (The Schema)
// ============================================================================

/// Full declaration of the stack. Every section defaults to the reference
/// stack, so an empty file describes the reference deployment.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct StackConfig {
    #[serde(default)]
    pub stack: StackSection,
    #[serde(default)]
    pub table: TableConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub log_group: LogGroupConfig,
    #[serde(default)]
    pub pipe: PipeConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct StackSection {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Default for StackSection {
    fn default() -> Self {
        Self {
            name: "PipesExamplesStack".to_string(),
            description: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct KeyConfig {
    pub name: String,
    /// Attribute type (accepts both "attribute_type" and "type")
    #[serde(alias = "type", default)]
    pub attribute_type: KeyAttributeType,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct TableConfig {
    pub partition_key: KeyConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_key: Option<KeyConfig>,
    #[serde(default)]
    pub billing_mode: BillingMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_capacity: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_capacity: Option<u32>,
    #[serde(default)]
    pub stream_view_type: StreamViewType,
    #[serde(default)]
    pub removal_policy: RemovalPolicy,
    #[serde(default)]
    pub deletion_protection: bool,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            partition_key: KeyConfig {
                name: DEFAULT_PARTITION_KEY.to_string(),
                attribute_type: KeyAttributeType::String,
            },
            sort_key: None,
            billing_mode: BillingMode::PayPerRequest,
            read_capacity: None,
            write_capacity: None,
            stream_view_type: StreamViewType::NewAndOldImages,
            removal_policy: RemovalPolicy::Destroy,
            deletion_protection: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct QueueConfig {
    pub fifo: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue_name: Option<String>,
    #[serde(default)]
    pub content_based_deduplication: bool,
    #[serde(default)]
    pub removal_policy: RemovalPolicy,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            fifo: true,
            queue_name: None,
            content_based_deduplication: false,
            removal_policy: RemovalPolicy::Destroy,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct LogGroupConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retention_days: Option<u32>,
    #[serde(default)]
    pub removal_policy: RemovalPolicy,
}

impl Default for LogGroupConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_LOG_GROUP_NAME.to_string(),
            retention_days: None,
            removal_policy: RemovalPolicy::Destroy,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Default)]
#[serde(default, deny_unknown_fields)]
pub struct PipeConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub desired_state: PipeState,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub target: TargetConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SourceConfig {
    #[serde(default)]
    pub starting_position: StartingPosition,
    pub maximum_retry_attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum_batching_window_seconds: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dead_letter: Option<DeadLetterConfig>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            starting_position: StartingPosition::Latest,
            maximum_retry_attempts: DEFAULT_MAXIMUM_RETRY_ATTEMPTS,
            batch_size: None,
            maximum_batching_window_seconds: None,
            dead_letter: None,
        }
    }
}

/// Standard queue receiving events whose retries are exhausted.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Default)]
#[serde(default, deny_unknown_fields)]
pub struct DeadLetterConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue_name: Option<String>,
    #[serde(default)]
    pub removal_policy: RemovalPolicy,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct TargetConfig {
    pub message_deduplication_id: FieldPath,
    pub message_group_id: FieldPath,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            message_deduplication_id: FieldPath::fields(&["eventID"]),
            message_group_id: FieldPath::fields(&["dynamodb", "Keys", DEFAULT_PARTITION_KEY, "S"]),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    #[serde(default)]
    pub level: LogLevel,
    #[serde(default)]
    pub include_execution_data: Vec<ExecutionData>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Trace,
            include_execution_data: vec![ExecutionData::All],
        }
    }
}

// ============================================================================
// LOADERS
// ============================================================================

impl StackConfig {
    /// The reference deployment.
    pub fn reference() -> Self {
        Self::default()
    }

    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        toml::from_str(source).map_err(|e| ConfigError::TomlParse(e.to_string()))
    }

    pub fn from_yaml_str(source: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(source).map_err(|e| ConfigError::YamlParse(e.to_string()))
    }

    /// Load a stack file, choosing the parser by extension.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_str(&source),
            Some("yaml" | "yml") => Self::from_yaml_str(&source),
            other => Err(ConfigError::UnsupportedFormat(
                other.unwrap_or_default().to_string(),
            )),
        }
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string(self).map_err(|e| ConfigError::TomlSerialize(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_is_reference() {
        let config = StackConfig::from_toml_str("").unwrap();
        assert_eq!(config, StackConfig::reference());
        assert_eq!(config.pipe.source.maximum_retry_attempts, 3);
        assert_eq!(config.pipe.source.starting_position, StartingPosition::Latest);
        assert_eq!(config.log_group.name, "PipeDdbToSqsFifo");
    }

    #[test]
    fn test_toml_overrides() {
        let config = StackConfig::from_toml_str(
            r#"
[table]
partition_key = { name = "pk", type = "S" }
stream_view_type = "NEW_IMAGE"

[pipe]
desired_state = "STOPPED"

[pipe.source]
starting_position = "TRIM_HORIZON"
maximum_retry_attempts = 5
batch_size = 10

[pipe.target]
message_deduplication_id = "$.eventID"
message_group_id = "$.dynamodb.Keys.pk.S"
"#,
        )
        .unwrap();
        assert_eq!(config.table.partition_key.name, "pk");
        assert_eq!(config.table.stream_view_type, StreamViewType::NewImage);
        assert_eq!(config.pipe.desired_state, PipeState::Stopped);
        assert_eq!(
            config.pipe.source.starting_position,
            StartingPosition::TrimHorizon
        );
        assert_eq!(config.pipe.source.batch_size, Some(10));
        assert_eq!(
            config.pipe.target.message_group_id.to_string(),
            "$.dynamodb.Keys.pk.S"
        );
        // Untouched sections keep the reference values.
        assert_eq!(config.queue, QueueConfig::default());
        assert_eq!(config.pipe.log, LogConfig::default());
    }

    #[test]
    fn test_yaml_loader() {
        let config = StackConfig::from_yaml_str(
            r#"
pipe:
  log:
    level: ERROR
    include_execution_data: []
"#,
        )
        .unwrap();
        assert_eq!(config.pipe.log.level, LogLevel::Error);
        assert!(config.pipe.log.include_execution_data.is_empty());
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let err = StackConfig::from_toml_str("[queue]\nfifo = true\nvisibility = 30\n").unwrap_err();
        assert!(matches!(err, ConfigError::TomlParse(_)));
    }

    #[test]
    fn test_malformed_path_rejected_at_load() {
        let err = StackConfig::from_toml_str(
            "[pipe.target]\nmessage_deduplication_id = \"eventID\"\nmessage_group_id = \"$.x\"\n",
        )
        .unwrap_err();
        match err {
            ConfigError::TomlParse(msg) => assert!(msg.contains("expected '$'")),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_toml_printer_reloads() {
        let config = StackConfig::reference();
        let printed = config.to_toml_string().unwrap();
        assert_eq!(StackConfig::from_toml_str(&printed).unwrap(), config);
    }

    #[test]
    fn test_print_and_parse_failures_are_distinct() {
        let printing = ConfigError::TomlSerialize("unsupported value".to_string());
        assert_eq!(printing.to_string(), "TOML serialize error: unsupported value");
        assert_ne!(printing, ConfigError::TomlParse("unsupported value".to_string()));
    }
}
