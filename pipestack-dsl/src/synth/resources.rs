//! CloudFormation property shapes for each resource kind

use crate::compiler::{LogGroupSpec, PipeSpec, PolicySpec, QueueSpec, RoleSpec, TableSpec};
use crate::config::KeyConfig;
use pipestack_core::{Intrinsic, PolicyDocument};
use serde::Serialize;

pub const ROLE_TYPE: &str = "AWS::IAM::Role";
pub const POLICY_TYPE: &str = "AWS::IAM::Policy";
pub const TABLE_TYPE: &str = "AWS::DynamoDB::Table";
pub const QUEUE_TYPE: &str = "AWS::SQS::Queue";
pub const LOG_GROUP_TYPE: &str = "AWS::Logs::LogGroup";
pub const PIPE_TYPE: &str = "AWS::Pipes::Pipe";

fn is_false(value: &bool) -> bool {
    !*value
}

// ============================================================================
// IAM
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RoleProperties {
    pub assume_role_policy_document: PolicyDocument,
}

impl From<&RoleSpec> for RoleProperties {
    fn from(role: &RoleSpec) -> Self {
        Self {
            assume_role_policy_document: PolicyDocument::assume_role(&role.service_principal),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyProperties {
    pub policy_document: PolicyDocument,
    pub policy_name: String,
    pub roles: Vec<Intrinsic>,
}

impl From<&PolicySpec> for PolicyProperties {
    fn from(policy: &PolicySpec) -> Self {
        Self {
            policy_document: policy.document(),
            policy_name: policy.logical_id.clone(),
            roles: vec![Intrinsic::Ref(policy.role_id.clone())],
        }
    }
}

// ============================================================================
// TABLE
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct KeySchemaElement {
    pub attribute_name: String,
    pub key_type: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AttributeDefinition {
    pub attribute_name: String,
    pub attribute_type: &'static str,
}

impl From<&KeyConfig> for AttributeDefinition {
    fn from(key: &KeyConfig) -> Self {
        Self {
            attribute_name: key.name.clone(),
            attribute_type: key.attribute_type.descriptor(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ThroughputProperties {
    pub read_capacity_units: u32,
    pub write_capacity_units: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct StreamSpecification {
    pub stream_view_type: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TableProperties {
    pub key_schema: Vec<KeySchemaElement>,
    pub attribute_definitions: Vec<AttributeDefinition>,
    pub billing_mode: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisioned_throughput: Option<ThroughputProperties>,
    pub stream_specification: StreamSpecification,
    #[serde(skip_serializing_if = "is_false")]
    pub deletion_protection_enabled: bool,
}

impl From<&TableSpec> for TableProperties {
    fn from(table: &TableSpec) -> Self {
        let mut key_schema = vec![KeySchemaElement {
            attribute_name: table.partition_key.name.clone(),
            key_type: "HASH",
        }];
        if let Some(sort_key) = &table.sort_key {
            key_schema.push(KeySchemaElement {
                attribute_name: sort_key.name.clone(),
                key_type: "RANGE",
            });
        }
        Self {
            key_schema,
            attribute_definitions: table.key_attributes().map(AttributeDefinition::from).collect(),
            billing_mode: table.billing_mode.as_cfn_str(),
            provisioned_throughput: table.provisioned.map(|p| ThroughputProperties {
                read_capacity_units: p.read_capacity,
                write_capacity_units: p.write_capacity,
            }),
            stream_specification: StreamSpecification {
                stream_view_type: table.stream_view_type.as_cfn_str(),
            },
            deletion_protection_enabled: table.deletion_protection,
        }
    }
}

// ============================================================================
// QUEUES AND LOGS
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct QueueProperties {
    #[serde(skip_serializing_if = "is_false")]
    pub fifo_queue: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_name: Option<String>,
    #[serde(skip_serializing_if = "is_false")]
    pub content_based_deduplication: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_retention_period: Option<u32>,
}

impl From<&QueueSpec> for QueueProperties {
    fn from(queue: &QueueSpec) -> Self {
        Self {
            fifo_queue: queue.fifo,
            queue_name: queue.queue_name.clone(),
            content_based_deduplication: queue.content_based_deduplication,
            message_retention_period: queue.message_retention_seconds,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LogGroupProperties {
    pub log_group_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retention_in_days: Option<u32>,
}

impl From<&LogGroupSpec> for LogGroupProperties {
    fn from(log_group: &LogGroupSpec) -> Self {
        Self {
            log_group_name: log_group.name.clone(),
            retention_in_days: log_group.retention_days,
        }
    }
}

// ============================================================================
// PIPE
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeadLetterProperties {
    pub arn: Intrinsic,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DynamoDbStreamParameters {
    pub starting_position: &'static str,
    pub maximum_retry_attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum_batching_window_in_seconds: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dead_letter_config: Option<DeadLetterProperties>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceParameters {
    #[serde(rename = "DynamoDBStreamParameters")]
    pub dynamodb_stream_parameters: DynamoDbStreamParameters,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SqsQueueParameters {
    pub message_deduplication_id: String,
    pub message_group_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TargetParameters {
    pub sqs_queue_parameters: SqsQueueParameters,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LogDestination {
    pub log_group_arn: Intrinsic,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LogConfiguration {
    pub level: &'static str,
    pub cloudwatch_logs_log_destination: LogDestination,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub include_execution_data: Vec<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PipeProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub desired_state: &'static str,
    pub role_arn: Intrinsic,
    pub source: Intrinsic,
    pub source_parameters: SourceParameters,
    pub target: Intrinsic,
    pub target_parameters: TargetParameters,
    pub log_configuration: LogConfiguration,
}

impl From<&PipeSpec> for PipeProperties {
    fn from(pipe: &PipeSpec) -> Self {
        let source = &pipe.source;
        Self {
            name: pipe.name.clone(),
            desired_state: pipe.desired_state.as_desired_state(),
            role_arn: pipe.role_arn.clone(),
            source: source.stream_arn.clone(),
            source_parameters: SourceParameters {
                dynamodb_stream_parameters: DynamoDbStreamParameters {
                    starting_position: source.starting_position.as_cfn_str(),
                    maximum_retry_attempts: source.maximum_retry_attempts,
                    batch_size: source.batch_size,
                    maximum_batching_window_in_seconds: source.maximum_batching_window_seconds,
                    dead_letter_config: source
                        .dead_letter_arn
                        .clone()
                        .map(|arn| DeadLetterProperties { arn }),
                },
            },
            target: pipe.target_arn.clone(),
            target_parameters: TargetParameters {
                sqs_queue_parameters: SqsQueueParameters {
                    message_deduplication_id: pipe.mapping.deduplication_id.to_string(),
                    message_group_id: pipe.mapping.group_id.to_string(),
                },
            },
            log_configuration: LogConfiguration {
                level: pipe.log.level.as_cfn_str(),
                cloudwatch_logs_log_destination: LogDestination {
                    log_group_arn: pipe.log.log_group_arn.clone(),
                },
                include_execution_data: pipe
                    .log
                    .include_execution_data
                    .iter()
                    .map(|d| d.as_cfn_str())
                    .collect(),
            },
        }
    }
}
