//! Stack Compiler - Transform a StackConfig into a validated resource graph
//!
//! The compiler checks every rule the provisioning engine would only report
//! at deploy or activation time: FIFO targets, log consistency, field paths
//! against the change-event schema, and least-privilege grants.
//!
//! # Pipeline
//!
//! ```text
//! stack.toml → StackConfig → StackCompiler → CompiledStack → synth → Template
//!                                 ↓
//!                          Validation (semantic)
//! ```

mod graph;

pub use graph::ResourceGraph;

use crate::config::*;
use once_cell::sync::Lazy;
use pipestack_core::{
    BillingMode, ChangeEvent, EventSchema, ExecutionData, FieldPath, Grant, GrantKind, Intrinsic,
    LogLevel, MappingError, MessageMapping, PathError, PipeState,
    PolicyDocument, PrivilegeReport, QueueMessage, RemovalPolicy, StartingPosition,
    StreamViewType, PIPES_SERVICE_PRINCIPAL,
};
use regex::Regex;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;

// ============================================================================
// COMPILE ERRORS
// ============================================================================

/// Errors that can occur while compiling a stack.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CompileError {
    /// Reference to an undefined resource
    #[error("undefined reference: {kind} '{name}' is not defined")]
    UndefinedReference { kind: String, name: String },

    /// Duplicate definition
    #[error("duplicate definition: {kind} '{name}' is already defined")]
    DuplicateDefinition { kind: String, name: String },

    /// Invalid configuration value
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    /// Required field left empty
    #[error("missing required field: {field}")]
    MissingField { field: String },

    /// Two settings that cannot be combined
    #[error("incompatible options: {option_a} and {option_b}")]
    IncompatibleOptions { option_a: String, option_b: String },

    /// Circular dependency detected
    #[error("circular dependency detected: {cycle}")]
    CircularDependency { cycle: String },

    /// Field path that does not fit the change-event schema
    #[error("invalid path for {field}: {source}")]
    InvalidPath {
        field: String,
        #[source]
        source: PathError,
    },

    /// Maximum log level and full payload capture must come together
    #[error("inconsistent pipe logging: level {level} with include_all = {include_all}")]
    InconsistentLogging { level: LogLevel, include_all: bool },

    /// Target queue does not preserve order and deduplicate
    #[error("target queue must be FIFO: ordering and deduplication are mandatory")]
    UnorderedTarget,
}

pub type CompileResult<T> = Result<T, CompileError>;

// ============================================================================
// CONSTRUCT IDS
// ============================================================================

pub const ROLE_ID: &str = "Role";
pub const POLICY_ID: &str = "DefaultPolicy";
pub const TABLE_ID: &str = "Table";
pub const QUEUE_ID: &str = "TargetQueue";
pub const DEAD_LETTER_ID: &str = "DeadLetterQueue";
pub const LOG_GROUP_ID: &str = "PipeLogGroup";
pub const PIPE_ID: &str = "Pipe";

/// Longest retention the pipe service accepts for a dead-letter queue.
const DEAD_LETTER_RETENTION_SECONDS: u32 = 1_209_600;

/// Logical id for a construct path: the path's alphanumerics followed by
/// eight hex digits of its SHA-256 digest. Stable across syntheses.
pub fn logical_id(path: &[&str]) -> String {
    let readable: String = path
        .iter()
        .flat_map(|part| part.chars())
        .filter(char::is_ascii_alphanumeric)
        .collect();
    let digest = Sha256::digest(path.join("/").as_bytes());
    format!("{}{}", readable, hex::encode_upper(&digest[..4]))
}

static FIFO_QUEUE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,75}\.fifo$").expect("Invalid FIFO queue regex"));
static STANDARD_QUEUE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,80}$").expect("Invalid queue regex"));
static LOG_GROUP_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[.\-_/#A-Za-z0-9]{1,512}$").expect("Invalid log group regex"));
static PIPE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[.\-_A-Za-z0-9]{1,64}$").expect("Invalid pipe name regex"));

/// Retention values CloudWatch Logs accepts, in days.
const LOG_RETENTION_DAYS: &[u32] = &[
    1, 3, 5, 7, 14, 30, 60, 90, 120, 150, 180, 365, 400, 545, 731, 1096, 1827, 2192, 2557, 2922,
    3288, 3653,
];

// ============================================================================
// COMPILED STACK TYPES
// ============================================================================

/// Execution role assumed by the pipe.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoleSpec {
    pub logical_id: String,
    pub service_principal: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProvisionedThroughput {
    pub read_capacity: u32,
    pub write_capacity: u32,
}

/// Compiled source table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSpec {
    pub logical_id: String,
    pub partition_key: KeyConfig,
    pub sort_key: Option<KeyConfig>,
    pub billing_mode: BillingMode,
    pub provisioned: Option<ProvisionedThroughput>,
    pub stream_view_type: StreamViewType,
    pub removal_policy: RemovalPolicy,
    pub deletion_protection: bool,
}

impl TableSpec {
    pub fn stream_arn(&self) -> Intrinsic {
        Intrinsic::get_att(&self.logical_id, "StreamArn")
    }

    pub fn key_attributes(&self) -> impl Iterator<Item = &KeyConfig> {
        std::iter::once(&self.partition_key).chain(self.sort_key.iter())
    }

    /// The change-event shape this table's stream emits.
    pub fn event_schema(&self) -> EventSchema {
        self.key_attributes().fold(EventSchema::new(self.stream_view_type), |schema, key| {
            schema.with_key(key.name.clone(), key.attribute_type)
        })
    }
}

/// Compiled queue (target or dead-letter).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueueSpec {
    pub logical_id: String,
    pub fifo: bool,
    pub queue_name: Option<String>,
    pub content_based_deduplication: bool,
    pub message_retention_seconds: Option<u32>,
    pub removal_policy: RemovalPolicy,
}

impl QueueSpec {
    pub fn arn(&self) -> Intrinsic {
        Intrinsic::get_att(&self.logical_id, "Arn")
    }

    /// `Ref` on a queue yields its URL.
    pub fn url(&self) -> Intrinsic {
        Intrinsic::Ref(self.logical_id.clone())
    }
}

/// Compiled log group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogGroupSpec {
    pub logical_id: String,
    pub name: String,
    pub retention_days: Option<u32>,
    pub removal_policy: RemovalPolicy,
}

impl LogGroupSpec {
    pub fn arn(&self) -> Intrinsic {
        Intrinsic::get_att(&self.logical_id, "Arn")
    }
}

/// Permission policy attached to the execution role.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicySpec {
    pub logical_id: String,
    pub role_id: String,
    pub grants: Vec<Grant>,
}

impl PolicySpec {
    pub fn document(&self) -> PolicyDocument {
        PolicyDocument::from_grants(&self.grants)
    }
}

/// Stream source parameters of the pipe.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamSourceSpec {
    pub stream_arn: Intrinsic,
    pub starting_position: StartingPosition,
    pub maximum_retry_attempts: u32,
    pub batch_size: Option<u32>,
    pub maximum_batching_window_seconds: Option<u32>,
    pub dead_letter_arn: Option<Intrinsic>,
}

/// Log wiring of the pipe.
#[derive(Debug, Clone, PartialEq)]
pub struct PipeLogSpec {
    pub level: LogLevel,
    pub include_execution_data: Vec<ExecutionData>,
    pub log_group_arn: Intrinsic,
}

/// Compiled routing pipe.
#[derive(Debug, Clone, PartialEq)]
pub struct PipeSpec {
    pub logical_id: String,
    pub name: Option<String>,
    pub desired_state: PipeState,
    pub role_arn: Intrinsic,
    pub source: StreamSourceSpec,
    pub target_arn: Intrinsic,
    pub mapping: MessageMapping,
    pub log: PipeLogSpec,
}

/// Something valid but worth a reviewer's attention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// Events that exhaust their retries are dropped
    MissingDeadLetter { pipe: String, retries: u32 },
    /// Resource outlives stack teardown
    RetainedOnTeardown { logical_id: String },
    /// A new pipe replays the full stream history
    ReplaysHistory { pipe: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::MissingDeadLetter { pipe, retries } => write!(
                f,
                "{}: no dead-letter queue, events failing {} retries are dropped",
                pipe, retries
            ),
            Diagnostic::RetainedOnTeardown { logical_id } => {
                write!(f, "{}: retained when the stack is deleted", logical_id)
            }
            Diagnostic::ReplaysHistory { pipe } => {
                write!(f, "{}: starts at TRIM_HORIZON and replays retained records", pipe)
            }
        }
    }
}

/// A validated stack, ready for synthesis.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledStack {
    pub name: String,
    pub description: String,
    pub role: RoleSpec,
    pub policy: PolicySpec,
    pub table: TableSpec,
    pub queue: QueueSpec,
    pub dead_letter: Option<QueueSpec>,
    pub log_group: LogGroupSpec,
    pub pipe: PipeSpec,
    pub graph: ResourceGraph,
    /// Logical ids in dependency order
    pub creation_order: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
}

impl CompiledStack {
    pub fn event_schema(&self) -> EventSchema {
        self.table.event_schema()
    }

    /// Operations the pipe performs, each needing one grant.
    pub fn required_grants(&self) -> Vec<GrantKind> {
        let mut kinds = vec![
            GrantKind::StreamRead,
            GrantKind::SendMessages,
            GrantKind::LogWrite,
        ];
        if self.dead_letter.is_some() {
            kinds.push(GrantKind::SendMessages);
        }
        kinds
    }

    /// Compare the declared policy with what the pipe's operations need.
    pub fn privilege_report(&self) -> PrivilegeReport {
        let required = pipestack_core::required_actions(self.required_grants());
        PrivilegeReport::compare(&self.policy.document(), &required)
    }

    /// Derive the message the pipe would deliver for an event.
    pub fn route(&self, event: &ChangeEvent) -> Result<QueueMessage, MappingError> {
        self.pipe.mapping.apply(event)
    }
}

// ============================================================================
// COMPILER
// ============================================================================

/// Compiler from stack configuration to resource graph.
pub struct StackCompiler<'a> {
    config: &'a StackConfig,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> StackCompiler<'a> {
    pub fn new(config: &'a StackConfig) -> Self {
        Self {
            config,
            diagnostics: Vec::new(),
        }
    }

    /// Compile a configuration into a validated stack.
    pub fn compile(config: &StackConfig) -> CompileResult<CompiledStack> {
        StackCompiler::new(config).run()
    }

    fn run(mut self) -> CompileResult<CompiledStack> {
        let config = self.config;
        tracing::debug!(stack = %config.stack.name, "compiling stack");

        let role = RoleSpec {
            logical_id: logical_id(&[ROLE_ID]),
            service_principal: PIPES_SERVICE_PRINCIPAL.to_string(),
        };
        let table = self.compile_table(&config.table)?;
        let queue = self.compile_queue(&config.queue)?;
        let dead_letter = match &config.pipe.source.dead_letter {
            Some(dlq) => Some(self.compile_dead_letter(dlq)?),
            None => None,
        };
        let log_group = self.compile_log_group(&config.log_group)?;

        let mut grants = vec![
            Grant::new(GrantKind::StreamRead, table.stream_arn()),
            Grant::new(GrantKind::SendMessages, queue.arn()),
            Grant::new(GrantKind::LogWrite, log_group.arn()),
        ];
        if let Some(dlq) = &dead_letter {
            grants.push(Grant::new(GrantKind::SendMessages, dlq.arn()));
        }
        let policy = PolicySpec {
            logical_id: logical_id(&[ROLE_ID, POLICY_ID]),
            role_id: role.logical_id.clone(),
            grants,
        };

        let pipe = self.compile_pipe(
            &config.pipe,
            &role,
            &table,
            &queue,
            dead_letter.as_ref(),
            &log_group,
        )?;

        let mut graph = ResourceGraph::new();
        let mut leaves = vec![
            &role.logical_id,
            &table.logical_id,
            &queue.logical_id,
            &log_group.logical_id,
        ];
        if let Some(dlq) = &dead_letter {
            leaves.push(&dlq.logical_id);
        }
        for id in &leaves {
            graph.add_resource(id)?;
        }
        graph.add_resource(&policy.logical_id)?;
        graph.add_resource(&pipe.logical_id)?;
        for id in &leaves {
            graph.add_dependency(&policy.logical_id, id)?;
            graph.add_dependency(&pipe.logical_id, id)?;
        }
        graph.add_dependency(&pipe.logical_id, &policy.logical_id)?;
        let creation_order = graph.topological_order()?;

        for diagnostic in &self.diagnostics {
            tracing::warn!(diagnostic = %diagnostic, "stack diagnostic");
        }
        tracing::info!(
            stack = %config.stack.name,
            resources = graph.len(),
            diagnostics = self.diagnostics.len(),
            "stack compiled"
        );

        Ok(CompiledStack {
            name: config.stack.name.clone(),
            description: config
                .stack
                .description
                .clone()
                .unwrap_or_else(|| "DynamoDB stream to SQS FIFO routing pipe".to_string()),
            role,
            policy,
            table,
            queue,
            dead_letter,
            log_group,
            pipe,
            graph,
            creation_order,
            diagnostics: self.diagnostics,
        })
    }

    fn note_removal(&mut self, logical_id: &str, policy: RemovalPolicy) {
        if policy != RemovalPolicy::Destroy {
            self.diagnostics.push(Diagnostic::RetainedOnTeardown {
                logical_id: logical_id.to_string(),
            });
        }
    }

    fn compile_table(&mut self, table: &TableConfig) -> CompileResult<TableSpec> {
        if table.partition_key.name.is_empty() {
            return Err(CompileError::MissingField {
                field: "table.partition_key.name".to_string(),
            });
        }
        if let Some(sort_key) = &table.sort_key {
            if sort_key.name.is_empty() || sort_key.name == table.partition_key.name {
                return Err(CompileError::InvalidValue {
                    field: "table.sort_key.name".to_string(),
                    reason: format!(
                        "'{}' must be non-empty and differ from the partition key",
                        sort_key.name
                    ),
                });
            }
        }

        let provisioned = match (table.billing_mode, table.read_capacity, table.write_capacity) {
            (BillingMode::PayPerRequest, None, None) => None,
            (BillingMode::PayPerRequest, _, _) => {
                return Err(CompileError::IncompatibleOptions {
                    option_a: "table.billing_mode = PAY_PER_REQUEST".to_string(),
                    option_b: "table.read_capacity / table.write_capacity".to_string(),
                })
            }
            (BillingMode::Provisioned, Some(read), Some(write)) if read > 0 && write > 0 => {
                Some(ProvisionedThroughput {
                    read_capacity: read,
                    write_capacity: write,
                })
            }
            (BillingMode::Provisioned, _, _) => {
                return Err(CompileError::InvalidValue {
                    field: "table.read_capacity / table.write_capacity".to_string(),
                    reason: "PROVISIONED billing needs both capacities above zero".to_string(),
                })
            }
        };

        if table.deletion_protection && table.removal_policy == RemovalPolicy::Destroy {
            return Err(CompileError::IncompatibleOptions {
                option_a: "table.deletion_protection = true".to_string(),
                option_b: "table.removal_policy = destroy".to_string(),
            });
        }

        let logical_id = logical_id(&[TABLE_ID]);
        self.note_removal(&logical_id, table.removal_policy);
        tracing::debug!(logical_id = %logical_id, stream = %table.stream_view_type, "declared table");

        Ok(TableSpec {
            logical_id,
            partition_key: table.partition_key.clone(),
            sort_key: table.sort_key.clone(),
            billing_mode: table.billing_mode,
            provisioned,
            stream_view_type: table.stream_view_type,
            removal_policy: table.removal_policy,
            deletion_protection: table.deletion_protection,
        })
    }

    fn compile_queue(&mut self, queue: &QueueConfig) -> CompileResult<QueueSpec> {
        if !queue.fifo {
            return Err(CompileError::UnorderedTarget);
        }
        if let Some(name) = &queue.queue_name {
            if !FIFO_QUEUE_NAME.is_match(name) {
                return Err(CompileError::InvalidValue {
                    field: "queue.queue_name".to_string(),
                    reason: format!("'{}' is not a valid FIFO queue name (must end in .fifo)", name),
                });
            }
        }
        reject_snapshot("queue.removal_policy", queue.removal_policy)?;

        let logical_id = logical_id(&[QUEUE_ID]);
        self.note_removal(&logical_id, queue.removal_policy);
        tracing::debug!(logical_id = %logical_id, "declared target queue");

        Ok(QueueSpec {
            logical_id,
            fifo: true,
            queue_name: queue.queue_name.clone(),
            content_based_deduplication: queue.content_based_deduplication,
            message_retention_seconds: None,
            removal_policy: queue.removal_policy,
        })
    }

    fn compile_dead_letter(&mut self, dlq: &DeadLetterConfig) -> CompileResult<QueueSpec> {
        if let Some(name) = &dlq.queue_name {
            if !STANDARD_QUEUE_NAME.is_match(name) {
                return Err(CompileError::InvalidValue {
                    field: "pipe.source.dead_letter.queue_name".to_string(),
                    reason: format!("'{}' is not a valid standard queue name", name),
                });
            }
        }
        reject_snapshot("pipe.source.dead_letter.removal_policy", dlq.removal_policy)?;

        let logical_id = logical_id(&[DEAD_LETTER_ID]);
        self.note_removal(&logical_id, dlq.removal_policy);

        Ok(QueueSpec {
            logical_id,
            fifo: false,
            queue_name: dlq.queue_name.clone(),
            content_based_deduplication: false,
            message_retention_seconds: Some(DEAD_LETTER_RETENTION_SECONDS),
            removal_policy: dlq.removal_policy,
        })
    }

    fn compile_log_group(&mut self, log_group: &LogGroupConfig) -> CompileResult<LogGroupSpec> {
        if !LOG_GROUP_NAME.is_match(&log_group.name) {
            return Err(CompileError::InvalidValue {
                field: "log_group.name".to_string(),
                reason: format!("'{}' is not a valid log group name", log_group.name),
            });
        }
        if let Some(days) = log_group.retention_days {
            if !LOG_RETENTION_DAYS.contains(&days) {
                return Err(CompileError::InvalidValue {
                    field: "log_group.retention_days".to_string(),
                    reason: format!("{} is not a supported retention period", days),
                });
            }
        }
        reject_snapshot("log_group.removal_policy", log_group.removal_policy)?;

        let logical_id = logical_id(&[LOG_GROUP_ID]);
        self.note_removal(&logical_id, log_group.removal_policy);

        Ok(LogGroupSpec {
            logical_id,
            name: log_group.name.clone(),
            retention_days: log_group.retention_days,
            removal_policy: log_group.removal_policy,
        })
    }

    fn compile_pipe(
        &mut self,
        pipe: &PipeConfig,
        role: &RoleSpec,
        table: &TableSpec,
        queue: &QueueSpec,
        dead_letter: Option<&QueueSpec>,
        log_group: &LogGroupSpec,
    ) -> CompileResult<PipeSpec> {
        let logical_id = logical_id(&[PIPE_ID]);

        if let Some(name) = &pipe.name {
            if !PIPE_NAME.is_match(name) {
                return Err(CompileError::InvalidValue {
                    field: "pipe.name".to_string(),
                    reason: format!("'{}' is not a valid pipe name", name),
                });
            }
        }

        let source = &pipe.source;
        check_range("pipe.source.maximum_retry_attempts", source.maximum_retry_attempts, 0, 10_000)?;
        if let Some(size) = source.batch_size {
            check_range("pipe.source.batch_size", size, 1, 10_000)?;
        }
        if let Some(window) = source.maximum_batching_window_seconds {
            check_range("pipe.source.maximum_batching_window_seconds", window, 0, 300)?;
        }

        let log = compile_log(&pipe.log, log_group)?;

        let mapping = MessageMapping {
            deduplication_id: pipe.target.message_deduplication_id.clone(),
            group_id: pipe.target.message_group_id.clone(),
        };
        let schema = table.event_schema();
        check_mapping_path(&schema, "pipe.target.message_deduplication_id", &mapping.deduplication_id)?;
        check_mapping_path(&schema, "pipe.target.message_group_id", &mapping.group_id)?;

        if dead_letter.is_none() {
            self.diagnostics.push(Diagnostic::MissingDeadLetter {
                pipe: logical_id.clone(),
                retries: source.maximum_retry_attempts,
            });
        }
        if source.starting_position == StartingPosition::TrimHorizon {
            self.diagnostics.push(Diagnostic::ReplaysHistory {
                pipe: logical_id.clone(),
            });
        }

        tracing::debug!(
            logical_id = %logical_id,
            starting_position = %source.starting_position,
            retries = source.maximum_retry_attempts,
            state = %pipe.desired_state,
            "declared pipe"
        );

        Ok(PipeSpec {
            logical_id,
            name: pipe.name.clone(),
            desired_state: pipe.desired_state,
            role_arn: Intrinsic::get_att(&role.logical_id, "Arn"),
            source: StreamSourceSpec {
                stream_arn: table.stream_arn(),
                starting_position: source.starting_position,
                maximum_retry_attempts: source.maximum_retry_attempts,
                batch_size: source.batch_size,
                maximum_batching_window_seconds: source.maximum_batching_window_seconds,
                dead_letter_arn: dead_letter.map(QueueSpec::arn),
            },
            target_arn: queue.arn(),
            mapping,
            log,
        })
    }
}

/// Pipe logs are the only place delivery failures surface, so they are
/// always on and the most verbose level always carries full payloads.
fn compile_log(log: &LogConfig, log_group: &LogGroupSpec) -> CompileResult<PipeLogSpec> {
    if log.level == LogLevel::Off {
        return Err(CompileError::InvalidValue {
            field: "pipe.log.level".to_string(),
            reason: "OFF leaves routing failures with no diagnostic surface".to_string(),
        });
    }
    let include_all = log.include_execution_data.contains(&ExecutionData::All);
    if log.level.is_maximum() != include_all {
        return Err(CompileError::InconsistentLogging {
            level: log.level,
            include_all,
        });
    }

    let mut include_execution_data = log.include_execution_data.clone();
    include_execution_data.dedup();

    Ok(PipeLogSpec {
        level: log.level,
        include_execution_data,
        log_group_arn: log_group.arn(),
    })
}

fn check_mapping_path(
    schema: &EventSchema,
    field: &str,
    path: &FieldPath,
) -> CompileResult<()> {
    schema
        .check_string(path)
        .map_err(|source| CompileError::InvalidPath {
            field: field.to_string(),
            source,
        })
}

fn check_range(field: &str, value: u32, min: u32, max: u32) -> CompileResult<()> {
    if value < min || value > max {
        return Err(CompileError::InvalidValue {
            field: field.to_string(),
            reason: format!("{} is outside {}..={}", value, min, max),
        });
    }
    Ok(())
}

fn reject_snapshot(field: &str, policy: RemovalPolicy) -> CompileResult<()> {
    if policy == RemovalPolicy::Snapshot {
        return Err(CompileError::InvalidValue {
            field: field.to_string(),
            reason: "snapshot removal is only supported for tables".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipestack_core::KeyAttributeType;

    fn compile(config: &StackConfig) -> CompileResult<CompiledStack> {
        StackCompiler::compile(config)
    }

    #[test]
    fn test_logical_id_is_stable() {
        let a = logical_id(&["Table"]);
        assert_eq!(a, logical_id(&["Table"]));
        assert!(a.starts_with("Table"));
        assert_eq!(a.len(), "Table".len() + 8);
        assert!(a[5..].chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
        assert_ne!(logical_id(&["Role", "DefaultPolicy"]), logical_id(&["RoleDefaultPolicy"]));
    }

    #[test]
    fn test_reference_stack_compiles() {
        let stack = compile(&StackConfig::reference()).unwrap();
        assert_eq!(stack.pipe.source.maximum_retry_attempts, 3);
        assert_eq!(stack.pipe.source.starting_position, StartingPosition::Latest);
        assert_eq!(stack.pipe.log.level, LogLevel::Trace);
        assert!(stack.dead_letter.is_none());
        assert_eq!(stack.graph.len(), 6);
        assert_eq!(stack.creation_order.last(), Some(&stack.pipe.logical_id));
        assert!(stack.privilege_report().is_exact());
    }

    #[test]
    fn test_missing_dead_letter_is_flagged() {
        let stack = compile(&StackConfig::reference()).unwrap();
        assert!(stack
            .diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::MissingDeadLetter { retries: 3, .. })));
    }

    #[test]
    fn test_inconsistent_logging_rejected() {
        let mut config = StackConfig::reference();
        config.pipe.log.include_execution_data.clear();
        assert_eq!(
            compile(&config).unwrap_err(),
            CompileError::InconsistentLogging {
                level: LogLevel::Trace,
                include_all: false
            }
        );

        config.pipe.log.level = LogLevel::Error;
        config.pipe.log.include_execution_data = vec![ExecutionData::All];
        assert!(matches!(
            compile(&config),
            Err(CompileError::InconsistentLogging {
                level: LogLevel::Error,
                include_all: true
            })
        ));

        config.pipe.log.include_execution_data.clear();
        assert!(compile(&config).is_ok());
    }

    #[test]
    fn test_logging_off_rejected() {
        let mut config = StackConfig::reference();
        config.pipe.log.level = LogLevel::Off;
        config.pipe.log.include_execution_data.clear();
        assert!(matches!(
            compile(&config),
            Err(CompileError::InvalidValue { field, .. }) if field == "pipe.log.level"
        ));
    }

    #[test]
    fn test_fifo_is_mandatory() {
        let mut config = StackConfig::reference();
        config.queue.fifo = false;
        assert_eq!(compile(&config).unwrap_err(), CompileError::UnorderedTarget);

        config.queue.fifo = true;
        config.queue.queue_name = Some("orders".to_string());
        assert!(matches!(compile(&config), Err(CompileError::InvalidValue { .. })));
        config.queue.queue_name = Some("orders.fifo".to_string());
        assert!(compile(&config).is_ok());
    }

    #[test]
    fn test_mapping_paths_checked_against_table() {
        let mut config = StackConfig::reference();
        config.table.partition_key.name = "pk".to_string();
        match compile(&config) {
            Err(CompileError::InvalidPath { field, source }) => {
                assert_eq!(field, "pipe.target.message_group_id");
                assert!(matches!(source, PathError::UnknownKeyAttribute { .. }));
            }
            other => panic!("expected path error, got {:?}", other),
        }

        config.pipe.target.message_group_id =
            FieldPath::parse("$.dynamodb.Keys.pk.S").unwrap();
        assert!(compile(&config).is_ok());
    }

    #[test]
    fn test_keys_only_stream_rejects_image_mapping() {
        let mut config = StackConfig::reference();
        config.table.stream_view_type = StreamViewType::KeysOnly;
        config.pipe.target.message_group_id =
            FieldPath::parse("$.dynamodb.NewImage.tenant.S").unwrap();
        assert!(matches!(
            compile(&config),
            Err(CompileError::InvalidPath {
                source: PathError::ImageNotCaptured { .. },
                ..
            })
        ));
    }

    #[test]
    fn test_dead_letter_adds_grant_and_dependency() {
        let mut config = StackConfig::reference();
        config.pipe.source.dead_letter = Some(DeadLetterConfig::default());
        let stack = compile(&config).unwrap();
        let dlq = stack.dead_letter.as_ref().unwrap();
        assert!(!dlq.fifo);
        assert_eq!(stack.pipe.source.dead_letter_arn, Some(dlq.arn()));
        assert_eq!(stack.policy.grants.len(), 4);
        assert!(stack
            .graph
            .dependencies(&stack.pipe.logical_id)
            .any(|id| id == dlq.logical_id));
        assert!(stack.privilege_report().is_exact());
        assert!(!stack
            .diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::MissingDeadLetter { .. })));
    }

    #[test]
    fn test_source_ranges() {
        let mut config = StackConfig::reference();
        config.pipe.source.maximum_retry_attempts = 10_001;
        assert!(matches!(compile(&config), Err(CompileError::InvalidValue { .. })));

        config.pipe.source.maximum_retry_attempts = 0;
        config.pipe.source.batch_size = Some(0);
        assert!(matches!(compile(&config), Err(CompileError::InvalidValue { .. })));

        config.pipe.source.batch_size = Some(100);
        config.pipe.source.maximum_batching_window_seconds = Some(301);
        assert!(matches!(compile(&config), Err(CompileError::InvalidValue { .. })));
    }

    #[test]
    fn test_billing_and_protection_rules() {
        let mut config = StackConfig::reference();
        config.table.read_capacity = Some(5);
        assert!(matches!(
            compile(&config),
            Err(CompileError::IncompatibleOptions { .. })
        ));

        config.table.billing_mode = BillingMode::Provisioned;
        assert!(matches!(compile(&config), Err(CompileError::InvalidValue { .. })));
        config.table.write_capacity = Some(5);
        let stack = compile(&config).unwrap();
        assert_eq!(
            stack.table.provisioned,
            Some(ProvisionedThroughput {
                read_capacity: 5,
                write_capacity: 5
            })
        );

        let mut config = StackConfig::reference();
        config.table.deletion_protection = true;
        assert!(matches!(
            compile(&config),
            Err(CompileError::IncompatibleOptions { .. })
        ));
        config.table.removal_policy = RemovalPolicy::Retain;
        let stack = compile(&config).unwrap();
        assert!(stack
            .diagnostics
            .contains(&Diagnostic::RetainedOnTeardown {
                logical_id: stack.table.logical_id.clone()
            }));
    }

    #[test]
    fn test_trim_horizon_is_allowed_but_noted() {
        let mut config = StackConfig::reference();
        config.pipe.source.starting_position = StartingPosition::TrimHorizon;
        let stack = compile(&config).unwrap();
        assert!(stack
            .diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::ReplaysHistory { .. })));
    }

    #[test]
    fn test_sort_key_is_part_of_event_schema() {
        let mut config = StackConfig::reference();
        config.table.sort_key = Some(KeyConfig {
            name: "version".to_string(),
            attribute_type: KeyAttributeType::Number,
        });
        config.pipe.target.message_deduplication_id =
            FieldPath::parse("$.dynamodb.Keys.version.N").unwrap();
        let stack = compile(&config).unwrap();
        assert!(stack
            .event_schema()
            .check_string(&stack.pipe.mapping.deduplication_id)
            .is_ok());
    }
}
