//! Template synthesis - Render a CompiledStack as a CloudFormation template
//!
//! Resources appear in creation order. `DependsOn` lists only the graph
//! edges that no `Ref` or `Fn::GetAtt` in the resource's properties
//! already implies.

mod resources;

pub use resources::*;

use crate::compiler::{CompiledStack, QueueSpec};
use pipestack_core::{Intrinsic, RemovalPolicy};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

pub const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";

// ============================================================================
// ERROR TYPES
// ============================================================================

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SynthError {
    #[error("cannot encode properties of {resource}: {reason}")]
    Encode { resource: String, reason: String },

    #[error("{resource} references undeclared resource '{target}'")]
    DanglingReference { resource: String, target: String },

    #[error("resource '{0}' is in the creation order but was never declared")]
    Undeclared(String),

    #[error("JSON output error: {0}")]
    Json(String),

    #[error("YAML output error: {0}")]
    Yaml(String),
}

pub type SynthResult<T> = Result<T, SynthError>;

// ============================================================================
// TEMPLATE
// ============================================================================

/// One entry of the template's `Resources` section.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Resource {
    #[serde(rename = "Type")]
    pub resource_type: &'static str,
    pub properties: Value,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deletion_policy: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_replace_policy: Option<&'static str>,
}

impl Resource {
    fn new(resource_type: &'static str, logical_id: &str, properties: impl Serialize) -> SynthResult<Self> {
        let properties = serde_json::to_value(properties).map_err(|e| SynthError::Encode {
            resource: logical_id.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            resource_type,
            properties,
            depends_on: Vec::new(),
            deletion_policy: None,
            update_replace_policy: None,
        })
    }

    fn with_removal(mut self, policy: RemovalPolicy) -> Self {
        self.deletion_policy = Some(policy.as_deletion_policy());
        self.update_replace_policy = Some(policy.as_deletion_policy());
        self
    }

    /// Logical ids named by any `Ref` or `Fn::GetAtt` in the properties.
    pub fn referenced_ids(&self) -> BTreeSet<String> {
        let mut ids = BTreeSet::new();
        collect_references(&self.properties, &mut ids);
        ids
    }
}

fn collect_references(value: &Value, ids: &mut BTreeSet<String>) {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(id)) = map.get("Ref") {
                ids.insert(id.clone());
            }
            if let Some(Value::String(id)) = map
                .get("Fn::GetAtt")
                .and_then(Value::as_array)
                .and_then(|parts| parts.first())
            {
                ids.insert(id.clone());
            }
            map.values().for_each(|v| collect_references(v, ids));
        }
        Value::Array(items) => items.iter().for_each(|v| collect_references(v, ids)),
        _ => {}
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Output {
    pub description: &'static str,
    pub value: Intrinsic,
}

/// A synthesized template. Sections serialize in insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub description: String,
    pub resources: Vec<(String, Resource)>,
    pub outputs: Vec<(String, Output)>,
}

struct OrderedEntries<'a, T>(&'a [(String, T)]);

impl<T: Serialize> Serialize for OrderedEntries<'_, T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl Serialize for Template {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(4))?;
        map.serialize_entry("AWSTemplateFormatVersion", TEMPLATE_FORMAT_VERSION)?;
        map.serialize_entry("Description", &self.description)?;
        map.serialize_entry("Resources", &OrderedEntries(&self.resources))?;
        map.serialize_entry("Outputs", &OrderedEntries(&self.outputs))?;
        map.end()
    }
}

impl Template {
    pub fn resource(&self, logical_id: &str) -> Option<&Resource> {
        self.resources
            .iter()
            .find(|(id, _)| id == logical_id)
            .map(|(_, resource)| resource)
    }

    pub fn resource_ids(&self) -> impl Iterator<Item = &str> {
        self.resources.iter().map(|(id, _)| id.as_str())
    }

    pub fn to_value(&self) -> SynthResult<Value> {
        serde_json::to_value(self).map_err(|e| SynthError::Json(e.to_string()))
    }

    pub fn to_json_string(&self) -> SynthResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| SynthError::Json(e.to_string()))
    }

    pub fn to_yaml_string(&self) -> SynthResult<String> {
        serde_yaml::to_string(self).map_err(|e| SynthError::Yaml(e.to_string()))
    }
}

// ============================================================================
// SYNTHESIS
// ============================================================================

fn queue_resource(queue: &QueueSpec) -> SynthResult<Resource> {
    Ok(Resource::new(QUEUE_TYPE, &queue.logical_id, QueueProperties::from(queue))?
        .with_removal(queue.removal_policy))
}

/// Render a compiled stack. Pure: the same stack always yields the same template.
pub fn synthesize(stack: &CompiledStack) -> SynthResult<Template> {
    let mut declared: BTreeMap<&str, Resource> = BTreeMap::new();

    declared.insert(
        &stack.role.logical_id,
        Resource::new(ROLE_TYPE, &stack.role.logical_id, RoleProperties::from(&stack.role))?
            .with_removal(RemovalPolicy::Destroy),
    );
    declared.insert(
        &stack.policy.logical_id,
        Resource::new(
            POLICY_TYPE,
            &stack.policy.logical_id,
            PolicyProperties::from(&stack.policy),
        )?
        .with_removal(RemovalPolicy::Destroy),
    );
    declared.insert(
        &stack.table.logical_id,
        Resource::new(TABLE_TYPE, &stack.table.logical_id, TableProperties::from(&stack.table))?
            .with_removal(stack.table.removal_policy),
    );
    declared.insert(&stack.queue.logical_id, queue_resource(&stack.queue)?);
    if let Some(dlq) = &stack.dead_letter {
        declared.insert(&dlq.logical_id, queue_resource(dlq)?);
    }
    declared.insert(
        &stack.log_group.logical_id,
        Resource::new(
            LOG_GROUP_TYPE,
            &stack.log_group.logical_id,
            LogGroupProperties::from(&stack.log_group),
        )?
        .with_removal(stack.log_group.removal_policy),
    );
    declared.insert(
        &stack.pipe.logical_id,
        Resource::new(PIPE_TYPE, &stack.pipe.logical_id, PipeProperties::from(&stack.pipe))?
            .with_removal(RemovalPolicy::Destroy),
    );

    let mut resources = Vec::with_capacity(declared.len());
    for logical_id in &stack.creation_order {
        let mut resource = declared
            .remove(logical_id.as_str())
            .ok_or_else(|| SynthError::Undeclared(logical_id.clone()))?;

        let referenced = resource.referenced_ids();
        if let Some(target) = referenced.iter().find(|id| !stack.graph.contains(id)) {
            return Err(SynthError::DanglingReference {
                resource: logical_id.clone(),
                target: target.clone(),
            });
        }
        resource.depends_on = stack
            .graph
            .dependencies(logical_id)
            .filter(|dep| !referenced.contains(*dep))
            .map(str::to_string)
            .collect();

        tracing::debug!(
            logical_id = %logical_id,
            resource_type = resource.resource_type,
            depends_on = ?resource.depends_on,
            "synthesized resource"
        );
        resources.push((logical_id.clone(), resource));
    }

    let outputs = vec![
        (
            "TableStreamArn".to_string(),
            Output {
                description: "Change stream the pipe reads from",
                value: stack.table.stream_arn(),
            },
        ),
        (
            "QueueUrl".to_string(),
            Output {
                description: "FIFO queue receiving routed events",
                value: stack.queue.url(),
            },
        ),
        (
            "PipeArn".to_string(),
            Output {
                description: "Routing pipe",
                value: Intrinsic::get_att(&stack.pipe.logical_id, "Arn"),
            },
        ),
        (
            "LogGroupName".to_string(),
            Output {
                description: "Pipe execution logs",
                value: Intrinsic::Ref(stack.log_group.logical_id.clone()),
            },
        ),
    ];

    tracing::info!(
        stack = %stack.name,
        resources = resources.len(),
        "template synthesized"
    );

    Ok(Template {
        description: stack.description.clone(),
        resources,
        outputs,
    })
}
