//! IAM permission grants for the pipe's execution role
//!
//! Each grant covers one operation the pipe performs. The role receives
//! the union of its grants' actions and nothing else.

use crate::{Intrinsic, ResourceArn};
use serde::Serialize;
use std::collections::BTreeSet;

/// Service principal the routing pipe assumes its role as.
pub const PIPES_SERVICE_PRINCIPAL: &str = "pipes.amazonaws.com";

/// IAM policy language version.
pub const POLICY_VERSION: &str = "2012-10-17";

/// An operation the pipe needs permission for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GrantKind {
    /// Read records from a table's change stream
    StreamRead,
    /// Send messages to a queue (target or dead-letter)
    SendMessages,
    /// Write execution logs to a log group
    LogWrite,
}

impl GrantKind {
    /// Actions scoped to the granted resource.
    pub fn actions(&self) -> &'static [&'static str] {
        match self {
            GrantKind::StreamRead => &[
                "dynamodb:DescribeStream",
                "dynamodb:GetRecords",
                "dynamodb:GetShardIterator",
            ],
            GrantKind::SendMessages => &[
                "sqs:SendMessage",
                "sqs:GetQueueAttributes",
                "sqs:GetQueueUrl",
            ],
            GrantKind::LogWrite => &["logs:CreateLogStream", "logs:PutLogEvents"],
        }
    }

    /// Actions that IAM only accepts on `*`.
    pub fn unscoped_actions(&self) -> &'static [&'static str] {
        match self {
            GrantKind::StreamRead => &["dynamodb:ListStreams"],
            GrantKind::SendMessages | GrantKind::LogWrite => &[],
        }
    }

    pub fn all_actions(&self) -> impl Iterator<Item = &'static str> {
        self.unscoped_actions()
            .iter()
            .chain(self.actions().iter())
            .copied()
    }
}

/// A grant of one operation on one resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Grant {
    pub kind: GrantKind,
    pub resource: Intrinsic,
}

impl Grant {
    pub fn new(kind: GrantKind, resource: Intrinsic) -> Self {
        Self { kind, resource }
    }

    pub fn statements(&self) -> Vec<PolicyStatement> {
        let mut statements = Vec::with_capacity(2);
        let unscoped = self.kind.unscoped_actions();
        if !unscoped.is_empty() {
            statements.push(PolicyStatement::allow(unscoped, ResourceArn::Any));
        }
        statements.push(PolicyStatement::allow(
            self.kind.actions(),
            ResourceArn::Arn(self.resource.clone()),
        ));
        statements
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Effect {
    Allow,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServicePrincipal {
    #[serde(rename = "Service")]
    pub service: String,
}

/// One statement of a policy document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyStatement {
    pub action: Vec<String>,
    pub effect: Effect,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal: Option<ServicePrincipal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<ResourceArn>,
}

impl PolicyStatement {
    pub fn allow(actions: &[&str], resource: ResourceArn) -> Self {
        Self {
            action: actions.iter().map(|a| (*a).to_string()).collect(),
            effect: Effect::Allow,
            principal: None,
            resource: Some(resource),
        }
    }
}

/// An IAM policy document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    pub version: &'static str,
    pub statement: Vec<PolicyStatement>,
}

impl PolicyDocument {
    /// Permission policy carrying every statement of the given grants.
    pub fn from_grants(grants: &[Grant]) -> Self {
        Self {
            version: POLICY_VERSION,
            statement: grants.iter().flat_map(Grant::statements).collect(),
        }
    }

    /// Trust policy letting a service assume the role.
    pub fn assume_role(service: &str) -> Self {
        Self {
            version: POLICY_VERSION,
            statement: vec![PolicyStatement {
                action: vec!["sts:AssumeRole".to_string()],
                effect: Effect::Allow,
                principal: Some(ServicePrincipal {
                    service: service.to_string(),
                }),
                resource: None,
            }],
        }
    }

    pub fn actions(&self) -> BTreeSet<&str> {
        self.statement
            .iter()
            .flat_map(|s| s.action.iter().map(String::as_str))
            .collect()
    }

    /// Logical ids of every resource the document is scoped to.
    pub fn referenced_ids(&self) -> BTreeSet<&str> {
        self.statement
            .iter()
            .filter_map(|s| s.resource.as_ref())
            .filter_map(ResourceArn::referenced_id)
            .collect()
    }
}

/// Union of the actions the given operations need.
pub fn required_actions(kinds: impl IntoIterator<Item = GrantKind>) -> BTreeSet<&'static str> {
    kinds.into_iter().flat_map(|k| k.all_actions()).collect()
}

/// Least-privilege comparison between a policy and the operations it serves.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PrivilegeReport {
    /// Actions granted but not needed
    pub excess: Vec<String>,
    /// Actions needed but not granted
    pub missing: Vec<String>,
}

impl PrivilegeReport {
    pub fn compare(document: &PolicyDocument, required: &BTreeSet<&str>) -> Self {
        let granted = document.actions();
        Self {
            excess: granted
                .difference(required)
                .map(|a| (*a).to_string())
                .collect(),
            missing: required
                .difference(&granted)
                .map(|a| (*a).to_string())
                .collect(),
        }
    }

    pub fn is_exact(&self) -> bool {
        self.excess.is_empty() && self.missing.is_empty()
    }
}
