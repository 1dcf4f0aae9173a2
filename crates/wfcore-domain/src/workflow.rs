use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::codeset::Codeset;
use crate::extension::ExtensionAccess;
use crate::ids::Id;

/// The subset of `ExtensionQuery` fields a workflow step can express; `StrictZoneMatch`,
/// `Type` and `CredentialsScope` are not caller-settable here, they are fixed by the
/// manager at resolution time (see `ExtensionRequirement::as_query`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionRequirementQuery {
    pub extension_id: Option<Id>,
    pub product: Option<Arc<str>>,
    pub version_constraints: Option<Arc<str>>,
    pub zone: Option<Arc<str>>,
    pub service_id: Option<Id>,
    pub service_resource: Option<Arc<str>>,
    pub service_category: Option<Arc<str>>,
}

/// A step-local reference to an extension, resolved to an `ExtensionAccess` at
/// `CreateWorkflow` time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepExtension {
    pub name: Arc<str>,
    pub query: ExtensionRequirementQuery,
    pub extension_access: Option<ExtensionAccess>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub name: Arc<str>,
    pub extensions: Vec<StepExtension>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub name: Id,
    pub created: DateTime<Utc>,
    pub steps: Vec<WorkflowStep>,
}

impl Workflow {
    pub fn new(name: impl Into<Id>, steps: Vec<WorkflowStep>) -> Self {
        Self {
            name: name.into(),
            created: DateTime::<Utc>::MIN_UTC,
            steps,
        }
    }
}

/// `(WorkflowName, Codeset, WebhookID)` — existence means the workflow reacts to that
/// codeset's change events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodesetAssignment {
    pub workflow_name: Id,
    pub codeset: Codeset,
    pub webhook_id: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct WorkflowRunFilter {
    pub workflow_name: Option<Id>,
    pub status: Option<Arc<str>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowRun {
    pub workflow_name: Id,
    pub name: Id,
    pub codeset: Codeset,
    pub status: Arc<str>,
    pub started: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WorkflowAssignmentStatus {
    pub available: bool,
    pub url: Option<Arc<str>>,
}
