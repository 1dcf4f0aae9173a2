//! Shared domain model for the workflow coordination core: the extension hierarchy, the
//! workflow/codeset assignment graph, the unified error type, and the collaborator traits
//! (`WorkflowBackend`, `CodesetStore`, `CodesetSubscriber`) that the manager depends on.
//!
//! This crate has no I/O of its own.

pub mod backend;
pub mod codeset;
pub mod error;
pub mod extension;
pub mod ids;
pub mod listener;
pub mod semver_range;
pub mod workflow;

pub use backend::{CodesetStore, CodesetSubscriber, WorkflowBackend};
pub use codeset::Codeset;
pub use error::{Error, Result};
pub use extension::{
    CredentialsScope, EndpointType, Extension, ExtensionAccess, ExtensionCredentials,
    ExtensionEndpoint, ExtensionQuery, ExtensionQueryMatch, ExtensionRecord, ExtensionService,
    ExtensionServiceRecord,
};
pub use ids::{ExtensionCredentialsId, ExtensionEndpointId, ExtensionServiceId, Id};
pub use listener::Listener;
pub use workflow::{
    CodesetAssignment, ExtensionRequirementQuery, StepExtension, Workflow,
    WorkflowAssignmentStatus, WorkflowRun, WorkflowRunFilter, WorkflowStep,
};
