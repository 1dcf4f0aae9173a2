//! Composition root for the workflow coordination core: typed configuration, tracing
//! setup, and wiring of the store/registry/backend layers into a running
//! `Arc<WorkflowManager<_, _>>`. Implements no wire protocol of its own (§1 Non-goals);
//! a transport layer is expected to sit in front of `AppManager`.

mod config;
pub use config::Config as ServerConfig;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use wfcore_backends::{HttpCodesetStore, HttpWorkflowBackend, MemoryCodesetStore, MemoryWorkflowBackend};
use wfcore_domain::{CodesetAssignment, Id, Listener, Result, Workflow, WorkflowAssignmentStatus, WorkflowRun, WorkflowRunFilter};
use wfcore_extension_registry::ExtensionRegistry;
use wfcore_workflow_manager::WorkflowManager;

/// Initialises a `tracing` subscriber from `RUST_LOG` (or `info` if unset). Call once at
/// process startup.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// The manager, wired against one of the two reference adapter pairs chosen at startup
/// from `ServerConfig`. An enum rather than a generic so the composition root can decide
/// the concrete backend at runtime without exposing `WorkflowManager`'s type parameters
/// to whatever sits above it.
pub enum AppManager {
    Memory(Arc<WorkflowManager<MemoryWorkflowBackend, MemoryCodesetStore>>),
    Http(Arc<WorkflowManager<HttpWorkflowBackend, HttpCodesetStore>>),
}

impl AppManager {
    /// Builds the in-memory variant: no external execution engine or source-code host,
    /// suitable for embedding the core in a single process.
    pub fn memory() -> Self {
        let backend = Arc::new(MemoryWorkflowBackend::new());
        let codesets = Arc::new(MemoryCodesetStore::new());
        let registry = Arc::new(ExtensionRegistry::new());
        Self::Memory(WorkflowManager::new(backend, codesets, registry))
    }

    /// Builds the HTTP-backed variant from `config`'s adapter base URLs.
    pub fn http(config: &ServerConfig) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder().build()?;
        let backend = Arc::new(HttpWorkflowBackend::new(
            config.workflow_backend_url().unwrap_or("http://localhost:8080").to_string(),
            client.clone(),
        ));
        let codesets = Arc::new(HttpCodesetStore::new(
            config.codeset_store_url().unwrap_or("http://localhost:8081").to_string(),
            client,
        ));
        let registry = Arc::new(ExtensionRegistry::new());
        Ok(Self::Http(WorkflowManager::new(backend, codesets, registry)))
    }

    /// Picks `http` when both adapter URLs are configured, `memory` otherwise.
    pub fn from_config(config: &ServerConfig) -> reqwest::Result<Self> {
        if config.workflow_backend_url().is_some() && config.codeset_store_url().is_some() {
            Self::http(config)
        } else {
            Ok(Self::memory())
        }
    }

    pub async fn create_workflow(&self, deadline: Option<Duration>, workflow: Workflow) -> Result<Workflow> {
        match self {
            Self::Memory(mgr) => mgr.create_workflow(deadline, workflow).await,
            Self::Http(mgr) => mgr.create_workflow(deadline, workflow).await,
        }
    }

    pub async fn get_workflow(&self, deadline: Option<Duration>, name: &str) -> Result<Workflow> {
        match self {
            Self::Memory(mgr) => mgr.get_workflow(deadline, name).await,
            Self::Http(mgr) => mgr.get_workflow(deadline, name).await,
        }
    }

    pub async fn get_workflows(&self, deadline: Option<Duration>, name_filter: Option<&str>) -> Result<Vec<Workflow>> {
        match self {
            Self::Memory(mgr) => mgr.get_workflows(deadline, name_filter).await,
            Self::Http(mgr) => mgr.get_workflows(deadline, name_filter).await,
        }
    }

    pub async fn delete_workflow(&self, deadline: Option<Duration>, name: &str) -> Result<()> {
        match self {
            Self::Memory(mgr) => mgr.delete_workflow(deadline, name).await,
            Self::Http(mgr) => mgr.delete_workflow(deadline, name).await,
        }
    }

    pub async fn assign_to_codeset(
        &self,
        deadline: Option<Duration>,
        workflow_name: &str,
        project: &str,
        codeset_name: &str,
    ) -> Result<(Listener, Option<i64>)> {
        match self {
            Self::Memory(mgr) => mgr.assign_to_codeset(deadline, workflow_name, project, codeset_name).await,
            Self::Http(mgr) => mgr.assign_to_codeset(deadline, workflow_name, project, codeset_name).await,
        }
    }

    pub async fn unassign_from_codeset(
        &self,
        deadline: Option<Duration>,
        workflow_name: &str,
        project: &str,
        codeset_name: &str,
    ) -> Result<()> {
        match self {
            Self::Memory(mgr) => mgr.unassign_from_codeset(deadline, workflow_name, project, codeset_name).await,
            Self::Http(mgr) => mgr.unassign_from_codeset(deadline, workflow_name, project, codeset_name).await,
        }
    }

    pub async fn get_assignment_status(&self, deadline: Option<Duration>, workflow_name: &str) -> WorkflowAssignmentStatus {
        match self {
            Self::Memory(mgr) => mgr.get_assignment_status(deadline, workflow_name).await,
            Self::Http(mgr) => mgr.get_assignment_status(deadline, workflow_name).await,
        }
    }

    pub async fn get_all_codeset_assignments(
        &self,
        deadline: Option<Duration>,
        workflow_filter: Option<&str>,
    ) -> Result<HashMap<Id, Vec<CodesetAssignment>>> {
        match self {
            Self::Memory(mgr) => mgr.get_all_codeset_assignments(deadline, workflow_filter).await,
            Self::Http(mgr) => mgr.get_all_codeset_assignments(deadline, workflow_filter).await,
        }
    }

    pub async fn get_workflow_runs(&self, deadline: Option<Duration>, filter: Option<&WorkflowRunFilter>) -> Result<Vec<WorkflowRun>> {
        match self {
            Self::Memory(mgr) => mgr.get_workflow_runs(deadline, filter).await,
            Self::Http(mgr) => mgr.get_workflow_runs(deadline, filter).await,
        }
    }
}
