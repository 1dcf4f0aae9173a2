use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::codeset::Codeset;
use crate::error::Result;
use crate::listener::Listener;
use crate::workflow::{Workflow, WorkflowRun, WorkflowRunFilter};

/// The execution engine that materialises and runs pipelines, and serves listener URLs.
/// Out of scope for this repo; consumed only through this interface (see `wfcore-backends`).
#[async_trait]
pub trait WorkflowBackend: Send + Sync {
    async fn create_workflow(&self, wf: &Workflow) -> Result<()>;
    async fn delete_workflow(&self, name: &str) -> Result<()>;
    async fn create_workflow_run(&self, name: &str, codeset: &Codeset) -> Result<()>;
    async fn get_workflow_runs(
        &self,
        workflow: &Workflow,
        filter: Option<&WorkflowRunFilter>,
    ) -> Result<Vec<WorkflowRun>>;
    /// Idempotent: returns the existing listener if one was already created for `name`.
    async fn create_workflow_listener(&self, name: &str, timeout: Duration) -> Result<Listener>;
    async fn delete_workflow_listener(&self, name: &str) -> Result<()>;
    async fn get_workflow_listener(&self, name: &str) -> Result<Listener>;
}

/// Receives codeset-deletion notifications. Implemented by `WorkflowManager`, and by
/// anything else that needs to react to a codeset going away.
#[async_trait]
pub trait CodesetSubscriber: Send + Sync {
    /// Stable identity used by `CodesetStore` to track and remove a specific subscription;
    /// trait objects are not otherwise comparable.
    fn subscriber_id(&self) -> &str;
    async fn on_deleting_codeset(&self, codeset: &Codeset);
}

/// The external source-code host that owns codesets, their webhooks, and the
/// deletion-event subscription list. Out of scope for this repo; consumed only through
/// this interface (see `wfcore-backends`).
#[async_trait]
pub trait CodesetStore: Send + Sync {
    async fn find(&self, project: &str, name: &str) -> Result<Codeset>;
    async fn get_all(&self, project: Option<&str>, label: Option<&str>) -> Result<Vec<Codeset>>;
    async fn add(&self, codeset: Codeset) -> Result<()>;
    /// Fires `CodesetSubscriber::on_deleting_codeset` on every current subscriber before
    /// removing the codeset.
    async fn delete(&self, project: &str, name: &str) -> Result<()>;
    async fn create_webhook(&self, codeset: &Codeset, url: &str) -> Result<i64>;
    async fn delete_webhook(&self, codeset: &Codeset, id: i64) -> Result<()>;
    async fn subscribe(&self, subscriber: Arc<dyn CodesetSubscriber>, codeset: &Codeset) -> Result<()>;
    async fn unsubscribe(&self, subscriber_id: &str, codeset: &Codeset) -> Result<()>;
}
