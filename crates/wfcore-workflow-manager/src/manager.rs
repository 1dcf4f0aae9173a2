use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, warn};
use uuid::Uuid;

use wfcore_domain::{
    Codeset, CodesetAssignment, CodesetStore, CodesetSubscriber, CredentialsScope, EndpointType,
    Error, ExtensionQuery, Id, Listener, Result, Workflow, WorkflowAssignmentStatus,
    WorkflowBackend, WorkflowRun, WorkflowRunFilter,
};
use wfcore_extension_registry::ExtensionRegistry;
use wfcore_workflow_store::WorkflowStore;

/// The internal deadline carried by `CreateWorkflowListener`; composed with (never replacing)
/// a shorter caller-supplied deadline.
const LISTENER_CREATION_TIMEOUT: Duration = Duration::from_secs(60);

fn listener_timeout(deadline: Option<Duration>) -> Duration {
    match deadline {
        Some(d) => d.min(LISTENER_CREATION_TIMEOUT),
        None => LISTENER_CREATION_TIMEOUT,
    }
}

async fn with_deadline<T>(deadline: Option<Duration>, fut: impl Future<Output = Result<T>>) -> Result<T> {
    match deadline {
        Some(d) => match tokio::time::timeout(d, fut).await {
            Ok(inner) => inner,
            Err(_) => Err(Error::DeadlineExceeded),
        },
        None => fut.await,
    }
}

/// The central coordinator: depends on a `WorkflowStore`, a `WorkflowBackend`, a
/// `CodesetStore` and an `ExtensionRegistry` (§4.4). Holds no long-lived lock of its own;
/// every compound operation is a sequence of suspension points, not a transaction.
pub struct WorkflowManager<B, C> {
    backend: Arc<B>,
    workflow_store: WorkflowStore,
    codeset_store: Arc<C>,
    extension_registry: Arc<ExtensionRegistry>,
    subscriber_id: Arc<str>,
}

impl<B, C> WorkflowManager<B, C>
where
    B: WorkflowBackend + 'static,
    C: CodesetStore + 'static,
{
    pub fn new(backend: Arc<B>, codeset_store: Arc<C>, extension_registry: Arc<ExtensionRegistry>) -> Arc<Self> {
        Arc::new(Self {
            backend,
            workflow_store: WorkflowStore::new(),
            codeset_store,
            extension_registry,
            subscriber_id: Arc::from(format!("workflow-manager-{}", Uuid::new_v4())),
        })
    }

    pub async fn create_workflow(&self, deadline: Option<Duration>, workflow: Workflow) -> Result<Workflow> {
        with_deadline(deadline, async {
            let mut workflow = workflow;
            workflow.created = Utc::now();
            self.resolve_extension_references(&mut workflow).await?;
            self.backend.create_workflow(&workflow).await?;
            self.workflow_store.add_workflow(workflow).await
        })
        .await
    }

    /// For each step's extension requirement, builds a zone-relaxed, global-credentials
    /// access query; fails with `ResolutionFailure` if nothing matches, otherwise prefers
    /// the first `Internal`-endpoint match over the first result (§4.4 step 2).
    async fn resolve_extension_references(&self, workflow: &mut Workflow) -> Result<()> {
        for step in &mut workflow.steps {
            for requirement in &mut step.extensions {
                let query = ExtensionQuery {
                    extension_id: requirement.query.extension_id.clone(),
                    product: requirement.query.product.clone(),
                    version_constraints: requirement.query.version_constraints.clone(),
                    zone: requirement.query.zone.clone(),
                    strict_zone_match: false,
                    service_id: requirement.query.service_id.clone(),
                    service_resource: requirement.query.service_resource.clone(),
                    service_category: requirement.query.service_category.clone(),
                    ty: None,
                    credentials_scope: Some(CredentialsScope::Global),
                };
                let candidates = self.extension_registry.run_extension_access_query(&query).await?;
                if candidates.is_empty() {
                    return Err(Error::ResolutionFailure {
                        step: step.name.to_string(),
                        requirement: requirement.name.to_string(),
                    });
                }
                let mut chosen = candidates[0].clone();
                for candidate in &candidates {
                    if candidate.endpoint.ty == EndpointType::Internal {
                        chosen = candidate.clone();
                        break;
                    }
                }
                requirement.extension_access = Some(chosen);
            }
        }
        Ok(())
    }

    pub async fn get_workflow(&self, deadline: Option<Duration>, name: &str) -> Result<Workflow> {
        with_deadline(deadline, self.workflow_store.get_workflow(name)).await
    }

    pub async fn get_workflows(&self, deadline: Option<Duration>, name_filter: Option<&str>) -> Result<Vec<Workflow>> {
        with_deadline(deadline, self.workflow_store.get_workflows(name_filter)).await
    }

    /// Unassigns every current codeset assignment, deletes the backend workflow, then
    /// removes the workflow from the store. A missing workflow is a no-op (idempotent).
    pub async fn delete_workflow(&self, deadline: Option<Duration>, name: &str) -> Result<()> {
        with_deadline(deadline, async {
            let assignments = self.workflow_store.get_codeset_assignments(name).await?;
            for assignment in assignments {
                self.unassign_from_codeset(
                    None,
                    name,
                    &assignment.codeset.project,
                    &assignment.codeset.name,
                )
                .await?;
            }
            self.backend.delete_workflow(name).await?;
            self.workflow_store.delete_workflow(name).await
        })
        .await
    }

    /// Returns `(Listener, Some(webhook_id))` on first assignment, or the existing pair
    /// unchanged on a repeat call for the same `(workflow, codeset)` — idempotent.
    pub async fn assign_to_codeset(
        self: &Arc<Self>,
        deadline: Option<Duration>,
        workflow_name: &str,
        project: &str,
        codeset_name: &str,
    ) -> Result<(Listener, Option<i64>)> {
        with_deadline(deadline, async {
            self.workflow_store.get_workflow(workflow_name).await?;
            let codeset = self.codeset_store.find(project, codeset_name).await?;

            let listener = self
                .backend
                .create_workflow_listener(workflow_name, listener_timeout(deadline))
                .await?;

            if let Ok(existing) = self
                .workflow_store
                .get_codeset_assignment(workflow_name, project, codeset_name)
                .await
            {
                return Ok((listener, existing.webhook_id));
            }

            let webhook_id = self.codeset_store.create_webhook(&codeset, &listener.url).await?;
            self.workflow_store
                .add_codeset_assignment(CodesetAssignment {
                    workflow_name: Id::from(workflow_name),
                    codeset: codeset.clone(),
                    webhook_id: Some(webhook_id),
                })
                .await?;
            self.codeset_store
                .subscribe(self.clone() as Arc<dyn CodesetSubscriber>, &codeset)
                .await?;
            self.backend.create_workflow_run(workflow_name, &codeset).await?;
            Ok((listener, Some(webhook_id)))
        })
        .await
    }

    /// The listener is torn down exactly when this was the last remaining assignment for
    /// the workflow. `Unsubscribe` is called unconditionally: subscription is scoped to
    /// `(subscriber, codeset)`, not `(workflow, codeset)`, so it must run every time.
    pub async fn unassign_from_codeset(
        &self,
        deadline: Option<Duration>,
        workflow_name: &str,
        project: &str,
        codeset_name: &str,
    ) -> Result<()> {
        with_deadline(deadline, async {
            let codeset = self.codeset_store.find(project, codeset_name).await?;
            let assignment = self
                .workflow_store
                .get_codeset_assignment(workflow_name, project, codeset_name)
                .await?;

            if let Some(webhook_id) = assignment.webhook_id {
                self.codeset_store.delete_webhook(&codeset, webhook_id).await?;
            }

            let remaining = self.workflow_store.get_codeset_assignments(workflow_name).await?;
            if remaining.len() == 1 {
                self.backend.delete_workflow_listener(workflow_name).await?;
            }

            self.workflow_store
                .delete_codeset_assignment(workflow_name, project, codeset_name)
                .await?;
            self.codeset_store.unsubscribe(&self.subscriber_id, &codeset).await?;
            Ok(())
        })
        .await
    }

    /// Never fails: an unavailable or absent listener just yields an empty status.
    pub async fn get_assignment_status(&self, deadline: Option<Duration>, workflow_name: &str) -> WorkflowAssignmentStatus {
        let fut = async {
            match self.backend.get_workflow_listener(workflow_name).await {
                Ok(listener) => Ok(WorkflowAssignmentStatus {
                    available: listener.available,
                    url: Some(listener.dashboard_url),
                }),
                Err(_) => Ok(WorkflowAssignmentStatus::default()),
            }
        };
        with_deadline(deadline, fut).await.unwrap_or_default()
    }

    pub async fn get_all_codeset_assignments(
        &self,
        deadline: Option<Duration>,
        workflow_filter: Option<&str>,
    ) -> Result<std::collections::HashMap<Id, Vec<CodesetAssignment>>> {
        with_deadline(deadline, self.workflow_store.get_all_codeset_assignments(workflow_filter)).await
    }

    /// Iterates the workflow set (filtered by `filter.workflow_name` if present) and
    /// concatenates backend runs in workflow-insertion order; the first backend error
    /// aborts the whole call.
    pub async fn get_workflow_runs(
        &self,
        deadline: Option<Duration>,
        filter: Option<&WorkflowRunFilter>,
    ) -> Result<Vec<WorkflowRun>> {
        with_deadline(deadline, async {
            let name_filter = filter.and_then(|f| f.workflow_name.as_deref());
            let workflows = self.workflow_store.get_workflows(name_filter).await?;
            let mut runs = Vec::new();
            for workflow in &workflows {
                runs.extend(self.backend.get_workflow_runs(workflow, filter).await?);
            }
            Ok(runs)
        })
        .await
    }
}

#[async_trait]
impl<B, C> CodesetSubscriber for WorkflowManager<B, C>
where
    B: WorkflowBackend + 'static,
    C: CodesetStore + 'static,
{
    fn subscriber_id(&self) -> &str {
        &self.subscriber_id
    }

    /// Best-effort cleanup: every workflow currently known gets an unassignment attempt
    /// against this codeset, and failures are swallowed so the deletion pipeline is never
    /// blocked by one stuck workflow.
    async fn on_deleting_codeset(&self, codeset: &Codeset) {
        let workflows = match self.workflow_store.get_workflows(None).await {
            Ok(workflows) => workflows,
            Err(err) => {
                warn!(error = %err, "failed to list workflows while handling codeset deletion");
                return;
            }
        };
        for workflow in workflows {
            if let Err(err) = self
                .unassign_from_codeset(None, &workflow.name, &codeset.project, &codeset.name)
                .await
            {
                debug!(workflow = %workflow.name, codeset = %codeset.name, error = %err, "ignoring unassign failure during codeset deletion");
            }
        }
    }
}
