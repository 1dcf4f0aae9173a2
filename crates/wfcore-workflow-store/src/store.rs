use std::collections::HashMap;

use tokio::sync::RwLock;
use tracing::debug;

use wfcore_domain::{CodesetAssignment, Error, Id, Result, Workflow};

struct Inner {
    workflows: HashMap<Id, Workflow>,
    /// Preserves registration order so `GetWorkflows(None)` and `GetWorkflowRuns` iterate
    /// in the order callers created workflows, not hashmap order.
    order: Vec<Id>,
    assignments: HashMap<Id, Vec<CodesetAssignment>>,
}

impl Default for Inner {
    fn default() -> Self {
        Self {
            workflows: HashMap::new(),
            order: Vec::new(),
            assignments: HashMap::new(),
        }
    }
}

/// `WorkflowName → Workflow` and `WorkflowName → ordered list of CodesetAssignment`.
#[derive(Default)]
pub struct WorkflowStore {
    inner: RwLock<Inner>,
}

impl WorkflowStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_workflow(&self, workflow: Workflow) -> Result<Workflow> {
        let mut inner = self.inner.write().await;
        if inner.workflows.contains_key(&workflow.name) {
            return Err(Error::WorkflowExists(workflow.name.to_string()));
        }
        inner.order.push(workflow.name.clone());
        inner.assignments.insert(workflow.name.clone(), Vec::new());
        inner.workflows.insert(workflow.name.clone(), workflow.clone());
        Ok(workflow)
    }

    pub async fn get_workflow(&self, name: &str) -> Result<Workflow> {
        let inner = self.inner.read().await;
        inner
            .workflows
            .get(name)
            .cloned()
            .ok_or_else(|| Error::WorkflowNotFound(name.to_string()))
    }

    /// `name_filter` is exact-match, not substring; `None` returns every workflow in
    /// registration order.
    pub async fn get_workflows(&self, name_filter: Option<&str>) -> Result<Vec<Workflow>> {
        let inner = self.inner.read().await;
        match name_filter {
            Some(name) => Ok(inner.workflows.get(name).cloned().into_iter().collect()),
            None => Ok(inner
                .order
                .iter()
                .filter_map(|name| inner.workflows.get(name).cloned())
                .collect()),
        }
    }

    /// Idempotent: deleting an unknown workflow succeeds silently.
    pub async fn delete_workflow(&self, name: &str) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.workflows.remove(name);
        inner.assignments.remove(name);
        inner.order.retain(|n| n.as_ref() != name);
        debug!(workflow = name, "deleted workflow from store");
        Ok(())
    }

    /// Adding a duplicate `(workflow, codeset)` pair is a no-op that refreshes the webhook
    /// ID on the existing entry, not an error — the manager relies on this for idempotent
    /// re-assignment.
    pub async fn add_codeset_assignment(&self, assignment: CodesetAssignment) -> Result<CodesetAssignment> {
        let mut inner = self.inner.write().await;
        let list = inner
            .assignments
            .entry(assignment.workflow_name.clone())
            .or_default();
        if let Some(existing) = list.iter_mut().find(|a| a.codeset == assignment.codeset) {
            existing.webhook_id = assignment.webhook_id;
            return Ok(existing.clone());
        }
        list.push(assignment.clone());
        Ok(assignment)
    }

    pub async fn get_codeset_assignment(
        &self,
        workflow_name: &str,
        project: &str,
        codeset_name: &str,
    ) -> Result<CodesetAssignment> {
        let inner = self.inner.read().await;
        inner
            .assignments
            .get(workflow_name)
            .and_then(|list| {
                list.iter()
                    .find(|a| a.codeset.project.as_ref() == project && a.codeset.name.as_ref() == codeset_name)
            })
            .cloned()
            .ok_or_else(|| {
                Error::WorkflowNotAssignedToCodeset(
                    workflow_name.to_string(),
                    project.to_string(),
                    codeset_name.to_string(),
                )
            })
    }

    pub async fn get_codeset_assignments(&self, workflow_name: &str) -> Result<Vec<CodesetAssignment>> {
        let inner = self.inner.read().await;
        Ok(inner.assignments.get(workflow_name).cloned().unwrap_or_default())
    }

    /// Returns a map keyed by workflow name, filtered by exact workflow name when given.
    pub async fn get_all_codeset_assignments(
        &self,
        workflow_filter: Option<&str>,
    ) -> Result<HashMap<Id, Vec<CodesetAssignment>>> {
        let inner = self.inner.read().await;
        match workflow_filter {
            Some(name) => Ok(inner
                .assignments
                .get(name)
                .map(|list| {
                    let mut map = HashMap::with_capacity(1);
                    map.insert(Id::from(name), list.clone());
                    map
                })
                .unwrap_or_default()),
            None => Ok(inner.assignments.clone()),
        }
    }

    pub async fn delete_codeset_assignment(&self, workflow_name: &str, project: &str, codeset_name: &str) -> Result<()> {
        let mut inner = self.inner.write().await;
        if let Some(list) = inner.assignments.get_mut(workflow_name) {
            list.retain(|a| !(a.codeset.project.as_ref() == project && a.codeset.name.as_ref() == codeset_name));
        }
        Ok(())
    }
}
