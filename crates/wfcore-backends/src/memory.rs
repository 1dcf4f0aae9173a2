//! Deterministic in-process `WorkflowBackend`/`CodesetStore` adapters: no network calls, no
//! external engine. Useful for embedding the coordination core standalone and for tests
//! that exercise the manager without a real execution engine or source-code host.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use wfcore_domain::{
    Codeset, CodesetStore, CodesetSubscriber, Error, Listener, Result, Workflow, WorkflowBackend,
    WorkflowRun, WorkflowRunFilter,
};

#[derive(Default)]
struct WorkflowState {
    created: HashSet<String>,
    listeners: HashMap<String, Listener>,
    runs: HashMap<String, Vec<WorkflowRun>>,
    run_seq: HashMap<String, u64>,
}

/// An execution engine stand-in: workflows "run" instantly and listeners are always
/// available once created.
#[derive(Default)]
pub struct MemoryWorkflowBackend {
    state: Mutex<WorkflowState>,
}

impl MemoryWorkflowBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WorkflowBackend for MemoryWorkflowBackend {
    async fn create_workflow(&self, wf: &Workflow) -> Result<()> {
        let mut state = self.state.lock().await;
        if !state.created.insert(wf.name.to_string()) {
            return Err(Error::WorkflowExists(wf.name.to_string()));
        }
        debug!(workflow = %wf.name, "created in-memory workflow");
        Ok(())
    }

    async fn delete_workflow(&self, name: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        state.created.remove(name);
        state.listeners.remove(name);
        state.runs.remove(name);
        Ok(())
    }

    async fn create_workflow_run(&self, name: &str, codeset: &Codeset) -> Result<()> {
        let mut state = self.state.lock().await;
        let seq = state.run_seq.entry(name.to_string()).or_insert(0);
        *seq += 1;
        let run = WorkflowRun {
            workflow_name: Arc::from(name),
            name: Arc::from(format!("{name}-run-{seq}")),
            codeset: codeset.clone(),
            status: Arc::from("running"),
            started: Some(chrono_now()),
        };
        state.runs.entry(name.to_string()).or_default().push(run);
        Ok(())
    }

    async fn get_workflow_runs(&self, workflow: &Workflow, filter: Option<&WorkflowRunFilter>) -> Result<Vec<WorkflowRun>> {
        let state = self.state.lock().await;
        let runs = state.runs.get(workflow.name.as_ref()).cloned().unwrap_or_default();
        Ok(match filter.and_then(|f| f.status.as_deref()) {
            Some(status) => runs.into_iter().filter(|r| r.status.as_ref() == status).collect(),
            None => runs,
        })
    }

    async fn create_workflow_listener(&self, name: &str, _timeout: Duration) -> Result<Listener> {
        let mut state = self.state.lock().await;
        let listener = state.listeners.entry(name.to_string()).or_insert_with(|| Listener {
            name: Arc::from(name),
            available: true,
            url: Arc::from(format!("memory://listener/{name}")),
            dashboard_url: Arc::from(format!("memory://dashboard/{name}")),
        });
        Ok(listener.clone())
    }

    async fn delete_workflow_listener(&self, name: &str) -> Result<()> {
        self.state.lock().await.listeners.remove(name);
        Ok(())
    }

    async fn get_workflow_listener(&self, name: &str) -> Result<Listener> {
        self.state
            .lock()
            .await
            .listeners
            .get(name)
            .cloned()
            .ok_or_else(|| Error::InvalidArgument(format!("no listener for workflow '{name}'")))
    }
}

fn chrono_now() -> chrono::DateTime<chrono::Utc> {
    chrono::Utc::now()
}

type CodesetKey = (String, String);

#[derive(Default)]
struct CodesetState {
    codesets: HashMap<CodesetKey, Codeset>,
    webhooks: HashMap<i64, CodesetKey>,
    next_webhook: i64,
    subscribers: HashMap<CodesetKey, Vec<Arc<dyn CodesetSubscriber>>>,
}

/// A source-code host stand-in: codesets live purely in memory, webhooks are opaque
/// incrementing IDs, and deletion fires every subscriber before the codeset disappears.
#[derive(Default)]
pub struct MemoryCodesetStore {
    state: Mutex<CodesetState>,
}

impl MemoryCodesetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed(&self, codeset: Codeset) {
        let key = (codeset.project.to_string(), codeset.name.to_string());
        self.state.lock().await.codesets.insert(key, codeset);
    }
}

#[async_trait]
impl CodesetStore for MemoryCodesetStore {
    async fn find(&self, project: &str, name: &str) -> Result<Codeset> {
        self.state
            .lock()
            .await
            .codesets
            .get(&(project.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| Error::CodesetNotFound(project.to_string(), name.to_string()))
    }

    async fn get_all(&self, project: Option<&str>, label: Option<&str>) -> Result<Vec<Codeset>> {
        let state = self.state.lock().await;
        Ok(state
            .codesets
            .values()
            .filter(|c| project.is_none_or(|p| c.project.as_ref() == p))
            .filter(|c| label.is_none_or(|l| c.labels.contains_key(l)))
            .cloned()
            .collect())
    }

    async fn add(&self, codeset: Codeset) -> Result<()> {
        self.seed(codeset).await;
        Ok(())
    }

    async fn delete(&self, project: &str, name: &str) -> Result<()> {
        let key = (project.to_string(), name.to_string());
        let (codeset, subscribers) = {
            let state = self.state.lock().await;
            (
                state.codesets.get(&key).cloned(),
                state.subscribers.get(&key).cloned().unwrap_or_default(),
            )
        };
        if let Some(codeset) = codeset {
            for subscriber in subscribers {
                subscriber.on_deleting_codeset(&codeset).await;
            }
        }
        let mut state = self.state.lock().await;
        state.codesets.remove(&key);
        state.subscribers.remove(&key);
        state.webhooks.retain(|_, k| k != &key);
        Ok(())
    }

    async fn create_webhook(&self, codeset: &Codeset, _url: &str) -> Result<i64> {
        let mut state = self.state.lock().await;
        state.next_webhook += 1;
        let id = state.next_webhook;
        let key = (codeset.project.to_string(), codeset.name.to_string());
        state.webhooks.insert(id, key);
        Ok(id)
    }

    async fn delete_webhook(&self, _codeset: &Codeset, id: i64) -> Result<()> {
        self.state.lock().await.webhooks.remove(&id);
        Ok(())
    }

    async fn subscribe(&self, subscriber: Arc<dyn CodesetSubscriber>, codeset: &Codeset) -> Result<()> {
        let key = (codeset.project.to_string(), codeset.name.to_string());
        self.state.lock().await.subscribers.entry(key).or_default().push(subscriber);
        Ok(())
    }

    async fn unsubscribe(&self, subscriber_id: &str, codeset: &Codeset) -> Result<()> {
        let key = (codeset.project.to_string(), codeset.name.to_string());
        if let Some(list) = self.state.lock().await.subscribers.get_mut(&key) {
            list.retain(|s| s.subscriber_id() != subscriber_id);
        }
        Ok(())
    }
}
