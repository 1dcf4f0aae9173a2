use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use wfcore_domain::{
    Codeset, CodesetStore, CodesetSubscriber, Error, Listener, Result, Workflow, WorkflowBackend,
    WorkflowRun, WorkflowRunFilter,
};

#[derive(Default)]
struct BackendState {
    created_workflows: HashSet<String>,
    deleted_workflows: HashSet<String>,
    listeners: HashMap<String, Listener>,
    listener_delete_count: HashMap<String, u32>,
    run_counts: HashMap<String, u32>,
    runs: HashMap<String, Vec<WorkflowRun>>,
}

#[derive(Default)]
pub struct FakeBackend {
    state: Mutex<BackendState>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn run_count(&self, workflow_name: &str) -> u32 {
        self.state.lock().unwrap().run_counts.get(workflow_name).copied().unwrap_or(0)
    }

    pub fn listener_delete_count(&self, workflow_name: &str) -> u32 {
        self.state.lock().unwrap().listener_delete_count.get(workflow_name).copied().unwrap_or(0)
    }

    pub fn has_listener(&self, workflow_name: &str) -> bool {
        self.state.lock().unwrap().listeners.contains_key(workflow_name)
    }
}

#[async_trait]
impl WorkflowBackend for FakeBackend {
    async fn create_workflow(&self, wf: &Workflow) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if !state.created_workflows.insert(wf.name.to_string()) {
            return Err(Error::WorkflowExists(wf.name.to_string()));
        }
        Ok(())
    }

    async fn delete_workflow(&self, name: &str) -> Result<()> {
        self.state.lock().unwrap().deleted_workflows.insert(name.to_string());
        Ok(())
    }

    async fn create_workflow_run(&self, name: &str, codeset: &Codeset) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let count = state.run_counts.entry(name.to_string()).or_insert(0);
        *count += 1;
        let run_name: Arc<str> = Arc::from(format!("{name}-run-{count}"));
        state.runs.entry(name.to_string()).or_default().push(WorkflowRun {
            workflow_name: Arc::from(name),
            name: run_name,
            codeset: codeset.clone(),
            status: Arc::from("running"),
            started: None,
        });
        Ok(())
    }

    async fn get_workflow_runs(&self, workflow: &Workflow, _filter: Option<&WorkflowRunFilter>) -> Result<Vec<WorkflowRun>> {
        Ok(self.state.lock().unwrap().runs.get(workflow.name.as_ref()).cloned().unwrap_or_default())
    }

    async fn create_workflow_listener(&self, name: &str, _timeout: Duration) -> Result<Listener> {
        let mut state = self.state.lock().unwrap();
        let listener = state.listeners.entry(name.to_string()).or_insert_with(|| Listener {
            name: Arc::from(name),
            available: true,
            url: Arc::from(format!("https://listener.internal/{name}")),
            dashboard_url: Arc::from(format!("https://dashboard.internal/{name}")),
        });
        Ok(listener.clone())
    }

    async fn delete_workflow_listener(&self, name: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.listeners.remove(name);
        *state.listener_delete_count.entry(name.to_string()).or_insert(0) += 1;
        Ok(())
    }

    async fn get_workflow_listener(&self, name: &str) -> Result<Listener> {
        self.state
            .lock()
            .unwrap()
            .listeners
            .get(name)
            .cloned()
            .ok_or_else(|| Error::InvalidArgument(format!("no listener for '{name}'")))
    }
}

type CodesetKey = (String, String);

#[derive(Default)]
struct CodesetState {
    codesets: HashMap<CodesetKey, Codeset>,
    webhooks: HashSet<i64>,
    next_webhook: i64,
    subscribers: HashMap<CodesetKey, Vec<Arc<dyn CodesetSubscriber>>>,
}

#[derive(Default)]
pub struct FakeCodesetStore {
    state: Mutex<CodesetState>,
}

impl FakeCodesetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_codeset(&self, codeset: Codeset) {
        let key = (codeset.project.to_string(), codeset.name.to_string());
        self.state.lock().unwrap().codesets.insert(key, codeset);
    }

    pub fn webhook_count(&self) -> usize {
        self.state.lock().unwrap().webhooks.len()
    }

    pub fn subscriber_count(&self, project: &str, name: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .subscribers
            .get(&(project.to_string(), name.to_string()))
            .map(Vec::len)
            .unwrap_or(0)
    }
}

#[async_trait]
impl CodesetStore for FakeCodesetStore {
    async fn find(&self, project: &str, name: &str) -> Result<Codeset> {
        self.state
            .lock()
            .unwrap()
            .codesets
            .get(&(project.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| Error::CodesetNotFound(project.to_string(), name.to_string()))
    }

    async fn get_all(&self, project: Option<&str>, _label: Option<&str>) -> Result<Vec<Codeset>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .codesets
            .values()
            .filter(|c| project.is_none_or(|p| c.project.as_ref() == p))
            .cloned()
            .collect())
    }

    async fn add(&self, codeset: Codeset) -> Result<()> {
        self.add_codeset(codeset);
        Ok(())
    }

    async fn delete(&self, project: &str, name: &str) -> Result<()> {
        let key = (project.to_string(), name.to_string());
        let (codeset, subscribers) = {
            let state = self.state.lock().unwrap();
            (state.codesets.get(&key).cloned(), state.subscribers.get(&key).cloned().unwrap_or_default())
        };
        if let Some(codeset) = codeset {
            for subscriber in subscribers {
                subscriber.on_deleting_codeset(&codeset).await;
            }
        }
        let mut state = self.state.lock().unwrap();
        state.codesets.remove(&key);
        state.subscribers.remove(&key);
        Ok(())
    }

    async fn create_webhook(&self, _codeset: &Codeset, _url: &str) -> Result<i64> {
        let mut state = self.state.lock().unwrap();
        state.next_webhook += 1;
        let id = state.next_webhook;
        state.webhooks.insert(id);
        Ok(id)
    }

    async fn delete_webhook(&self, _codeset: &Codeset, id: i64) -> Result<()> {
        self.state.lock().unwrap().webhooks.remove(&id);
        Ok(())
    }

    async fn subscribe(&self, subscriber: Arc<dyn CodesetSubscriber>, codeset: &Codeset) -> Result<()> {
        let key = (codeset.project.to_string(), codeset.name.to_string());
        self.state.lock().unwrap().subscribers.entry(key).or_default().push(subscriber);
        Ok(())
    }

    async fn unsubscribe(&self, subscriber_id: &str, codeset: &Codeset) -> Result<()> {
        let key = (codeset.project.to_string(), codeset.name.to_string());
        if let Some(list) = self.state.lock().unwrap().subscribers.get_mut(&key) {
            list.retain(|s| s.subscriber_id() != subscriber_id);
        }
        Ok(())
    }
}
