//! Thin `reqwest`-based adapters over a REST execution engine and source-code host. Both
//! collaborators are out of this repo's scope (§6); these adapters only translate the
//! domain traits into HTTP calls and responses back into domain types.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use wfcore_domain::{
    Codeset, CodesetStore, CodesetSubscriber, Error, Listener, Result, Workflow, WorkflowBackend,
    WorkflowRun, WorkflowRunFilter,
};

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status == reqwest::StatusCode::CONFLICT {
        let text = response.text().await.unwrap_or_default();
        return Err(Error::backend(anyhow::anyhow!("conflict: {text}")));
    }
    if status == reqwest::StatusCode::NOT_FOUND {
        let text = response.text().await.unwrap_or_default();
        return Err(Error::backend(anyhow::anyhow!("not found: {text}")));
    }
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(Error::backend(anyhow::anyhow!("http {status}: {text}")));
    }
    Ok(response)
}

/// HTTP-backed `WorkflowBackend`, pointed at an execution engine's REST API.
pub struct HttpWorkflowBackend {
    base_url: Arc<str>,
    client: reqwest::Client,
}

impl HttpWorkflowBackend {
    pub fn new(base_url: impl Into<Arc<str>>, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into(),
            client,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl WorkflowBackend for HttpWorkflowBackend {
    async fn create_workflow(&self, wf: &Workflow) -> Result<()> {
        let response = self
            .client
            .post(self.url("/workflows"))
            .json(wf)
            .send()
            .await
            .map_err(Error::backend)?;
        check_status(response).await?;
        Ok(())
    }

    async fn delete_workflow(&self, name: &str) -> Result<()> {
        let response = self
            .client
            .delete(self.url(&format!("/workflows/{name}")))
            .send()
            .await
            .map_err(Error::backend)?;
        check_status(response).await?;
        Ok(())
    }

    async fn create_workflow_run(&self, name: &str, codeset: &Codeset) -> Result<()> {
        let response = self
            .client
            .post(self.url(&format!("/workflows/{name}/runs")))
            .json(codeset)
            .send()
            .await
            .map_err(Error::backend)?;
        check_status(response).await?;
        Ok(())
    }

    async fn get_workflow_runs(&self, workflow: &Workflow, filter: Option<&WorkflowRunFilter>) -> Result<Vec<WorkflowRun>> {
        let mut request = self.client.get(self.url(&format!("/workflows/{}/runs", workflow.name)));
        if let Some(status) = filter.and_then(|f| f.status.as_deref()) {
            request = request.query(&[("status", status)]);
        }
        let response = request.send().await.map_err(Error::backend)?;
        check_status(response)
            .await?
            .json::<Vec<WorkflowRun>>()
            .await
            .map_err(Error::backend)
    }

    async fn create_workflow_listener(&self, name: &str, timeout: Duration) -> Result<Listener> {
        #[derive(Serialize)]
        struct Body {
            timeout_seconds: u64,
        }
        let response = self
            .client
            .post(self.url(&format!("/workflows/{name}/listener")))
            .timeout(timeout)
            .json(&Body {
                timeout_seconds: timeout.as_secs(),
            })
            .send()
            .await
            .map_err(Error::backend)?;
        check_status(response).await?.json::<Listener>().await.map_err(Error::backend)
    }

    async fn delete_workflow_listener(&self, name: &str) -> Result<()> {
        let response = self
            .client
            .delete(self.url(&format!("/workflows/{name}/listener")))
            .send()
            .await
            .map_err(Error::backend)?;
        check_status(response).await?;
        Ok(())
    }

    async fn get_workflow_listener(&self, name: &str) -> Result<Listener> {
        let response = self
            .client
            .get(self.url(&format!("/workflows/{name}/listener")))
            .send()
            .await
            .map_err(Error::backend)?;
        check_status(response).await?.json::<Listener>().await.map_err(Error::backend)
    }
}

#[derive(Deserialize)]
struct WebhookCreated {
    id: i64,
}

/// HTTP-backed `CodesetStore`, pointed at a source-code host's REST API.
///
/// `subscribe`/`unsubscribe` have no HTTP transport here: delivering a remote webhook
/// event back into a local `CodesetSubscriber` trait object needs an out-of-band receiver
/// (this core's own inbound webhook endpoint calling `on_deleting_codeset` directly), which
/// is outside this adapter's scope. Calls succeed but only log; wire up a receiver alongside
/// this adapter if upstream deletion notifications are required.
pub struct HttpCodesetStore {
    base_url: Arc<str>,
    client: reqwest::Client,
}

impl HttpCodesetStore {
    pub fn new(base_url: impl Into<Arc<str>>, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into(),
            client,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl CodesetStore for HttpCodesetStore {
    async fn find(&self, project: &str, name: &str) -> Result<Codeset> {
        let response = self
            .client
            .get(self.url(&format!("/codesets/{project}/{name}")))
            .send()
            .await
            .map_err(Error::backend)?;
        check_status(response).await?.json::<Codeset>().await.map_err(Error::backend)
    }

    async fn get_all(&self, project: Option<&str>, label: Option<&str>) -> Result<Vec<Codeset>> {
        let mut request = self.client.get(self.url("/codesets"));
        let mut query = Vec::new();
        if let Some(project) = project {
            query.push(("project", project));
        }
        if let Some(label) = label {
            query.push(("label", label));
        }
        if !query.is_empty() {
            request = request.query(&query);
        }
        let response = request.send().await.map_err(Error::backend)?;
        check_status(response)
            .await?
            .json::<Vec<Codeset>>()
            .await
            .map_err(Error::backend)
    }

    async fn add(&self, codeset: Codeset) -> Result<()> {
        let response = self
            .client
            .post(self.url("/codesets"))
            .json(&codeset)
            .send()
            .await
            .map_err(Error::backend)?;
        check_status(response).await?;
        Ok(())
    }

    async fn delete(&self, project: &str, name: &str) -> Result<()> {
        let response = self
            .client
            .delete(self.url(&format!("/codesets/{project}/{name}")))
            .send()
            .await
            .map_err(Error::backend)?;
        check_status(response).await?;
        Ok(())
    }

    async fn create_webhook(&self, codeset: &Codeset, url: &str) -> Result<i64> {
        #[derive(Serialize)]
        struct Body<'a> {
            url: &'a str,
        }
        let response = self
            .client
            .post(self.url(&format!("/codesets/{}/{}/webhooks", codeset.project, codeset.name)))
            .json(&Body { url })
            .send()
            .await
            .map_err(Error::backend)?;
        Ok(check_status(response)
            .await?
            .json::<WebhookCreated>()
            .await
            .map_err(Error::backend)?
            .id)
    }

    async fn delete_webhook(&self, codeset: &Codeset, id: i64) -> Result<()> {
        let response = self
            .client
            .delete(self.url(&format!("/codesets/{}/{}/webhooks/{id}", codeset.project, codeset.name)))
            .send()
            .await
            .map_err(Error::backend)?;
        check_status(response).await?;
        Ok(())
    }

    async fn subscribe(&self, subscriber: Arc<dyn CodesetSubscriber>, codeset: &Codeset) -> Result<()> {
        warn!(
            subscriber_id = subscriber.subscriber_id(),
            codeset = %codeset.name,
            "HTTP codeset store has no transport for push subscriptions; wire up an inbound webhook receiver instead"
        );
        Ok(())
    }

    async fn unsubscribe(&self, subscriber_id: &str, codeset: &Codeset) -> Result<()> {
        warn!(subscriber_id, codeset = %codeset.name, "no-op unsubscribe on HTTP codeset store");
        Ok(())
    }
}
