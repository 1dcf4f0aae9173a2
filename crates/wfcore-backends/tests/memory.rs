use std::sync::Arc;
use std::time::Duration;

use wfcore_backends::{MemoryCodesetStore, MemoryWorkflowBackend};
use wfcore_domain::{Codeset, CodesetStore, CodesetSubscriber, Error, Workflow, WorkflowBackend};

#[tokio::test]
async fn create_workflow_rejects_duplicate_name() {
    let backend = MemoryWorkflowBackend::new();
    backend.create_workflow(&Workflow::new("wf", Vec::new())).await.unwrap();
    let err = backend.create_workflow(&Workflow::new("wf", Vec::new())).await.unwrap_err();
    assert!(matches!(err, Error::WorkflowExists(_)));
}

#[tokio::test]
async fn create_workflow_listener_is_idempotent() {
    let backend = MemoryWorkflowBackend::new();
    let one = backend.create_workflow_listener("wf", Duration::from_secs(1)).await.unwrap();
    let two = backend.create_workflow_listener("wf", Duration::from_secs(1)).await.unwrap();
    assert_eq!(one, two);
}

#[tokio::test]
async fn delete_workflow_listener_then_get_fails() {
    let backend = MemoryWorkflowBackend::new();
    backend.create_workflow_listener("wf", Duration::from_secs(1)).await.unwrap();
    backend.delete_workflow_listener("wf").await.unwrap();
    assert!(backend.get_workflow_listener("wf").await.is_err());
}

#[tokio::test]
async fn workflow_runs_accumulate_with_sequential_names_and_filter_by_status() {
    let backend = MemoryWorkflowBackend::new();
    let wf = Workflow::new("wf", Vec::new());
    let codeset = Codeset::new("p", "c", "https://git.example/c");
    backend.create_workflow_run("wf", &codeset).await.unwrap();
    backend.create_workflow_run("wf", &codeset).await.unwrap();

    let runs = backend.get_workflow_runs(&wf, None).await.unwrap();
    assert_eq!(runs.len(), 2);
    assert_eq!(runs[0].name.as_ref(), "wf-run-1");
    assert_eq!(runs[1].name.as_ref(), "wf-run-2");

    let filter = wfcore_domain::WorkflowRunFilter {
        workflow_name: None,
        status: Some(Arc::from("done")),
    };
    let filtered = backend.get_workflow_runs(&wf, Some(&filter)).await.unwrap();
    assert!(filtered.is_empty(), "no run carries status 'done' in this backend");
}

struct RecordingSubscriber {
    id: Arc<str>,
    notified: std::sync::atomic::AtomicBool,
}

#[async_trait::async_trait]
impl CodesetSubscriber for RecordingSubscriber {
    fn subscriber_id(&self) -> &str {
        &self.id
    }

    async fn on_deleting_codeset(&self, _codeset: &Codeset) {
        self.notified.store(true, std::sync::atomic::Ordering::SeqCst);
    }
}

#[tokio::test]
async fn deleting_a_codeset_notifies_subscribers_and_drops_its_webhooks() {
    let store = MemoryCodesetStore::new();
    let codeset = Codeset::new("p", "c", "https://git.example/c");
    store.add(codeset.clone()).await.unwrap();
    let webhook_id = store.create_webhook(&codeset, "https://core.example/hooks/1").await.unwrap();

    let subscriber = Arc::new(RecordingSubscriber {
        id: Arc::from("sub-1"),
        notified: std::sync::atomic::AtomicBool::new(false),
    });
    store.subscribe(subscriber.clone() as Arc<dyn CodesetSubscriber>, &codeset).await.unwrap();

    store.delete("p", "c").await.unwrap();

    assert!(subscriber.notified.load(std::sync::atomic::Ordering::SeqCst));
    assert!(store.find("p", "c").await.is_err());
    assert!(store.delete_webhook(&codeset, webhook_id).await.is_ok());
}

#[tokio::test]
async fn get_all_filters_by_project_and_label() {
    let store = MemoryCodesetStore::new();
    let mut c1 = Codeset::new("p1", "a", "https://git.example/a");
    c1.labels.insert("team".into(), "ml".into());
    let c2 = Codeset::new("p2", "b", "https://git.example/b");
    store.seed(c1).await;
    store.seed(c2).await;

    assert_eq!(store.get_all(Some("p1"), None).await.unwrap().len(), 1);
    assert_eq!(store.get_all(None, Some("team")).await.unwrap().len(), 1);
    assert_eq!(store.get_all(None, None).await.unwrap().len(), 2);
}

#[tokio::test]
async fn unsubscribe_removes_only_the_matching_subscriber() {
    let store = MemoryCodesetStore::new();
    let codeset = Codeset::new("p", "c", "https://git.example/c");
    store.add(codeset.clone()).await.unwrap();

    let a = Arc::new(RecordingSubscriber {
        id: Arc::from("a"),
        notified: std::sync::atomic::AtomicBool::new(false),
    });
    let b = Arc::new(RecordingSubscriber {
        id: Arc::from("b"),
        notified: std::sync::atomic::AtomicBool::new(false),
    });
    store.subscribe(a.clone() as Arc<dyn CodesetSubscriber>, &codeset).await.unwrap();
    store.subscribe(b.clone() as Arc<dyn CodesetSubscriber>, &codeset).await.unwrap();

    store.unsubscribe("a", &codeset).await.unwrap();
    store.delete("p", "c").await.unwrap();

    assert!(!a.notified.load(std::sync::atomic::Ordering::SeqCst));
    assert!(b.notified.load(std::sync::atomic::Ordering::SeqCst));
}
