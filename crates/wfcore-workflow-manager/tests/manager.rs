mod common;

use std::sync::Arc;

use common::{FakeBackend, FakeCodesetStore};
use wfcore_domain::{
    Codeset, CodesetStore, CredentialsScope, EndpointType, Error, Extension, ExtensionCredentials,
    ExtensionEndpoint, ExtensionRecord, ExtensionService, ExtensionServiceRecord, Workflow,
    WorkflowStep,
};
use wfcore_extension_registry::ExtensionRegistry;
use wfcore_workflow_manager::WorkflowManager;

fn manager() -> (
    Arc<WorkflowManager<FakeBackend, FakeCodesetStore>>,
    Arc<FakeBackend>,
    Arc<FakeCodesetStore>,
) {
    let backend = Arc::new(FakeBackend::new());
    let codesets = Arc::new(FakeCodesetStore::new());
    let registry = Arc::new(ExtensionRegistry::new());
    let mgr = WorkflowManager::new(backend.clone(), codesets.clone(), registry);
    (mgr, backend, codesets)
}

/// Scenario C: assign, re-assign (idempotent), unassign.
#[tokio::test]
async fn scenario_c_assign_reassign_then_unassign() {
    let (mgr, backend, codesets) = manager();
    codesets.add_codeset(Codeset::new("p", "c", "https://git.example/c"));
    mgr.create_workflow(None, Workflow::new("wf", Vec::new())).await.unwrap();

    let (listener1, webhook1) = mgr.assign_to_codeset(None, "wf", "p", "c").await.unwrap();
    assert!(listener1.available);
    assert!(webhook1.is_some());
    assert_eq!(codesets.webhook_count(), 1);
    assert_eq!(backend.run_count("wf"), 1);

    let (listener2, webhook2) = mgr.assign_to_codeset(None, "wf", "p", "c").await.unwrap();
    assert_eq!(listener1, listener2);
    assert_eq!(webhook1, webhook2);
    assert_eq!(codesets.webhook_count(), 1);
    assert_eq!(backend.run_count("wf"), 1);

    mgr.unassign_from_codeset(None, "wf", "p", "c").await.unwrap();
    assert_eq!(codesets.webhook_count(), 0);
    assert!(!backend.has_listener("wf"));
    assert_eq!(backend.listener_delete_count("wf"), 1);
}

/// Scenario D: two workflows assigned to the same codeset; deleting the codeset tears
/// down both assignments and both listeners.
#[tokio::test]
async fn scenario_d_codeset_deletion_cascades_to_all_workflows() {
    let (mgr, backend, codesets) = manager();
    codesets.add_codeset(Codeset::new("p", "c", "https://git.example/c"));
    mgr.create_workflow(None, Workflow::new("wf1", Vec::new())).await.unwrap();
    mgr.create_workflow(None, Workflow::new("wf2", Vec::new())).await.unwrap();

    mgr.assign_to_codeset(None, "wf1", "p", "c").await.unwrap();
    mgr.assign_to_codeset(None, "wf2", "p", "c").await.unwrap();
    assert_eq!(codesets.subscriber_count("p", "c"), 2);

    codesets.delete("p", "c").await.unwrap();

    assert_eq!(backend.listener_delete_count("wf1"), 1);
    assert_eq!(backend.listener_delete_count("wf2"), 1);
    assert_eq!(codesets.subscriber_count("p", "c"), 0);
}

/// Scenario E: an unresolvable step extension requirement fails CreateWorkflow and leaves
/// the store untouched.
#[tokio::test]
async fn scenario_e_unresolvable_requirement_fails_creation() {
    let (mgr, _backend, _codesets) = manager();

    let mut step = WorkflowStep {
        name: "train".into(),
        extensions: vec![Default::default()],
    };
    step.extensions[0].name = "missing-ext".into();
    step.extensions[0].query.product = Some("missing".into());

    let err = mgr.create_workflow(None, Workflow::new("wf", vec![step])).await.unwrap_err();
    assert!(matches!(err, Error::ResolutionFailure { .. }));
    assert!(mgr.get_workflow(None, "wf").await.is_err());
}

/// Property 8: deleting a workflow tears down its assignment, its listener, and the
/// manager's subscription to the codeset.
#[tokio::test]
async fn property_delete_workflow_cascades_assignments() {
    let (mgr, backend, codesets) = manager();
    codesets.add_codeset(Codeset::new("p", "c", "https://git.example/c"));
    mgr.create_workflow(None, Workflow::new("wf", Vec::new())).await.unwrap();
    mgr.assign_to_codeset(None, "wf", "p", "c").await.unwrap();

    mgr.delete_workflow(None, "wf").await.unwrap();

    assert_eq!(backend.listener_delete_count("wf"), 1);
    assert_eq!(codesets.subscriber_count("p", "c"), 0);
    assert!(mgr.get_workflow(None, "wf").await.is_err());
}

/// `DeleteWorkflow` on a missing workflow is success, not error (idempotent).
#[tokio::test]
async fn delete_workflow_on_unknown_name_is_idempotent() {
    let (mgr, _backend, _codesets) = manager();
    mgr.delete_workflow(None, "does-not-exist").await.unwrap();
}

/// Property 10: the listener is deleted exactly when the last assignment for a workflow
/// is removed, never before.
#[tokio::test]
async fn property_listener_teardown_timing() {
    let (mgr, backend, codesets) = manager();
    codesets.add_codeset(Codeset::new("p", "c1", "https://git.example/c1"));
    codesets.add_codeset(Codeset::new("p", "c2", "https://git.example/c2"));
    mgr.create_workflow(None, Workflow::new("wf", Vec::new())).await.unwrap();

    mgr.assign_to_codeset(None, "wf", "p", "c1").await.unwrap();
    mgr.assign_to_codeset(None, "wf", "p", "c2").await.unwrap();
    assert!(backend.has_listener("wf"));

    mgr.unassign_from_codeset(None, "wf", "p", "c1").await.unwrap();
    assert!(backend.has_listener("wf"), "listener must survive while another assignment remains");
    assert_eq!(backend.listener_delete_count("wf"), 0);

    mgr.unassign_from_codeset(None, "wf", "p", "c2").await.unwrap();
    assert!(!backend.has_listener("wf"));
    assert_eq!(backend.listener_delete_count("wf"), 1);
}

/// Property 6, driven through the manager's own selection branch (not just the
/// registry's raw query): `resolve_extension_references` must pick the Internal
/// endpoint when a step's requirement matches both an Internal and an External one.
#[tokio::test]
async fn create_workflow_resolves_internal_endpoint_over_external() {
    let backend = Arc::new(FakeBackend::new());
    let codesets = Arc::new(FakeCodesetStore::new());
    let registry = Arc::new(ExtensionRegistry::new());

    let record = ExtensionRecord {
        extension: Extension {
            id: Arc::from("x"),
            product: Arc::from("p"),
            version: Arc::from("1.0"),
            description: Arc::from(""),
            zone: Arc::from("z"),
            configuration: Default::default(),
        },
        services: vec![ExtensionServiceRecord {
            service: ExtensionService {
                extension_id: Arc::from("x"),
                id: Arc::from("s"),
                resource: Arc::from("svc"),
                category: Arc::from("cat"),
                description: Default::default(),
                auth_required: true,
                configuration: Default::default(),
            },
            endpoints: vec![
                ExtensionEndpoint {
                    extension_id: Arc::from("x"),
                    service_id: Arc::from("s"),
                    url: Arc::from("https://e"),
                    ty: EndpointType::External,
                    configuration: Default::default(),
                },
                ExtensionEndpoint {
                    extension_id: Arc::from("x"),
                    service_id: Arc::from("s"),
                    url: Arc::from("https://i"),
                    ty: EndpointType::Internal,
                    configuration: Default::default(),
                },
            ],
            credentials: vec![ExtensionCredentials {
                extension_id: Arc::from("x"),
                service_id: Arc::from("s"),
                id: Arc::from("c"),
                scope: CredentialsScope::Global,
                default: true,
                projects: Default::default(),
                users: Default::default(),
                configuration: Default::default(),
            }],
        }],
    };
    registry.register_extension(record).await.unwrap();

    let mgr = WorkflowManager::new(backend, codesets, registry);

    let mut step = WorkflowStep {
        name: "train".into(),
        extensions: vec![Default::default()],
    };
    step.extensions[0].name = "model-registry".into();
    step.extensions[0].query.product = Some(Arc::from("p"));

    let workflow = mgr.create_workflow(None, Workflow::new("wf", vec![step])).await.unwrap();
    let resolved = workflow.steps[0].extensions[0].extension_access.as_ref().unwrap();
    assert_eq!(resolved.endpoint.ty, EndpointType::Internal);
    assert_eq!(resolved.endpoint.url.as_ref(), "https://i");
}

#[tokio::test]
async fn get_assignment_status_never_fails_on_missing_listener() {
    let (mgr, _backend, _codesets) = manager();
    mgr.create_workflow(None, Workflow::new("wf", Vec::new())).await.unwrap();
    let status = mgr.get_assignment_status(None, "wf").await;
    assert!(!status.available);
    assert!(status.url.is_none());
}
