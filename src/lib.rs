#[cfg(feature = "domain")]
pub use wfcore_domain as domain;

#[cfg(feature = "extension-store")]
pub use wfcore_extension_store as extension_store;

#[cfg(feature = "extension-registry")]
pub use wfcore_extension_registry as extension_registry;

#[cfg(feature = "workflow-store")]
pub use wfcore_workflow_store as workflow_store;

#[cfg(feature = "workflow-manager")]
pub use wfcore_workflow_manager as workflow_manager;

#[cfg(feature = "backends")]
pub use wfcore_backends as backends;

#[cfg(feature = "server")]
pub use wfcore_server as server;
