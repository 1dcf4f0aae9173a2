//! Reference `WorkflowBackend`/`CodesetStore` adapters. These collaborators sit outside
//! this repo's scope (execution engine, source-code host); everything here is a thin,
//! swappable edge — the coordination logic lives in `wfcore-workflow-manager`.

pub mod http;
pub mod memory;

pub use http::{HttpCodesetStore, HttpWorkflowBackend};
pub use memory::{MemoryCodesetStore, MemoryWorkflowBackend};
