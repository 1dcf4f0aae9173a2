use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Opaque-to-the-core handle on a backend-provided webhook receiver for a workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listener {
    pub name: Arc<str>,
    pub available: bool,
    pub url: Arc<str>,
    pub dashboard_url: Arc<str>,
}
