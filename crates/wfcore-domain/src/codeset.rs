use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// A reference to a source-code repository identified by `(Project, Name)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Codeset {
    pub project: Arc<str>,
    pub name: Arc<str>,
    pub url: Arc<str>,
    pub labels: HashMap<String, String>,
}

impl Codeset {
    pub fn new(project: impl Into<Arc<str>>, name: impl Into<Arc<str>>, url: impl Into<Arc<str>>) -> Self {
        Self {
            project: project.into(),
            name: name.into(),
            url: url.into(),
            labels: HashMap::new(),
        }
    }
}
