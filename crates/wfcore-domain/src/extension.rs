use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::ids::Id;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointType {
    Internal,
    External,
}

impl Default for EndpointType {
    fn default() -> Self {
        Self::External
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialsScope {
    Global,
    Project,
    User,
}

impl Default for CredentialsScope {
    fn default() -> Self {
        Self::Global
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extension {
    pub id: Id,
    pub product: Arc<str>,
    pub version: Arc<str>,
    pub description: Arc<str>,
    pub zone: Arc<str>,
    pub configuration: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionService {
    pub extension_id: Id,
    pub id: Id,
    pub resource: Arc<str>,
    pub category: Arc<str>,
    pub description: Arc<str>,
    pub auth_required: bool,
    pub configuration: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionEndpoint {
    pub extension_id: Id,
    pub service_id: Id,
    pub url: Id,
    pub ty: EndpointType,
    pub configuration: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionCredentials {
    pub extension_id: Id,
    pub service_id: Id,
    pub id: Id,
    pub scope: CredentialsScope,
    pub default: bool,
    pub projects: HashSet<String>,
    pub users: HashSet<String>,
    pub configuration: HashMap<String, String>,
}

/// A full extension tree as accepted by `AddExtension`/`RegisterExtension`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionRecord {
    pub extension: Extension,
    pub services: Vec<ExtensionServiceRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionServiceRecord {
    pub service: ExtensionService,
    pub endpoints: Vec<ExtensionEndpoint>,
    pub credentials: Vec<ExtensionCredentials>,
}

/// Sparse query over the four-level extension hierarchy (`RunExtensionQuery`).
#[derive(Debug, Clone, Default)]
pub struct ExtensionQuery {
    pub extension_id: Option<Id>,
    pub product: Option<Arc<str>>,
    pub version_constraints: Option<Arc<str>>,
    pub zone: Option<Arc<str>>,
    pub strict_zone_match: bool,
    pub service_id: Option<Id>,
    pub service_resource: Option<Arc<str>>,
    pub service_category: Option<Arc<str>>,
    pub ty: Option<EndpointType>,
    pub credentials_scope: Option<CredentialsScope>,
}

/// One surviving tuple from `RunExtensionQuery`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionQueryMatch {
    pub extension: Extension,
    pub service: ExtensionService,
    pub endpoint: ExtensionEndpoint,
    pub credentials: Option<ExtensionCredentials>,
}

/// The resolved endpoint+credentials bundle a workflow step binds to at creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionAccess {
    pub extension: Extension,
    pub service: ExtensionService,
    pub endpoint: ExtensionEndpoint,
    pub credentials: Option<ExtensionCredentials>,
}

impl From<ExtensionQueryMatch> for ExtensionAccess {
    fn from(m: ExtensionQueryMatch) -> Self {
        Self {
            extension: m.extension,
            service: m.service,
            endpoint: m.endpoint,
            credentials: m.credentials,
        }
    }
}
