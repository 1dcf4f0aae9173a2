use std::sync::Arc;

/// String identifiers are `Arc<str>` throughout: cheap to clone across store layers and
/// across the many small structs that reference a parent by id.
pub type Id = Arc<str>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExtensionServiceId {
    pub extension_id: Id,
    pub id: Id,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExtensionEndpointId {
    pub extension_id: Id,
    pub service_id: Id,
    pub url: Id,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExtensionCredentialsId {
    pub extension_id: Id,
    pub service_id: Id,
    pub id: Id,
}

impl ExtensionServiceId {
    pub fn new(extension_id: impl Into<Id>, id: impl Into<Id>) -> Self {
        Self {
            extension_id: extension_id.into(),
            id: id.into(),
        }
    }
}

impl ExtensionEndpointId {
    pub fn new(extension_id: impl Into<Id>, service_id: impl Into<Id>, url: impl Into<Id>) -> Self {
        Self {
            extension_id: extension_id.into(),
            service_id: service_id.into(),
            url: url.into(),
        }
    }

    pub fn service(&self) -> ExtensionServiceId {
        ExtensionServiceId::new(self.extension_id.clone(), self.service_id.clone())
    }
}

impl ExtensionCredentialsId {
    pub fn new(extension_id: impl Into<Id>, service_id: impl Into<Id>, id: impl Into<Id>) -> Self {
        Self {
            extension_id: extension_id.into(),
            service_id: service_id.into(),
            id: id.into(),
        }
    }

    pub fn service(&self) -> ExtensionServiceId {
        ExtensionServiceId::new(self.extension_id.clone(), self.service_id.clone())
    }
}
