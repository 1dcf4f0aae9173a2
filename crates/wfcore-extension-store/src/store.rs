use std::collections::{HashMap, HashSet};

use tokio::sync::RwLock;
use tracing::debug;

use wfcore_domain::{
    Error, Extension, ExtensionCredentials, ExtensionCredentialsId, ExtensionEndpoint,
    ExtensionEndpointId, ExtensionQuery, ExtensionQueryMatch, ExtensionRecord, ExtensionService,
    ExtensionServiceId, ExtensionServiceRecord, Id, Result,
};

struct ServiceNode {
    service: ExtensionService,
    endpoints: HashMap<Id, ExtensionEndpoint>,
    credentials: HashMap<Id, ExtensionCredentials>,
}

impl ServiceNode {
    fn record(&self) -> ExtensionServiceRecord {
        ExtensionServiceRecord {
            service: self.service.clone(),
            endpoints: self.endpoints.values().cloned().collect(),
            credentials: self.credentials.values().cloned().collect(),
        }
    }
}

struct ExtensionNode {
    extension: Extension,
    services: HashMap<Id, ServiceNode>,
}

impl ExtensionNode {
    fn record(&self) -> ExtensionRecord {
        ExtensionRecord {
            extension: self.extension.clone(),
            services: self.services.values().map(ServiceNode::record).collect(),
        }
    }
}

/// Four-level hierarchical in-memory store: Extension → Service → {Endpoints, Credentials}.
///
/// Every mutation takes the single write lock; every read takes the shared lock and
/// returns deep copies, so callers can never observe or mutate the store's internals
/// directly (§5).
#[derive(Default)]
pub struct ExtensionStore {
    extensions: RwLock<HashMap<Id, ExtensionNode>>,
}

impl ExtensionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_extension(&self, record: ExtensionRecord) -> Result<ExtensionRecord> {
        validate_record_shape(&record)?;
        let mut extensions = self.extensions.write().await;
        if extensions.contains_key(&record.extension.id) {
            return Err(Error::ExtensionExists(record.extension.id.to_string()));
        }
        let mut services = HashMap::with_capacity(record.services.len());
        for svc in &record.services {
            let mut endpoints = HashMap::with_capacity(svc.endpoints.len());
            for ep in &svc.endpoints {
                endpoints.insert(ep.url.clone(), ep.clone());
            }
            let mut credentials = HashMap::with_capacity(svc.credentials.len());
            for c in &svc.credentials {
                credentials.insert(c.id.clone(), c.clone());
            }
            services.insert(
                svc.service.id.clone(),
                ServiceNode {
                    service: svc.service.clone(),
                    endpoints,
                    credentials,
                },
            );
        }
        debug!(extension_id = %record.extension.id, "adding extension");
        extensions.insert(
            record.extension.id.clone(),
            ExtensionNode {
                extension: record.extension.clone(),
                services,
            },
        );
        Ok(record)
    }

    pub async fn get_extension(&self, id: &str, recursive: bool) -> Result<ExtensionRecord> {
        let extensions = self.extensions.read().await;
        let node = extensions
            .get(id)
            .ok_or_else(|| Error::ExtensionNotFound(id.to_string()))?;
        Ok(if recursive {
            node.record()
        } else {
            ExtensionRecord {
                extension: node.extension.clone(),
                services: Vec::new(),
            }
        })
    }

    pub async fn update_extension(&self, extension: Extension) -> Result<Extension> {
        let mut extensions = self.extensions.write().await;
        let node = extensions
            .get_mut(&extension.id)
            .ok_or_else(|| Error::ExtensionNotFound(extension.id.to_string()))?;
        node.extension = extension.clone();
        Ok(extension)
    }

    pub async fn remove_extension(&self, id: &str) -> Result<()> {
        let mut extensions = self.extensions.write().await;
        if extensions.remove(id).is_none() {
            return Err(Error::ExtensionNotFound(id.to_string()));
        }
        debug!(extension_id = id, "removed extension, cascading to descendants");
        Ok(())
    }

    pub async fn add_service(&self, service: ExtensionService) -> Result<ExtensionService> {
        let mut extensions = self.extensions.write().await;
        let node = extensions
            .get_mut(&service.extension_id)
            .ok_or_else(|| Error::ParentNotFound(service.extension_id.to_string()))?;
        if node.services.contains_key(&service.id) {
            return Err(Error::ExtensionServiceExists(
                service.extension_id.to_string(),
                service.id.to_string(),
            ));
        }
        node.services.insert(
            service.id.clone(),
            ServiceNode {
                service: service.clone(),
                endpoints: HashMap::new(),
                credentials: HashMap::new(),
            },
        );
        Ok(service)
    }

    pub async fn get_service(
        &self,
        id: &ExtensionServiceId,
        recursive: bool,
    ) -> Result<ExtensionServiceRecord> {
        let extensions = self.extensions.read().await;
        let node = find_service(&extensions, id)?;
        Ok(if recursive {
            node.record()
        } else {
            ExtensionServiceRecord {
                service: node.service.clone(),
                endpoints: Vec::new(),
                credentials: Vec::new(),
            }
        })
    }

    pub async fn update_service(&self, service: ExtensionService) -> Result<ExtensionService> {
        let mut extensions = self.extensions.write().await;
        let id = ExtensionServiceId::new(service.extension_id.clone(), service.id.clone());
        let node = find_service_mut(&mut extensions, &id)?;
        node.service = service.clone();
        Ok(service)
    }

    pub async fn remove_service(&self, id: &ExtensionServiceId) -> Result<()> {
        let mut extensions = self.extensions.write().await;
        let ext = extensions
            .get_mut(&id.extension_id)
            .ok_or_else(|| Error::ExtensionServiceNotFound(id.extension_id.to_string(), id.id.to_string()))?;
        if ext.services.remove(&id.id).is_none() {
            return Err(Error::ExtensionServiceNotFound(
                id.extension_id.to_string(),
                id.id.to_string(),
            ));
        }
        Ok(())
    }

    pub async fn add_endpoint(&self, endpoint: ExtensionEndpoint) -> Result<ExtensionEndpoint> {
        let mut extensions = self.extensions.write().await;
        let service_id = ExtensionServiceId::new(endpoint.extension_id.clone(), endpoint.service_id.clone());
        let node = find_service_mut(&mut extensions, &service_id)
            .map_err(|_| Error::ParentNotFound(format!("{}/{}", service_id.extension_id, service_id.id)))?;
        if node.endpoints.contains_key(&endpoint.url) {
            return Err(Error::ExtensionEndpointExists(
                endpoint.extension_id.to_string(),
                endpoint.service_id.to_string(),
                endpoint.url.to_string(),
            ));
        }
        node.endpoints.insert(endpoint.url.clone(), endpoint.clone());
        Ok(endpoint)
    }

    pub async fn get_endpoint(&self, id: &ExtensionEndpointId) -> Result<ExtensionEndpoint> {
        let extensions = self.extensions.read().await;
        let node = find_service(&extensions, &id.service())
            .map_err(|_| not_found_endpoint(id))?;
        node.endpoints
            .get(&id.url)
            .cloned()
            .ok_or_else(|| not_found_endpoint(id))
    }

    pub async fn update_endpoint(&self, endpoint: ExtensionEndpoint) -> Result<ExtensionEndpoint> {
        let mut extensions = self.extensions.write().await;
        let id = ExtensionEndpointId::new(
            endpoint.extension_id.clone(),
            endpoint.service_id.clone(),
            endpoint.url.clone(),
        );
        let node = find_service_mut(&mut extensions, &id.service()).map_err(|_| not_found_endpoint(&id))?;
        if !node.endpoints.contains_key(&endpoint.url) {
            return Err(not_found_endpoint(&id));
        }
        node.endpoints.insert(endpoint.url.clone(), endpoint.clone());
        Ok(endpoint)
    }

    pub async fn remove_endpoint(&self, id: &ExtensionEndpointId) -> Result<()> {
        let mut extensions = self.extensions.write().await;
        let node = find_service_mut(&mut extensions, &id.service()).map_err(|_| not_found_endpoint(id))?;
        if node.endpoints.remove(&id.url).is_none() {
            return Err(not_found_endpoint(id));
        }
        Ok(())
    }

    pub async fn add_credentials(&self, credentials: ExtensionCredentials) -> Result<ExtensionCredentials> {
        let mut extensions = self.extensions.write().await;
        let service_id = ExtensionServiceId::new(credentials.extension_id.clone(), credentials.service_id.clone());
        let node = find_service_mut(&mut extensions, &service_id)
            .map_err(|_| Error::ParentNotFound(format!("{}/{}", service_id.extension_id, service_id.id)))?;
        if node.credentials.contains_key(&credentials.id) {
            return Err(Error::ExtensionCredentialsExists(
                credentials.extension_id.to_string(),
                credentials.service_id.to_string(),
                credentials.id.to_string(),
            ));
        }
        node.credentials.insert(credentials.id.clone(), credentials.clone());
        Ok(credentials)
    }

    pub async fn get_credentials(&self, id: &ExtensionCredentialsId) -> Result<ExtensionCredentials> {
        let extensions = self.extensions.read().await;
        let node = find_service(&extensions, &id.service()).map_err(|_| not_found_credentials(id))?;
        node.credentials
            .get(&id.id)
            .cloned()
            .ok_or_else(|| not_found_credentials(id))
    }

    pub async fn update_credentials(&self, credentials: ExtensionCredentials) -> Result<ExtensionCredentials> {
        let mut extensions = self.extensions.write().await;
        let id = ExtensionCredentialsId::new(
            credentials.extension_id.clone(),
            credentials.service_id.clone(),
            credentials.id.clone(),
        );
        let node = find_service_mut(&mut extensions, &id.service()).map_err(|_| not_found_credentials(&id))?;
        if !node.credentials.contains_key(&credentials.id) {
            return Err(not_found_credentials(&id));
        }
        node.credentials.insert(credentials.id.clone(), credentials.clone());
        Ok(credentials)
    }

    pub async fn remove_credentials(&self, id: &ExtensionCredentialsId) -> Result<()> {
        let mut extensions = self.extensions.write().await;
        let node = find_service_mut(&mut extensions, &id.service()).map_err(|_| not_found_credentials(id))?;
        if node.credentials.remove(&id.id).is_none() {
            return Err(not_found_credentials(id));
        }
        Ok(())
    }

    /// The resolution primitive (§4.1): Extension × Service × Endpoint × Credentials,
    /// conjunctive predicates, deterministic insertion order.
    pub async fn run_extension_query(&self, query: &ExtensionQuery) -> Result<Vec<ExtensionQueryMatch>> {
        let extensions = self.extensions.read().await;
        let mut out = Vec::new();
        for node in extensions.values() {
            if !extension_matches(&node.extension, query)? {
                continue;
            }
            for svc in node.services.values() {
                if !service_matches(&svc.service, query) {
                    continue;
                }
                for ep in svc.endpoints.values() {
                    if let Some(ty) = query.ty {
                        if ep.ty != ty {
                            continue;
                        }
                    }
                    if svc.credentials.is_empty() {
                        out.push(ExtensionQueryMatch {
                            extension: node.extension.clone(),
                            service: svc.service.clone(),
                            endpoint: ep.clone(),
                            credentials: None,
                        });
                        continue;
                    }
                    for creds in svc.credentials.values() {
                        if let Some(scope) = query.credentials_scope {
                            if creds.scope != scope {
                                continue;
                            }
                        }
                        out.push(ExtensionQueryMatch {
                            extension: node.extension.clone(),
                            service: svc.service.clone(),
                            endpoint: ep.clone(),
                            credentials: Some(creds.clone()),
                        });
                    }
                }
            }
        }
        Ok(out)
    }
}

fn not_found_endpoint(id: &ExtensionEndpointId) -> Error {
    Error::ExtensionEndpointNotFound(id.extension_id.to_string(), id.service_id.to_string(), id.url.to_string())
}

fn not_found_credentials(id: &ExtensionCredentialsId) -> Error {
    Error::ExtensionCredentialsNotFound(id.extension_id.to_string(), id.service_id.to_string(), id.id.to_string())
}

fn find_service<'a>(
    extensions: &'a HashMap<Id, ExtensionNode>,
    id: &ExtensionServiceId,
) -> Result<&'a ServiceNode> {
    extensions
        .get(&id.extension_id)
        .and_then(|ext| ext.services.get(&id.id))
        .ok_or_else(|| Error::ExtensionServiceNotFound(id.extension_id.to_string(), id.id.to_string()))
}

fn find_service_mut<'a>(
    extensions: &'a mut HashMap<Id, ExtensionNode>,
    id: &ExtensionServiceId,
) -> Result<&'a mut ServiceNode> {
    extensions
        .get_mut(&id.extension_id)
        .and_then(|ext| ext.services.get_mut(&id.id))
        .ok_or_else(|| Error::ExtensionServiceNotFound(id.extension_id.to_string(), id.id.to_string()))
}

fn extension_matches(extension: &Extension, query: &ExtensionQuery) -> Result<bool> {
    if let Some(id) = &query.extension_id {
        if &extension.id != id {
            return Ok(false);
        }
    }
    if let Some(product) = &query.product {
        if &extension.product != product {
            return Ok(false);
        }
    }
    if let Some(constraints) = &query.version_constraints {
        if !wfcore_domain::semver_range::matches(&extension.version, constraints)? {
            return Ok(false);
        }
    }
    if let Some(zone) = &query.zone {
        if query.strict_zone_match && &extension.zone != zone {
            return Ok(false);
        }
    }
    Ok(true)
}

fn service_matches(service: &ExtensionService, query: &ExtensionQuery) -> bool {
    if let Some(id) = &query.service_id {
        if &service.id != id {
            return false;
        }
    }
    if let Some(resource) = &query.service_resource {
        if &service.resource != resource {
            return false;
        }
    }
    if let Some(category) = &query.service_category {
        if &service.category != category {
            return false;
        }
    }
    true
}

/// Structural validation shared by `add_extension`: every nested identity must reference
/// its declared parent, and no identity may repeat within the submitted tree (the whole
/// call fails atomically on any collision, per §4.1).
fn validate_record_shape(record: &ExtensionRecord) -> Result<()> {
    let mut seen_services = HashSet::new();
    for svc in &record.services {
        if svc.service.extension_id != record.extension.id {
            return Err(Error::InvalidArgument(format!(
                "service '{}' declares extension_id '{}' but is nested under extension '{}'",
                svc.service.id, svc.service.extension_id, record.extension.id
            )));
        }
        if !seen_services.insert(svc.service.id.clone()) {
            return Err(Error::ExtensionServiceExists(
                record.extension.id.to_string(),
                svc.service.id.to_string(),
            ));
        }
        let mut seen_endpoints = HashSet::new();
        for ep in &svc.endpoints {
            if ep.extension_id != record.extension.id || ep.service_id != svc.service.id {
                return Err(Error::InvalidArgument(format!(
                    "endpoint '{}' does not match parent service '{}/{}'",
                    ep.url, svc.service.extension_id, svc.service.id
                )));
            }
            if !seen_endpoints.insert(ep.url.clone()) {
                return Err(Error::ExtensionEndpointExists(
                    record.extension.id.to_string(),
                    svc.service.id.to_string(),
                    ep.url.to_string(),
                ));
            }
        }
        let mut seen_credentials = HashSet::new();
        for c in &svc.credentials {
            if c.extension_id != record.extension.id || c.service_id != svc.service.id {
                return Err(Error::InvalidArgument(format!(
                    "credentials '{}' does not match parent service '{}/{}'",
                    c.id, svc.service.extension_id, svc.service.id
                )));
            }
            if !seen_credentials.insert(c.id.clone()) {
                return Err(Error::ExtensionCredentialsExists(
                    record.extension.id.to_string(),
                    svc.service.id.to_string(),
                    c.id.to_string(),
                ));
            }
        }
    }
    Ok(())
}
