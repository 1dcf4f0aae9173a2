//! Business layer over [`ExtensionStore`](wfcore_extension_store::ExtensionStore): identity
//! generation, semver/scope validation, and the derived `RunExtensionAccessQuery` used by the
//! workflow manager to resolve a step's extension requirements (§4.2).

use std::sync::Arc;

use tracing::debug;

use wfcore_domain::{
    CredentialsScope, Error, Extension, ExtensionAccess, ExtensionCredentials,
    ExtensionCredentialsId, ExtensionEndpoint, ExtensionEndpointId, ExtensionQuery,
    ExtensionRecord, ExtensionService, ExtensionServiceId, ExtensionServiceRecord, Id, Result,
    semver_range,
};
use wfcore_extension_store::ExtensionStore;

/// Random 8-hex-digit identity suffixes are vanishingly unlikely to collide; this bounds the
/// retry loop so a pathological RNG or a saturated id space fails loudly instead of looping.
const MAX_ID_GENERATION_ATTEMPTS: usize = 32;

fn hex8() -> String {
    format!("{:08x}", rand::random::<u32>())
}

fn extension_id_candidate(product: &str) -> Id {
    let prefix = if product.trim().is_empty() {
        "extension".to_string()
    } else {
        product.to_lowercase()
    };
    Arc::from(format!("{prefix}-{}", hex8()))
}

fn service_id_candidate(resource: &str, extension_id: &str) -> Id {
    let prefix = if resource.trim().is_empty() {
        format!("{extension_id}-service")
    } else {
        resource.to_string()
    };
    Arc::from(format!("{prefix}-{}", hex8()))
}

fn credentials_id_candidate(service_resource: &str) -> Id {
    let prefix = if service_resource.trim().is_empty() {
        "creds".to_string()
    } else {
        service_resource.to_string()
    };
    Arc::from(format!("{prefix}-{}", hex8()))
}

fn validate_version(version: &str) -> Result<()> {
    if version.is_empty() || semver_range::is_valid_version(version) {
        Ok(())
    } else {
        Err(Error::InvalidArgument(format!("'{version}' is not a valid semver version")))
    }
}

/// Invariant 3: `Project` scope requires a non-empty `Projects` set, `User` scope requires a
/// non-empty `Users` set, `Global` scope requires both empty.
fn validate_credentials_scope(credentials: &ExtensionCredentials) -> Result<()> {
    match credentials.scope {
        CredentialsScope::Project if credentials.projects.is_empty() => Err(Error::InvalidArgument(
            "credentials with Project scope must name at least one project".into(),
        )),
        CredentialsScope::User if credentials.users.is_empty() => Err(Error::InvalidArgument(
            "credentials with User scope must name at least one user".into(),
        )),
        CredentialsScope::Global if !credentials.projects.is_empty() || !credentials.users.is_empty() => {
            Err(Error::InvalidArgument(
                "credentials with Global scope must not name projects or users".into(),
            ))
        }
        _ => Ok(()),
    }
}

/// Fills in parent-id fields left empty for caller convenience, generates missing
/// service/credentials identities, and rejects any nested id that disagrees with its
/// declared parent once filled in.
fn normalize_tree(record: &mut ExtensionRecord) -> Result<()> {
    for svc in &mut record.services {
        if svc.service.extension_id.is_empty() {
            svc.service.extension_id = record.extension.id.clone();
        }
        if svc.service.extension_id != record.extension.id {
            return Err(Error::InvalidArgument(format!(
                "service '{}' declares extension_id '{}' but is nested under extension '{}'",
                svc.service.id, svc.service.extension_id, record.extension.id
            )));
        }
        if svc.service.id.is_empty() {
            svc.service.id = service_id_candidate(&svc.service.resource, &record.extension.id);
        }
        normalize_service_children(&record.extension.id, &svc.service, svc)?;
    }
    Ok(())
}

fn normalize_service_children(
    extension_id: &Id,
    service: &ExtensionService,
    record: &mut ExtensionServiceRecord,
) -> Result<()> {
    for ep in &mut record.endpoints {
        if ep.extension_id.is_empty() {
            ep.extension_id = extension_id.clone();
        }
        if ep.service_id.is_empty() {
            ep.service_id = service.id.clone();
        }
        if ep.url.is_empty() {
            return Err(Error::InvalidArgument("endpoint url is mandatory".into()));
        }
        if ep.extension_id != *extension_id || ep.service_id != service.id {
            return Err(Error::InvalidArgument(format!(
                "endpoint '{}' does not match parent service '{}/{}'",
                ep.url, extension_id, service.id
            )));
        }
    }
    for creds in &mut record.credentials {
        if creds.extension_id.is_empty() {
            creds.extension_id = extension_id.clone();
        }
        if creds.service_id.is_empty() {
            creds.service_id = service.id.clone();
        }
        validate_credentials_scope(creds)?;
        if creds.id.is_empty() {
            creds.id = credentials_id_candidate(&service.resource);
        }
        if creds.extension_id != *extension_id || creds.service_id != service.id {
            return Err(Error::InvalidArgument(format!(
                "credentials '{}' does not match parent service '{}/{}'",
                creds.id, extension_id, service.id
            )));
        }
    }
    Ok(())
}

/// Layered on top of an owned [`ExtensionStore`]: validation and identity generation happen
/// here, structural storage and the raw resolution primitive live in the store.
#[derive(Default)]
pub struct ExtensionRegistry {
    store: ExtensionStore,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register_extension(&self, record: ExtensionRecord) -> Result<ExtensionRecord> {
        validate_version(&record.extension.version)?;
        if !record.extension.id.is_empty() {
            let mut record = record;
            normalize_tree(&mut record)?;
            debug!(extension_id = %record.extension.id, "registering extension with explicit id");
            return self.store.add_extension(record).await;
        }
        for _ in 0..MAX_ID_GENERATION_ATTEMPTS {
            let mut attempt = record.clone();
            attempt.extension.id = extension_id_candidate(&attempt.extension.product);
            normalize_tree(&mut attempt)?;
            match self.store.add_extension(attempt).await {
                Ok(registered) => return Ok(registered),
                Err(Error::ExtensionExists(_)) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(Error::InvalidArgument("failed to generate a unique extension id".into()))
    }

    pub async fn get_extension(&self, id: &str, recursive: bool) -> Result<ExtensionRecord> {
        self.store.get_extension(id, recursive).await
    }

    pub async fn update_extension(&self, extension: Extension) -> Result<Extension> {
        validate_version(&extension.version)?;
        self.store.update_extension(extension).await
    }

    pub async fn remove_extension(&self, id: &str) -> Result<()> {
        self.store.remove_extension(id).await
    }

    pub async fn add_service(&self, service: ExtensionService) -> Result<ExtensionService> {
        if !service.id.is_empty() {
            return self.store.add_service(service).await;
        }
        for _ in 0..MAX_ID_GENERATION_ATTEMPTS {
            let mut candidate = service.clone();
            candidate.id = service_id_candidate(&candidate.resource, &candidate.extension_id);
            match self.store.add_service(candidate).await {
                Ok(added) => return Ok(added),
                Err(Error::ExtensionServiceExists(..)) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(Error::InvalidArgument("failed to generate a unique service id".into()))
    }

    pub async fn get_service(&self, id: &ExtensionServiceId, recursive: bool) -> Result<ExtensionServiceRecord> {
        self.store.get_service(id, recursive).await
    }

    pub async fn update_service(&self, service: ExtensionService) -> Result<ExtensionService> {
        self.store.update_service(service).await
    }

    pub async fn remove_service(&self, id: &ExtensionServiceId) -> Result<()> {
        self.store.remove_service(id).await
    }

    pub async fn add_endpoint(&self, endpoint: ExtensionEndpoint) -> Result<ExtensionEndpoint> {
        if endpoint.url.is_empty() {
            return Err(Error::InvalidArgument("endpoint url is mandatory".into()));
        }
        self.store.add_endpoint(endpoint).await
    }

    pub async fn get_endpoint(&self, id: &ExtensionEndpointId) -> Result<ExtensionEndpoint> {
        self.store.get_endpoint(id).await
    }

    pub async fn update_endpoint(&self, endpoint: ExtensionEndpoint) -> Result<ExtensionEndpoint> {
        if endpoint.url.is_empty() {
            return Err(Error::InvalidArgument("endpoint url is mandatory".into()));
        }
        self.store.update_endpoint(endpoint).await
    }

    pub async fn remove_endpoint(&self, id: &ExtensionEndpointId) -> Result<()> {
        self.store.remove_endpoint(id).await
    }

    pub async fn add_credentials(&self, credentials: ExtensionCredentials) -> Result<ExtensionCredentials> {
        validate_credentials_scope(&credentials)?;
        if !credentials.id.is_empty() {
            return self.store.add_credentials(credentials).await;
        }
        for _ in 0..MAX_ID_GENERATION_ATTEMPTS {
            let mut candidate = credentials.clone();
            candidate.id = credentials_id_candidate(&candidate.service_id);
            match self.store.add_credentials(candidate).await {
                Ok(added) => return Ok(added),
                Err(Error::ExtensionCredentialsExists(..)) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(Error::InvalidArgument("failed to generate a unique credentials id".into()))
    }

    pub async fn get_credentials(&self, id: &ExtensionCredentialsId) -> Result<ExtensionCredentials> {
        self.store.get_credentials(id).await
    }

    pub async fn update_credentials(&self, credentials: ExtensionCredentials) -> Result<ExtensionCredentials> {
        validate_credentials_scope(&credentials)?;
        self.store.update_credentials(credentials).await
    }

    pub async fn remove_credentials(&self, id: &ExtensionCredentialsId) -> Result<()> {
        self.store.remove_credentials(id).await
    }

    /// Evaluates `query` as in the store's resolution primitive, defaults an unset
    /// `CredentialsScope` to `Global`, and keeps only tuples that actually carry credentials.
    pub async fn run_extension_access_query(&self, query: &ExtensionQuery) -> Result<Vec<ExtensionAccess>> {
        let mut query = query.clone();
        if query.credentials_scope.is_none() {
            query.credentials_scope = Some(CredentialsScope::Global);
        }
        let matches = self.store.run_extension_query(&query).await?;
        Ok(matches
            .into_iter()
            .filter(|m| m.credentials.is_some())
            .map(ExtensionAccess::from)
            .collect())
    }
}
