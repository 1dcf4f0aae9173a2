use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

#[derive(Deserialize)]
pub struct Config {
    app_name: Option<Arc<str>>,
    listener_timeout_seconds: Option<u64>,
    request_deadline_seconds: Option<u64>,
    workflow_backend_url: Option<Arc<str>>,
    codeset_store_url: Option<Arc<str>>,
    /// A multi-tenancy tag carried on outgoing credential-scope queries; this core does
    /// not enforce tenant isolation itself, it only stamps the tag through.
    tenant: Option<Arc<str>>,
}

impl Config {
    pub fn new() -> envy::Result<Self> {
        ConfigBuilder::default().build()
    }

    pub fn builder<'a>() -> ConfigBuilder<'a> {
        ConfigBuilder::default()
    }

    pub fn app_name(&self) -> &str {
        self.app_name.as_deref().unwrap_or("workflow-coordination-core")
    }

    /// Upper bound on `CreateWorkflowListener` calls; composed with (never overriding) a
    /// caller's shorter request deadline.
    pub fn listener_timeout(&self) -> Duration {
        Duration::from_secs(self.listener_timeout_seconds.unwrap_or(60))
    }

    /// Default request deadline applied when a caller does not supply one of its own.
    /// `None` means no default deadline.
    pub fn request_deadline(&self) -> Option<Duration> {
        self.request_deadline_seconds.map(Duration::from_secs)
    }

    pub fn workflow_backend_url(&self) -> Option<&str> {
        self.workflow_backend_url.as_deref()
    }

    pub fn codeset_store_url(&self) -> Option<&str> {
        self.codeset_store_url.as_deref()
    }

    pub fn tenant(&self) -> Option<&str> {
        self.tenant.as_deref()
    }
}

#[derive(Default)]
pub struct ConfigBuilder<'a> {
    prefix: Option<&'a str>,
}

impl<'a> ConfigBuilder<'a> {
    pub fn with_prefix(mut self, prefix: &'a str) -> Self {
        self.prefix = Some(prefix);
        self
    }

    pub fn build(self) -> envy::Result<Config> {
        let prefix = self.prefix.unwrap_or("WFCORE_");
        envy::prefixed(prefix).from_env()
    }
}
