use thiserror::Error;

/// Unified error type flowing through every layer of the coordination core.
///
/// Lower layers (store, registry) only ever construct the `NotFound`/`AlreadyExists`/
/// `InvalidArgument` family; the manager layer adds `ResolutionFailure`, `Backend`,
/// `Cancelled` and `DeadlineExceeded` around calls into collaborators.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("extension '{0}' not found")]
    ExtensionNotFound(String),
    #[error("service '{1}' not found on extension '{0}'")]
    ExtensionServiceNotFound(String, String),
    #[error("endpoint '{2}' not found on service '{0}/{1}'")]
    ExtensionEndpointNotFound(String, String, String),
    #[error("credentials '{2}' not found on service '{0}/{1}'")]
    ExtensionCredentialsNotFound(String, String, String),
    #[error("workflow '{0}' not found")]
    WorkflowNotFound(String),
    #[error("codeset '{0}/{1}' not found")]
    CodesetNotFound(String, String),
    #[error("workflow '{0}' is not assigned to codeset '{1}/{2}'")]
    WorkflowNotAssignedToCodeset(String, String, String),

    #[error("extension '{0}' already exists")]
    ExtensionExists(String),
    #[error("service '{1}' already exists on extension '{0}'")]
    ExtensionServiceExists(String, String),
    #[error("endpoint '{2}' already exists on service '{0}/{1}'")]
    ExtensionEndpointExists(String, String, String),
    #[error("credentials '{2}' already exists on service '{0}/{1}'")]
    ExtensionCredentialsExists(String, String, String),
    #[error("workflow '{0}' already exists")]
    WorkflowExists(String),

    /// Raised by `add_service`/`add_endpoint`/`add_credentials` when an ancestor is missing.
    #[error("parent not found: {0}")]
    ParentNotFound(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Wraps the step name and requirement alias when no extension tuple satisfies a query.
    #[error("could not resolve extension requirements for step '{step}' extension '{requirement}'")]
    ResolutionFailure { step: String, requirement: String },

    /// Opaque wrapper over a `WorkflowBackend`/`CodesetStore` adapter failure.
    #[error("backend error: {0}")]
    Backend(#[source] anyhow::Error),

    #[error("operation cancelled")]
    Cancelled,

    #[error("deadline exceeded")]
    DeadlineExceeded,
}

impl Error {
    pub fn backend(err: impl Into<anyhow::Error>) -> Self {
        Self::Backend(err.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
