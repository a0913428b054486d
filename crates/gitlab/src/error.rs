use quicklab_core::error::CoreError;

/// Outcome of a failed call to the hosting platform.
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    /// The resource does not exist. Drives the create path.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The resource already exists.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Permission denied ({status}): {body}")]
    PermissionDenied { status: u16, body: String },

    /// Upstream overloaded or restarting. The only retried failure.
    #[error("Platform temporarily unavailable ({status})")]
    Unavailable { status: u16 },

    #[error("GitLab API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Invalid platform URL: {0}")]
    InvalidUrl(String),

    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
}

impl PlatformError {
    /// Classify a non-2xx response.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            404 => PlatformError::NotFound(body),
            409 => PlatformError::Conflict(body),
            401 | 403 => PlatformError::PermissionDenied { status, body },
            502..=504 => PlatformError::Unavailable { status },
            _ => PlatformError::Api { status, body },
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, PlatformError::Unavailable { .. })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error("Provisioning {resource} failed: {source}")]
    Platform {
        resource: String,
        #[source]
        source: PlatformError,
    },

    #[error("Provisioning {resource} gave up after {attempts} attempts")]
    RetriesExhausted { resource: String, attempts: u32 },

    #[error(transparent)]
    Invalid(#[from] CoreError),

    #[error("Cannot read project archive '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
