#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} '{key}'")]
    NotFound { entity: &'static str, key: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Path not found: '{0}'")]
    PathNotFound(String),

    #[error("Insufficient selector: {0}")]
    InsufficientSelector(&'static str),

    #[error("Corrupt store: {0}")]
    CorruptStore(String),

    #[error("Unknown transaction type '{0}'")]
    UnknownTransaction(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
