use quicklab_core::error::CoreError;

/// Errors raised by the tree store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Several independent child inserts failed during a fan-out.
    #[error("{}", aggregate_message(.0))]
    Aggregate(Vec<StoreError>),
}

fn aggregate_message(errors: &[StoreError]) -> String {
    let parts: Vec<String> = errors.iter().map(ToString::to_string).collect();
    format!("{} operations failed: {}", errors.len(), parts.join("; "))
}

impl StoreError {
    /// Collapse fan-out failures: none is `Ok`, one is returned as-is.
    pub fn collect(mut errors: Vec<StoreError>) -> Result<(), StoreError> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(StoreError::Aggregate(errors)),
        }
    }

    pub fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        StoreError::Core(CoreError::NotFound {
            entity,
            key: key.into(),
        })
    }

    /// The domain error behind this failure, if there is exactly one.
    pub fn as_core(&self) -> Option<&CoreError> {
        match self {
            StoreError::Core(e) => Some(e),
            _ => None,
        }
    }
}
