use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use quicklab_core::error::CoreError;
use quicklab_db::StoreError;
use quicklab_gitlab::ProvisionError;
use quicklab_sync::ReplayError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps the errors of the store, replayer and provisioner and adds
/// HTTP-specific variants. Implements [`IntoResponse`] to produce
/// consistent `{ "error", "code" }` JSON bodies.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Provision(#[from] ProvisionError),

    /// A failed replay; the response also carries the stored tree.
    #[error(transparent)]
    Replay(#[from] ReplayError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

type Classified = (StatusCode, &'static str, String);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Core(core) => classify_core(core),
            AppError::Store(store) => classify_store(store),
            AppError::Provision(provision) => classify_provision(provision),
            AppError::Replay(ReplayError::Aborted { source, .. }) => classify_store(source),
            AppError::Replay(ReplayError::Canonical(source)) => classify_store(source),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
        };

        let body = match self {
            AppError::Replay(ReplayError::Aborted {
                index, canonical, ..
            }) => json!({
                "error": message,
                "code": code,
                "index": index,
                "result": canonical,
            }),
            _ => json!({
                "error": message,
                "code": code,
            }),
        };

        (status, axum::Json(body)).into_response()
    }
}

fn internal(msg: &str) -> Classified {
    tracing::error!(error = %msg, "Internal error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

fn classify_core(err: &CoreError) -> Classified {
    let message = err.to_string();
    match err {
        CoreError::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND", message),
        CoreError::PathNotFound(_) => (StatusCode::NOT_FOUND, "PATH_NOT_FOUND", message),
        CoreError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message),
        CoreError::InsufficientSelector(_) => {
            (StatusCode::BAD_REQUEST, "INSUFFICIENT_SELECTOR", message)
        }
        CoreError::UnknownTransaction(_) => {
            (StatusCode::BAD_REQUEST, "UNKNOWN_TRANSACTION", message)
        }
        CoreError::AlreadyExists(_) => (StatusCode::CONFLICT, "ALREADY_EXISTS", message),
        CoreError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT", message),
        CoreError::PermissionDenied(_) => (StatusCode::FORBIDDEN, "FORBIDDEN", message),
        CoreError::CorruptStore(_) => {
            tracing::error!(error = %message, "Store invariant violated");
            (StatusCode::INTERNAL_SERVER_ERROR, "CORRUPT_STORE", message)
        }
        CoreError::Internal(msg) => internal(msg),
    }
}

fn classify_store(err: &StoreError) -> Classified {
    match err {
        StoreError::Core(core) => classify_core(core),
        StoreError::Database(db) => classify_sqlx_error(db),
        StoreError::Aggregate(_) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "PARTIAL_FAILURE",
            err.to_string(),
        ),
    }
}

fn classify_provision(err: &ProvisionError) -> Classified {
    match err {
        ProvisionError::Invalid(core) => classify_core(core),
        ProvisionError::Platform { .. } => {
            tracing::warn!(error = %err, "Provisioning failed");
            (StatusCode::BAD_GATEWAY, "PLATFORM_ERROR", err.to_string())
        }
        ProvisionError::RetriesExhausted { .. } => (
            StatusCode::SERVICE_UNAVAILABLE,
            "PLATFORM_UNAVAILABLE",
            err.to_string(),
        ),
        ProvisionError::Io { .. } => internal(&err.to_string()),
    }
}

/// Classify a sqlx error into an HTTP status, error code, and message.
///
/// - `RowNotFound` maps to 404.
/// - Unique constraint violations map to 409.
/// - Everything else maps to 500 with a sanitized message.
fn classify_sqlx_error(err: &sqlx::Error) -> Classified {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
        ),
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => (
            StatusCode::CONFLICT,
            "CONFLICT",
            format!("Duplicate value violates unique constraint: {}", db_err.message()),
        ),
        other => internal(&other.to_string()),
    }
}
