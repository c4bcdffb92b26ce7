use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The persistence layer failed. The message is for logs, not clients.
    #[error("Infrastructure error: {0}")]
    Infrastructure(String),

    /// A store call did not complete within its bound.
    #[error("Timed out after {timeout_ms}ms during {operation}")]
    Timeout {
        operation: &'static str,
        timeout_ms: u64,
    },
}

impl CoreError {
    /// Whether retrying the same call later could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, CoreError::Timeout { .. })
    }
}
