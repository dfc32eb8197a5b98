pub mod bus;
pub mod identity;
pub mod outbox;
pub mod repository;

/// Error taxonomy shared by every crate in the workspace. Timeout and Remote
/// are deliberately distinct: "downstream never answered" is not the same
/// outcome as "downstream said no", and callers need to tell them apart.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Not authorized: {0}")]
    Authorization(String),
    #[error("Timed out: {0}")]
    Timeout(String),
    #[error("Downstream failure: {0}")]
    Remote(String),
    #[error("Internal service error: {0}")]
    Internal(String),
}

pub type CoreResult<T> = Result<T, CoreError>;

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Internal(err.to_string())
    }
}
