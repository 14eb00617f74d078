use thiserror::Error;

/// Failures surfaced by a scheduling storage backend.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// A commit-time precondition no longer held because a concurrent write
    /// got there first. Nothing was written.
    #[error("Conflicting write: {0}")]
    Conflict(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Decode error: {0}")]
    Decode(String),
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Decode(err.to_string())
    }
}
