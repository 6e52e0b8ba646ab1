use crate::store::StoreError;

/// Access control error type
///
/// A missing token is not an error: it resolves to an anonymous principal.
#[derive(thiserror::Error, Debug)]
pub enum AccessError {
    /// A collaborator the decision depends on could not be reached
    #[error("Dependency unavailable: {0}")]
    DependencyUnavailable(String),
    /// The decision evaluated to false
    #[error("Permission denied")]
    PermissionDenied,
    /// The record a decision needs does not exist
    #[error("Record not found")]
    RecordNotFound,
    /// A token was present but could not be decoded
    #[error("Invalid token: {0}")]
    InvalidToken(String),
    /// The deployment requires a token and none was sent
    #[error("Authentication required")]
    AuthenticationRequired,
}

impl From<StoreError> for AccessError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => AccessError::DependencyUnavailable(msg),
            other => AccessError::DependencyUnavailable(other.to_string()),
        }
    }
}
